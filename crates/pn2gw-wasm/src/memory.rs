//! Memory bridge between the host and guest linear memory.
//!
//! The guest exports `malloc` but no `free`. Every buffer written here stays
//! allocated for the life of the instance; that leak is accepted and bounded
//! by call volume times input size (see `HostConfig::max_memory_pages`).
//!
//! Guest calls may grow memory and move its backing storage, so no slice of
//! guest memory is kept between calls: every read and write takes a fresh
//! view from the store.

use pn2gw_core::{BridgeError, Result};
use pn2gw_types::abi::{MALLOC_EXPORT, MEMORY_EXPORT, MEMORY_EXPORT_FALLBACK};
use pn2gw_types::{GuestBuffer, ResultRecord};
use wasmtime::{Instance, Memory, Store, TypedFunc};

pub struct MemoryBridge {
    memory: Memory,
    /// `malloc(length: u32) -> u32`
    malloc: TypedFunc<u32, u32>,
}

impl MemoryBridge {
    pub fn new(memory: Memory, malloc: TypedFunc<u32, u32>) -> Self {
        Self { memory, malloc }
    }

    /// Resolve `mem` (or `memory`) and `malloc` from an instance.
    pub fn from_instance<T>(store: &mut Store<T>, instance: &Instance) -> Result<Self> {
        let memory = instance
            .get_memory(&mut *store, MEMORY_EXPORT)
            .or_else(|| instance.get_memory(&mut *store, MEMORY_EXPORT_FALLBACK))
            .ok_or_else(|| BridgeError::MissingExport(MEMORY_EXPORT.to_string()))?;

        let malloc = instance
            .get_typed_func::<u32, u32>(&mut *store, MALLOC_EXPORT)
            .map_err(|_| BridgeError::MissingExport(MALLOC_EXPORT.to_string()))?;

        Ok(Self::new(memory, malloc))
    }

    /// Current size of guest memory in bytes.
    pub fn size<T>(&self, store: &Store<T>) -> usize {
        self.memory.data_size(store)
    }

    /// Ask the guest allocator for `length` bytes. A zero pointer means the
    /// allocation failed.
    pub fn allocate<T>(&self, store: &mut Store<T>, length: u32) -> Result<u32> {
        let ptr = self
            .malloc
            .call(&mut *store, length)
            .map_err(|e| BridgeError::Guest(format!("malloc({}) trapped: {:#}", length, e)))?;

        if ptr == 0 {
            return Err(BridgeError::Allocation { requested: length });
        }

        tracing::trace!(ptr, length, "guest allocation");
        Ok(ptr)
    }

    /// Copy `text` into freshly allocated guest memory as UTF-8.
    ///
    /// Empty text allocates nothing and yields [`GuestBuffer::EMPTY`].
    pub fn write_string<T>(&self, store: &mut Store<T>, text: &str) -> Result<GuestBuffer> {
        self.write_bytes(store, text.as_bytes())
    }

    pub fn write_bytes<T>(&self, store: &mut Store<T>, bytes: &[u8]) -> Result<GuestBuffer> {
        if bytes.is_empty() {
            return Ok(GuestBuffer::EMPTY);
        }

        let length = u32::try_from(bytes.len()).map_err(|_| BridgeError::Allocation {
            requested: u32::MAX,
        })?;
        let pointer = self.allocate(store, length)?;
        let buffer = GuestBuffer::new(pointer, length);

        // malloc 可能触发 memory.grow，这里必须重新获取视图
        let data = self.memory.data_mut(&mut *store);
        let memory_size = data.len();
        let dest = data
            .get_mut(pointer as usize..buffer.end() as usize)
            .ok_or(BridgeError::OutOfBounds {
                ptr: pointer,
                len: length,
                memory_size,
            })?;
        dest.copy_from_slice(bytes);

        Ok(buffer)
    }

    /// Copy a byte range out of guest memory.
    pub fn read_bytes<T>(&self, store: &Store<T>, buffer: GuestBuffer) -> Result<Vec<u8>> {
        if buffer.is_empty() {
            return Ok(Vec::new());
        }

        let data = self.memory.data(store);
        data.get(buffer.pointer as usize..buffer.end() as usize)
            .map(<[u8]>::to_vec)
            .ok_or(BridgeError::OutOfBounds {
                ptr: buffer.pointer,
                len: buffer.length,
                memory_size: data.len(),
            })
    }

    /// Read a guest string. Invalid UTF-8 is replaced, never rejected.
    pub fn read_string<T>(&self, store: &Store<T>, buffer: GuestBuffer) -> Result<String> {
        let bytes = self.read_bytes(store, buffer)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Decode the result record `parseCSV` returned a pointer to.
    pub fn read_record<T>(&self, store: &Store<T>, pointer: u32) -> Result<ResultRecord> {
        let bytes = self.read_bytes(store, GuestBuffer::new(pointer, ResultRecord::SIZE as u32))?;
        let raw: [u8; ResultRecord::SIZE] =
            bytes
                .try_into()
                .map_err(|_| BridgeError::OutOfBounds {
                    ptr: pointer,
                    len: ResultRecord::SIZE as u32,
                    memory_size: self.size(store),
                })?;
        Ok(ResultRecord::from_le_bytes(&raw))
    }
}
