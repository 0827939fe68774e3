//! Guest module ABI shared by the host bridge and its tests.
//!
//! The converter guest exports:
//!
//! ```text
//! mem: Memory
//! malloc(length: u32) -> u32
//! parseCSV(csv_ptr, csv_len, hero_ptr, hero_len,
//!          filter_flags: u32, game_type: u32,
//!          rake_percent: f64, rake_cap_bb: f64) -> u32
//! ```
//!
//! `parseCSV` returns a pointer to a [`ResultRecord`]: five little-endian
//! `u32` words. Any change to field order or width is a breaking change for
//! both sides.

/// Export name of the guest allocator.
pub const MALLOC_EXPORT: &str = "malloc";

/// Export name of the conversion entry point.
pub const PARSE_EXPORT: &str = "parseCSV";

/// Export name of the guest linear memory.
pub const MEMORY_EXPORT: &str = "mem";

/// Fallback memory export name used by toolchains that keep the default.
pub const MEMORY_EXPORT_FALLBACK: &str = "memory";

/// Optional reactor start-up entry, run once before the guest is marked ready.
pub const INITIALIZE_EXPORT: &str = "_initialize";

/// `skipped_count` value reserved to mean "parse failed".
pub const ERROR_SENTINEL: u32 = 0xFFFF_FFFF;

/// A field of the result record and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordField {
    pub name: &'static str,
    pub offset: usize,
}

/// Byte layout of the record returned by `parseCSV`.
pub const RESULT_RECORD_LAYOUT: [RecordField; 5] = [
    RecordField { name: "result_ptr", offset: 0 },
    RecordField { name: "result_len", offset: 4 },
    RecordField { name: "skipped_count", offset: 8 },
    RecordField { name: "skipped_detail_ptr", offset: 12 },
    RecordField { name: "skipped_detail_len", offset: 16 },
];

/// A byte range inside guest linear memory.
///
/// The guest allocator owns the bytes. The host only borrows the range for
/// the duration of one call; the guest never frees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuestBuffer {
    pub pointer: u32,
    pub length: u32,
}

impl GuestBuffer {
    pub const EMPTY: GuestBuffer = GuestBuffer { pointer: 0, length: 0 };

    pub const fn new(pointer: u32, length: u32) -> Self {
        Self { pointer, length }
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// One past the last byte, widened so a range at the top of a 4 GiB
    /// memory does not overflow.
    pub const fn end(&self) -> u64 {
        self.pointer as u64 + self.length as u64
    }
}

/// Decoded form of the 20-byte record returned by `parseCSV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub result_ptr: u32,
    pub result_len: u32,
    pub skipped_count: u32,
    pub skipped_detail_ptr: u32,
    pub skipped_detail_len: u32,
}

impl ResultRecord {
    pub const SIZE: usize = RESULT_RECORD_LAYOUT.len() * 4;

    /// Decode a record. Fields are always little-endian, independent of the
    /// host byte order.
    pub fn from_le_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let word = |field: usize| {
            let offset = RESULT_RECORD_LAYOUT[field].offset;
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        Self {
            result_ptr: word(0),
            result_len: word(1),
            skipped_count: word(2),
            skipped_detail_ptr: word(3),
            skipped_detail_len: word(4),
        }
    }

    /// Encode a record the way the guest lays it out.
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let words = [
            self.result_ptr,
            self.result_len,
            self.skipped_count,
            self.skipped_detail_ptr,
            self.skipped_detail_len,
        ];
        for (field, value) in RESULT_RECORD_LAYOUT.iter().zip(words) {
            out[field.offset..field.offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn is_error(&self) -> bool {
        self.skipped_count == ERROR_SENTINEL
    }

    /// The main payload: converted hand history, or the error message when
    /// [`is_error`](Self::is_error) holds.
    pub fn result(&self) -> GuestBuffer {
        GuestBuffer::new(self.result_ptr, self.result_len)
    }

    /// Skipped-hand JSON side channel, present only when both words are
    /// non-zero.
    pub fn skipped_detail(&self) -> Option<GuestBuffer> {
        if self.skipped_detail_ptr > 0 && self.skipped_detail_len > 0 {
            Some(GuestBuffer::new(
                self.skipped_detail_ptr,
                self.skipped_detail_len,
            ))
        } else {
            None
        }
    }
}
