use anyhow::Result;
use pn2gw_types::abi::{MEMORY_EXPORT, MEMORY_EXPORT_FALLBACK};
use wasmtime::{
    Caller, Config, Engine, Extern, Linker, Module, OptLevel, Store, StoreLimits,
    StoreLimitsBuilder,
};
use wasmtime_wasi::sync::WasiCtxBuilder;
use wasmtime_wasi::WasiCtx;

/// Bytes per wasm page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Default linear memory ceiling: 16384 pages, 1 GiB.
pub const DEFAULT_MAX_MEMORY_PAGES: u32 = 16 * 1024;

/// Engine-level settings for the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Upper bound on guest linear memory, in 64 KiB pages.
    ///
    /// The guest never frees what `malloc` hands out, so every conversion
    /// leaks roughly the size of its inputs. This cap is what eventually
    /// turns that leak into an allocation failure instead of unbounded growth.
    pub max_memory_pages: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
        }
    }
}

impl HostConfig {
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * WASM_PAGE_SIZE
    }
}

/// Per-store host data.
pub struct HostState {
    limits: StoreLimits,
    /// Runtime services for `wasi_snapshot_preview1` imports.
    wasi: WasiCtx,
}

pub struct WasmHost {
    engine: Engine,
    config: HostConfig,
}

impl WasmHost {
    pub fn new(config: HostConfig) -> Result<Self> {
        let mut wasm_config = Config::new();
        wasm_config.cranelift_opt_level(OptLevel::Speed);

        let engine = Engine::new(&wasm_config)?;
        Ok(Self { engine, config })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn compile(&self, wasm_bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, wasm_bytes)
    }

    /// prepare a fresh store for a new instance
    pub fn create_store(&self) -> Store<HostState> {
        let limits = StoreLimitsBuilder::new()
            .memory_size(self.config.max_memory_bytes())
            .build();
        // 只继承 stderr：无参数、无环境变量、无预打开目录
        let wasi = WasiCtxBuilder::new().inherit_stderr().build();
        let mut store = Store::new(&self.engine, HostState { limits, wasi });
        store.limiter(|state| &mut state.limits);
        store
    }

    /// Guest import object: WASI preview1, `env.log_*`, and trapping stubs
    /// for anything else the module imports.
    pub fn create_linker(&self, module: &Module) -> Result<Linker<HostState>> {
        let mut linker = Linker::new(&self.engine);

        wasmtime_wasi::sync::add_to_linker(&mut linker, |state: &mut HostState| &mut state.wasi)?;
        Self::register_log_functions(&mut linker)?;

        // 未知导入定义为 trap，调用时才会失败
        linker.define_unknown_imports_as_traps(module)?;

        Ok(linker)
    }

    fn register_log_functions(linker: &mut Linker<HostState>) -> Result<()> {
        macro_rules! register_log {
            ($name:literal, $level:expr) => {
                linker.func_wrap(
                    "env",
                    $name,
                    move |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                        Self::handle_log(&mut caller, ptr, len, $level);
                    },
                )?;
            };
        }

        register_log!("log_trace", tracing::Level::TRACE);
        register_log!("log_debug", tracing::Level::DEBUG);
        register_log!("log_info", tracing::Level::INFO);
        register_log!("log_warn", tracing::Level::WARN);
        register_log!("log_error", tracing::Level::ERROR);

        Ok(())
    }

    /// Forward one guest log line into `tracing`.
    fn handle_log(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32, level: tracing::Level) {
        const MAX_LOG_LEN: usize = 4096;

        let memory = match caller
            .get_export(MEMORY_EXPORT)
            .or_else(|| caller.get_export(MEMORY_EXPORT_FALLBACK))
        {
            Some(Extern::Memory(mem)) => mem,
            _ => {
                tracing::error!("guest log: no memory export");
                return;
            }
        };

        let len = (len as u32 as usize).min(MAX_LOG_LEN);
        if len == 0 {
            return;
        }

        let ptr = ptr as u32 as usize;
        let data = memory.data(&*caller);
        let slice = match data.get(ptr..ptr.saturating_add(len)) {
            Some(s) => s,
            None => {
                tracing::error!(
                    "Invalid memory range in guest log: ptr={}, len={}, memory_size={}",
                    ptr,
                    len,
                    data.len()
                );
                return;
            }
        };

        let msg = String::from_utf8_lossy(slice);
        match level {
            tracing::Level::TRACE => tracing::trace!(target: "pn2gw_guest", "{}", msg),
            tracing::Level::DEBUG => tracing::debug!(target: "pn2gw_guest", "{}", msg),
            tracing::Level::INFO => tracing::info!(target: "pn2gw_guest", "{}", msg),
            tracing::Level::WARN => tracing::warn!(target: "pn2gw_guest", "{}", msg),
            _ => tracing::error!(target: "pn2gw_guest", "{}", msg),
        }
    }
}
