use anyhow::{anyhow, Context};
use pn2gw_core::{BridgeError, DiagnosticBundle, Result};
use pn2gw_types::abi::{INITIALIZE_EXPORT, PARSE_EXPORT};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use wasmtime::{Module, Store, TypedFunc};

use crate::memory::MemoryBridge;
use crate::wasm_host::{HostConfig, HostState, WasmHost};

/// `parseCSV(csv_ptr, csv_len, hero_ptr, hero_len, filter_flags, game_type, rake_percent, rake_cap_bb)`
pub(crate) type ParseParams = (u32, u32, u32, u32, u32, u32, f64, f64);

/// Where the guest module comes from.
#[derive(Debug, Clone)]
pub enum ModuleSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl ModuleSource {
    pub fn name(&self) -> String {
        match self {
            ModuleSource::Path(path) => path.display().to_string(),
            ModuleSource::Bytes { name, .. } => name.clone(),
        }
    }

    async fn read(self) -> anyhow::Result<Vec<u8>> {
        match self {
            ModuleSource::Path(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read guest module {}", path.display())),
            ModuleSource::Bytes { bytes, .. } => Ok(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderState {
    Unloaded,
    Loading,
    Ready,
    /// Terminal. Only reachable from `Loading`.
    Failed(DiagnosticBundle),
}

impl LoaderState {
    pub fn name(&self) -> &'static str {
        match self {
            LoaderState::Unloaded => "unloaded",
            LoaderState::Loading => "loading",
            LoaderState::Ready => "ready",
            LoaderState::Failed(_) => "failed",
        }
    }
}

/// A live guest instance and the exports the host uses.
pub(crate) struct GuestInstance {
    pub(crate) store: Store<HostState>,
    pub(crate) bridge: MemoryBridge,
    pub(crate) parse: TypedFunc<ParseParams, u32>,
}

/// Loads one guest module and owns the resulting instance.
pub struct ModuleLoader {
    host: WasmHost,
    state: RwLock<LoaderState>,
    ready: AtomicBool,
    guest: Mutex<Option<GuestInstance>>,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("state", &self.state().name())
            .field("ready", &self.is_ready())
            .field("config", self.host.config())
            .finish()
    }
}

impl ModuleLoader {
    pub fn new(config: HostConfig) -> Result<Self> {
        Ok(Self {
            host: WasmHost::new(config)?,
            state: RwLock::new(LoaderState::Unloaded),
            ready: AtomicBool::new(false),
            guest: Mutex::new(None),
        })
    }

    pub fn state(&self) -> LoaderState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Diagnostics captured when loading failed.
    pub fn diagnostics(&self) -> Option<DiagnosticBundle> {
        match self.state() {
            LoaderState::Failed(bundle) => Some(bundle),
            _ => None,
        }
    }

    /// Compile, instantiate and start the guest.
    ///
    /// Only valid from `Unloaded`. On failure the loader ends in `Failed`
    /// with a diagnostic bundle; there is no retry.
    pub async fn load(&self, source: ModuleSource) -> Result<()> {
        self.transition(|state| match state {
            LoaderState::Unloaded => Ok(LoaderState::Loading),
            other => Err(BridgeError::InvalidState(format!(
                "load requested while {}",
                other.name()
            ))),
        })?;

        let name = source.name();
        tracing::info!(module = %name, "Loading guest module");

        match self.instantiate(source).await {
            Ok(guest) => {
                *self
                    .guest
                    .lock()
                    .map_err(|e| BridgeError::Internal(format!("Failed to acquire guest lock: {}", e)))? =
                    Some(guest);
                self.set_state(LoaderState::Ready);
                self.ready.store(true, Ordering::Release);
                tracing::info!(module = %name, "Guest module ready");
                Ok(())
            }
            Err(err) => {
                let bundle = DiagnosticBundle::from_error(&err);
                tracing::error!(module = %name, error = %bundle.message, "Guest module failed to load");
                let message = bundle.message.clone();
                self.set_state(LoaderState::Failed(bundle));
                Err(BridgeError::Load(message))
            }
        }
    }

    async fn instantiate(&self, source: ModuleSource) -> anyhow::Result<GuestInstance> {
        let bytes = source.read().await?;

        // 编译较慢，放到 blocking 线程
        let engine = self.host.engine().clone();
        let module = tokio::task::spawn_blocking(move || Module::new(&engine, &bytes))
            .await
            .map_err(|e| anyhow!("Compilation task failed: {}", e))?
            .context("Failed to compile guest module")?;

        let linker = self.host.create_linker(&module)?;
        let mut store = self.host.create_store();
        let instance = linker
            .instantiate(&mut store, &module)
            .context("Failed to instantiate guest module")?;

        let bridge = MemoryBridge::from_instance(&mut store, &instance)?;
        let parse = instance
            .get_typed_func::<ParseParams, u32>(&mut store, PARSE_EXPORT)
            .with_context(|| format!("Guest module must export '{}'", PARSE_EXPORT))?;

        if let Some(init) = instance.get_func(&mut store, INITIALIZE_EXPORT) {
            init.typed::<(), ()>(&store)?
                .call(&mut store, ())
                .context("Guest start-up entry trapped")?;
        }

        Ok(GuestInstance {
            store,
            bridge,
            parse,
        })
    }

    /// Run `f` against the live instance. Calls are serialised by the guest
    /// lock.
    pub(crate) fn with_guest<R>(&self, f: impl FnOnce(&mut GuestInstance) -> Result<R>) -> Result<R> {
        let mut guard = self
            .guest
            .lock()
            .map_err(|e| BridgeError::Internal(format!("Failed to acquire guest lock: {}", e)))?;
        let guest = guard.as_mut().ok_or(BridgeError::NotReady)?;
        f(guest)
    }

    /// Drop the instance and return to `Unloaded`.
    pub fn teardown(&self) {
        self.ready.store(false, Ordering::Release);
        if let Ok(mut guest) = self.guest.lock() {
            guest.take();
        }
        self.set_state(LoaderState::Unloaded);
        tracing::debug!("Guest module torn down");
    }

    fn transition(&self, f: impl FnOnce(&LoaderState) -> Result<LoaderState>) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| BridgeError::Internal(format!("Failed to acquire state lock: {}", e)))?;
        let next = f(&state)?;
        tracing::debug!(from = state.name(), to = next.name(), "Loader transition");
        *state = next;
        Ok(())
    }

    fn set_state(&self, next: LoaderState) {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = next;
    }
}
