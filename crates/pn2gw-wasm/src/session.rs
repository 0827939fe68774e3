//! Process-wide guest session.
//!
//! One loader per process: installed once at start-up, torn down on exit.
//! Tests call [`teardown`] to reset between cases.

use pn2gw_core::{BridgeError, Result};
use std::sync::{Arc, RwLock};

use crate::invoker::ConversionInvoker;
use crate::loader::{ModuleLoader, ModuleSource};
use crate::wasm_host::HostConfig;

static SESSION: RwLock<Option<Arc<ModuleLoader>>> = RwLock::new(None);

/// Install `loader` as the session loader. Fails if one is already installed.
pub fn install(loader: ModuleLoader) -> Result<Arc<ModuleLoader>> {
    let mut slot = SESSION
        .write()
        .map_err(|e| BridgeError::Internal(format!("Failed to acquire session lock: {}", e)))?;

    if slot.is_some() {
        return Err(BridgeError::InvalidState(
            "guest session already installed".to_string(),
        ));
    }

    let loader = Arc::new(loader);
    *slot = Some(Arc::clone(&loader));
    Ok(loader)
}

/// The installed loader, whatever its state.
pub fn current() -> Result<Arc<ModuleLoader>> {
    SESSION
        .read()
        .map_err(|e| BridgeError::Internal(format!("Failed to acquire session lock: {}", e)))?
        .clone()
        .ok_or_else(|| BridgeError::InvalidState("no guest session installed".to_string()))
}

/// Invoker bound to the session loader.
pub fn invoker() -> Result<ConversionInvoker> {
    current().map(ConversionInvoker::new)
}

/// Create, install and load the session loader.
///
/// The loader stays installed even when loading fails so its diagnostics
/// remain reachable through [`current`].
pub async fn start(config: HostConfig, source: ModuleSource) -> Result<Arc<ModuleLoader>> {
    let loader = install(ModuleLoader::new(config)?)?;
    loader.load(source).await?;
    Ok(loader)
}

/// Remove the session loader and drop its instance.
pub fn teardown() {
    let taken = match SESSION.write() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };

    if let Some(loader) = taken {
        loader.teardown();
    }
}
