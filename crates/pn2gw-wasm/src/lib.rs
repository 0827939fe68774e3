//! wasmtime host for the pn2gw converter guest.
//!
//! - **WasmHost**: engine, store limits and the guest import object
//! - **MemoryBridge**: string and record transfer through guest linear memory
//! - **ModuleLoader**: `Unloaded -> Loading -> Ready | Failed` lifecycle
//! - **session**: the process-wide loader
//! - **ConversionInvoker**: one `parseCSV` call, sentinel turned into `Result`

pub mod invoker;
pub mod loader;
pub mod memory;
pub mod session;
pub mod wasm_host;

pub use invoker::ConversionInvoker;
pub use loader::{LoaderState, ModuleLoader, ModuleSource};
pub use memory::MemoryBridge;
pub use wasm_host::{HostConfig, HostState, WasmHost};
