pub mod conversion;
pub mod error;
pub mod report;

pub use conversion::{Conversion, DiagnosticBundle};
pub use error::{BridgeError, Result};
pub use report::Presentation;

pub fn init() {
    tracing::info!("pn2gw core initialized");
}
