pub mod app;
pub mod loader;

pub use app::{AppConfig, ConversionConfig, LogFormat, LoggingConfig, ModuleConfig};
pub use loader::ConfigLoader;
