pub mod app;
pub mod args;
pub mod logging;

pub use args::Args;
