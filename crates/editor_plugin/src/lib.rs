pub mod config;
pub mod error;
pub mod logging;
pub mod plugin_runtime;
pub mod protocol;
pub mod unbuffered;

pub use error::PluginError;
pub use plugin_runtime::{PluginHandler, run, run_stdio};
pub use unbuffered::Unbuffered;
