//! Configuration types and TOML loading.

mod loader;
mod types;

pub use loader::{default_config_path, load_config, ConfigError};
pub use types::{CacheConfig, InferenceConfig, KioskConfig, RetentionConfig, ServerConfig};
