pub mod loader;
pub mod schema;

pub use loader::{apply_overrides, load_config, load_config_from_str, ConfigFormat};
pub use schema::{
    ChatConfig, CommandTemplate, Config, DatalakeConfig, LogFormat, LoggingConfig, ModelConfig,
    ObjectStoreConfig, ToolsConfig, WikiConfig,
};
