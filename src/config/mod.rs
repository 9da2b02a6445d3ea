// Configuration management module
// TOML settings for the embedding server, document storage and HTTP server

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, OllamaConfig, ServerConfig, StorageConfig};
