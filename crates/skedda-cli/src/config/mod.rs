//! Credential store (`config.toml`).

#[allow(clippy::module_inception)]
mod config;
mod paths;

pub use config::AppConfig;
pub use paths::resolve_config_path;
