pub mod config_cmd;
pub mod probe;
pub mod serve;

use std::path::Path;

use ctxbridge_config::AppConfig;

/// Load from an explicit path when given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
