//! `ctxbridge config` — Configuration commands.

use std::path::Path;

use ctxbridge_config::AppConfig;

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = super::load_config(config_path)?;
    println!("   Config parsed successfully");
    println!();
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Blocking:  {:?}", config.bridge.blocking);
    println!("   Timeout:   {}ms", config.bridge.timeout_ms);
    println!("   Policies:  {}", config.bridge.policies.join(", "));

    Ok(())
}

pub fn show_default() {
    print!("{}", AppConfig::default_toml());
}
