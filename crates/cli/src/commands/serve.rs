//! `ctxbridge serve` — Start the HTTP demonstration server.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ctxbridge gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Blocking bridges: {:?}", config.bridge.blocking);

    ctxbridge_gateway::start(config).await?;

    Ok(())
}
