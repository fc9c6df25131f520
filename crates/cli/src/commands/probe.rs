//! `ctxbridge probe` — Run every enabled bridge policy in-process and print
//! what each one observed.

use std::path::Path;

use ctxbridge_core::Bridge;
use ctxbridge_gateway::context_api::demonstrate;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let bridge = Bridge::new(config.bridge.options());

    println!("Bridge policies (pipeline context: key=value)");
    println!("=============================================");

    let mut failures = 0;
    for policy in config.bridge.enabled_policies()? {
        match demonstrate(&bridge, policy).await {
            Ok(response) => println!("  {:<26} {response}", policy.as_str()),
            Err(e) => {
                failures += 1;
                println!("  {:<26} failed: {e}", policy.as_str());
            }
        }
    }

    println!();
    println!("  Blocking bridges entered: {}", bridge.blocking_calls());

    if failures > 0 {
        return Err(format!("{failures} policy run(s) failed").into());
    }
    Ok(())
}
