use crate::controller::{Controller, ControllerResult};
use clap::Command;
use log::{error, info};

pub fn cli() -> Command {
    Command::new("discover").about("Open a session to every inventory device and report capabilities")
}

pub async fn exec(controller: &Controller) -> ControllerResult<()> {
    info!("Discovering {} devices", controller.device_count());
    let results = controller.discover_devices().await;
    let reachable = results.values().filter(|d| d.success).count();
    for discovery in results.values() {
        if discovery.success {
            info!(
                target: &discovery.hostname,
                "Reachable, {} capabilities",
                discovery.capabilities.len()
            );
            for capability in &discovery.capabilities {
                info!(target: &discovery.hostname, "  {}", capability);
            }
        } else {
            error!(target: &discovery.hostname, "Unreachable: {}", discovery.message);
        }
    }
    info!("{}/{} devices reachable", reachable, results.len());
    Ok(())
}
