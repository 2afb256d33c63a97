use crate::commands::builtin::{arg, value_of};
use crate::controller::{Controller, ControllerResult};
use clap::{Command, ValueHint};
use log::info;

pub fn cli() -> Command {
    Command::new("status")
        .about("Show capabilities and running interfaces of a device")
        .arg(arg(
            "device",
            "Inventory hostname of the device",
            true,
            Some('d'),
            None,
            Some(ValueHint::Hostname),
            clap::value_parser!(String),
        ))
}

pub async fn exec(args: &clap::ArgMatches, controller: &Controller) -> ControllerResult<()> {
    let hostname = value_of::<String>("device", args)?;
    let status = controller.device_status(hostname).await?;
    info!(
        target: hostname,
        "{} ({}) session-id {}",
        status.device.description,
        status.device.vendor,
        status.session_id
    );
    for capability in &status.capabilities {
        info!(target: hostname, "capability {}", capability);
    }
    if status.running.is_empty() {
        info!(target: hostname, "No interfaces in running datastore");
    }
    for interface in &status.running {
        match &interface.ipv4 {
            Some(address) => info!(
                target: hostname,
                "{} {} enabled={} {}/{}",
                interface.name,
                interface.if_type,
                interface.enabled,
                address.ip,
                address.netmask
            ),
            None => info!(
                target: hostname,
                "{} {} enabled={}",
                interface.name,
                interface.if_type,
                interface.enabled
            ),
        }
    }
    Ok(())
}
