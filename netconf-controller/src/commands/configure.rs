use crate::commands::builtin::{arg, value_of};
use crate::controller::{Controller, ControllerResult};
use clap::{ArgMatches, Command, ValueHint};
use log::info;

pub fn cli() -> Command {
    Command::new("configure")
        .about("Set an interface IPv4 address in candidate and commit it")
        .args([
            arg(
                "device",
                "Inventory hostname of the device",
                true,
                Some('d'),
                None,
                Some(ValueHint::Hostname),
                clap::value_parser!(String),
            ),
            arg(
                "interface",
                "Interface name, e.g. GigabitEthernet1",
                true,
                Some('i'),
                None,
                None,
                clap::value_parser!(String),
            ),
            arg(
                "ip",
                "IPv4 address",
                true,
                None,
                None,
                None,
                clap::value_parser!(String),
            ),
            arg(
                "netmask",
                "Dotted IPv4 netmask",
                false,
                Some('m'),
                Some("255.255.255.0"),
                None,
                clap::value_parser!(String),
            ),
        ])
}

pub async fn exec(args: &ArgMatches, controller: &Controller) -> ControllerResult<()> {
    let message = controller
        .configure_interface(
            value_of::<String>("device", args)?,
            value_of::<String>("interface", args)?,
            value_of::<String>("ip", args)?,
            value_of::<String>("netmask", args)?,
        )
        .await?;
    info!("{}", message);
    Ok(())
}
