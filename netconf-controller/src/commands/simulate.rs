use crate::commands::builtin::{arg, value_of, value_of_if_exists};
use crate::controller::ControllerResult;
use clap::{ArgMatches, Command};
use log::{info, warn};
use netconf_engine::session::SessionOptions;
use netconf_engine::simulator::Simulator;
use std::time::Duration;

pub fn cli() -> Command {
    Command::new("simulate")
        .about("Run a NETCONF device simulator over plain TCP")
        .args([
            arg(
                "listen",
                "Address to listen on",
                false,
                Some('l'),
                Some("127.0.0.1:8300"),
                None,
                clap::value_parser!(String),
            )
            .env("NETCONF_LISTEN"),
            arg(
                "hello-timeout",
                "Seconds to wait for the client hello",
                false,
                None,
                None,
                None,
                clap::value_parser!(u64),
            ),
        ])
}

pub async fn exec(args: &ArgMatches) -> ControllerResult<()> {
    let listen = value_of::<String>("listen", args)?;
    let mut options = SessionOptions::device();
    if let Some(secs) = value_of_if_exists::<u64>("hello-timeout", args) {
        options = options.with_hello_timeout(Duration::from_secs(*secs));
    }
    let simulator = Simulator::bind(listen.as_str()).await?.with_options(options);
    info!("Simulator listening on {}", simulator.local_addr()?);

    tokio::select! {
        result = simulator.serve() => result?,
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, stopping simulator"),
    }
    Ok(())
}
