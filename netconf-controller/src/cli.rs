use crate::commands::builtin::{builtin, builtin_exec};
use crate::config::CliConfig;
use crate::controller::{ControllerError, ControllerResult};
use clap::{arg, crate_authors, crate_description, crate_name, crate_version, Arg, Command};
use log::{debug, error};
use std::time::Instant;

pub async fn exec(cmd: String, cfg: CliConfig) -> ControllerResult<()> {
    let start_time = Instant::now();
    let result = match builtin_exec(&cmd, &cfg).await {
        Some(result) => result,
        None => Err(ControllerError::Anyhow(anyhow::anyhow!("Unknown command '{}'", cmd))),
    };
    match &result {
        Ok(_) => debug!("Command took: {:.3}s", start_time.elapsed().as_secs_f32()),
        Err(err) => error!("Command failed ({}): {}", err.status_code(), err),
    }
    result
}

pub fn cli() -> Command {
    Command::new(crate_name!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .version(crate_version!())
        .long_version(crate_version!())
        .arg_required_else_help(true)
        .allow_external_subcommands(false)
        .bin_name("netconf-controller")
        .display_name("netconf-controller")
        .help_template(color_print::cstr!(
            "\
{about-with-newline}
<green,bold>Author:</> {author}

<green,bold>Usage:</> {usage}

<green,bold>Options:</>
{options}

<green,bold>Commands:</>
    <cyan,bold>discover</>          Probe every inventory device
    <cyan,bold>status</>            Show capabilities and running interfaces
    <cyan,bold>configure</>         Set an interface address and commit
    <cyan,bold>simulate</>          Run a local NETCONF device simulator

See '<cyan,bold>netconf-controller help</> <cyan><<command>></>' for more information on a specific command.\n",
        ))
        .args([
            arg!(-v --verbose ... "Use verbose output (-vv to log session traffic, -vvv to log framing too)")
                .global(true),
            arg!(-q --quiet "Disable logging completely")
                .global(true),
            global_opt("inventory", "Path to the YAML device inventory")
                .env("NETCONF_INVENTORY")
                .default_value("inventory/devices.yaml"),
        ])
        .subcommands(builtin())
}

fn global_opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).long(name).global(true)
}

#[test]
fn verify_cli() {
    cli().debug_assert();
}

#[test]
fn parse_configure_args() {
    use crate::commands::builtin::value_of;

    let matches = cli()
        .try_get_matches_from([
            "netconf-controller",
            "--inventory",
            "lab.yaml",
            "configure",
            "-d",
            "sim-1",
            "-i",
            "eth0",
            "--ip",
            "10.0.0.1",
        ])
        .unwrap();
    let (cmd, args) = matches.subcommand().unwrap();
    assert_eq!(cmd, "configure");
    assert_eq!(value_of::<String>("inventory", args).unwrap(), "lab.yaml");
    assert_eq!(value_of::<String>("netmask", args).unwrap(), "255.255.255.0");
}
