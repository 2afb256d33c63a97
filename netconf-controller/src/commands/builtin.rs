use crate::commands::*;
use crate::config::CliConfig;
use crate::controller::{Controller, ControllerError, ControllerResult};
use clap::builder::{IntoResettable, ValueParser};
use clap::{Arg, ArgMatches, Command, ValueHint};

pub fn builtin() -> Vec<Command> {
    vec![
        discover::cli(),
        status::cli(),
        configure::cli(),
        simulate::cli(),
    ]
}

pub async fn builtin_exec(cmd: &str, cfg: &CliConfig) -> Option<ControllerResult<()>> {
    let f = match cmd {
        "simulate" => simulate::exec(&cfg.inner.args).await,
        "discover" | "status" | "configure" => {
            let controller = match Controller::from_file(&cfg.inner.inventory_path) {
                Ok(controller) => controller,
                Err(err) => return Some(Err(err)),
            };
            match cmd {
                "discover" => discover::exec(&controller).await,
                "status" => status::exec(&cfg.inner.args, &controller).await,
                _ => configure::exec(&cfg.inner.args, &controller).await,
            }
        }
        _ => return None,
    };
    Some(f)
}

pub(crate) fn value_of<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> ControllerResult<&'a T> {
    args.get_one::<T>(name)
        .ok_or_else(|| ControllerError::Validation(format!("missing argument '{}'", name)))
}

pub(crate) fn value_of_if_exists<'a, T: Clone + Send + Sync + 'static>(
    name: &str,
    args: &'a ArgMatches,
) -> Option<&'a T> {
    if args.contains_id(name) {
        args.get_one::<T>(name)
    } else {
        None
    }
}

pub(super) fn arg(
    name: &'static str,
    help: &'static str,
    required: bool,
    short: Option<char>,
    default: Option<&'static str>,
    hint: Option<ValueHint>,
    parser: impl IntoResettable<ValueParser>,
) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .required(required)
        .default_value(default)
        .value_hint(hint)
        .value_parser(parser)
}
