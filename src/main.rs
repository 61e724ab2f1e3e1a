use std::path::PathBuf;
use std::process;

use log::LevelFilter;

use crate::config::RuntimeConfig;
use crate::locator::{arrange, summarize};

mod config;
mod error;
mod geometry;
mod locator;
mod platform;
#[cfg(test)]
mod test_log;

const USAGE: &str = "\
usage: desk-organizer [CONFIG] [--list] [--debug] [--parallel]

  CONFIG      layout file (default: organizer.json next to the executable,
              then in the working directory)
  --list      log all top-level windows before arranging
  --debug     verbose logging
  --parallel  handle all programs at the same time";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    list: bool,
    debug: bool,
    parallel: bool,
    help: bool,
}

fn parse_args(args: &[&str]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    for arg in args {
        match *arg {
            "--list" => cli.list = true,
            "--debug" => cli.debug = true,
            "--parallel" => cli.parallel = true,
            "-h" | "--help" => cli.help = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option '{flag}'")),
            path if cli.config.is_none() => cli.config = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }
    Ok(cli)
}

fn init_logger(debug: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .format_timestamp(None)
        .format_target(false)
        .format_level(debug)
        .format_file(debug)
        .format_line_number(debug)
        .filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();
}

fn begin_execution(mut config: RuntimeConfig, cli: &CliArgs) -> anyhow::Result<()> {
    config.list_windows_on_start |= cli.list;
    config.parallel |= cli.parallel;

    let desktop = platform::native()?;

    let reports = arrange(desktop.as_ref(), &config);
    summarize(&reports);
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    let cli = match parse_args(&arg_refs) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("desk-organizer: {e}\n\n{USAGE}");
            process::exit(2);
        }
    };
    if cli.help {
        println!("{USAGE}");
        return;
    }

    let path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let loaded = RuntimeConfig::load(&path);

    let debug = cli.debug || loaded.as_ref().is_ok_and(|config| config.debug_enabled);
    init_logger(debug);

    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            log::error!("[FAIL]: {err}");
            process::exit(1);
        }
    };
    log::debug!("Loaded {} programs from {}", config.programs.len(), path.display());

    begin_execution(config, &cli).unwrap_or_else(|err| {
        log::error!("[FAIL]: {err:#}");
        process::exit(1);
    });
}
