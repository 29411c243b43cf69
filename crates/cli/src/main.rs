// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use stowage_config::ConfigManager;

mod commands;

fn build_cli() -> Command {
    Command::new("stowage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Downloads large objects over HTTP, resuming after dropped connections")
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config dir)")
                .global(true),
        )
        .subcommand(
            Command::new("get")
                .about("Download an object")
                .arg(Arg::new("url").required(true).value_name("URL").help("Object URL"))
                .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write to FILE instead of stdout"))
                .arg(Arg::new("range").long("range").value_name("START-END").help("Download only bytes START through END (inclusive)"))
                .arg(Arg::new("if-match").long("if-match").value_name("ETAG").help("Only download this generation of the object"))
                .arg(
                    Arg::new("max-continuations")
                        .long("max-continuations")
                        .value_name("N")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .help("Give up after N resumptions"),
                )
                .arg(Arg::new("no-resume").long("no-resume").help("Do not resume interrupted downloads").action(ArgAction::SetTrue))
                .arg(Arg::new("report").long("report").help("Print a JSON download report").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand(Command::new("init").about("Write a default config file if none exists"))
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(Command::new("validate").about("Check the config file for invalid values"))
                .subcommand(
                    Command::new("set")
                        .about("Change one setting, e.g. `set download.max_continuations 20`")
                        .arg(Arg::new("key").required(true).value_name("SECTION.FIELD"))
                        .arg(Arg::new("value").required(true).value_name("VALUE")),
                )
                .subcommand(Command::new("reset").about("Overwrite the config file with the defaults")),
        )
}

fn config_manager(matches: &clap::ArgMatches) -> Result<ConfigManager> {
    let manager = match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(dir.into()),
        None => ConfigManager::new(),
    };
    manager.context("Failed to locate configuration directory")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;

    match matches.subcommand() {
        Some(("get", sub_matches)) => {
            let config = manager
                .load_with_env_overrides()
                .context("Failed to load configuration")?;
            commands::get(&config, sub_matches).await
        }
        Some(("config", sub_matches)) => match sub_matches.subcommand() {
            Some(("init", _)) => commands::config_init(&manager),
            Some(("show", _)) => commands::config_show(&manager),
            Some(("path", _)) => {
                println!("{}", manager.config_path().display());
                Ok(())
            }
            Some(("validate", _)) => commands::config_validate(&manager),
            Some(("set", set_matches)) => commands::config_set(&manager, set_matches),
            Some(("reset", _)) => commands::config_reset(&manager),
            _ => {
                build_cli().print_help()?;
                Ok(())
            }
        },
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
