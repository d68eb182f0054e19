use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use tcc_monitor::commands;
use tcc_monitor::core::monitor::beacon;

fn build_cli() -> Command {
    Command::new("tcc-monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watch memory and thermal pressure and report it to a webhook")
        .subcommand(
            Command::new("run")
                .about("Start monitoring until Ctrl-C")
                .arg(
                    Arg::new("token")
                        .short('t')
                        .long("token")
                        .value_name("TOKEN")
                        .help("Webhook token for this run (empty disables beacons)"),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Webhook host, beacons go to https://<host>/<token>"),
                )
                .arg(
                    Arg::new("sample-interval")
                        .short('i')
                        .long("sample-interval")
                        .value_name("MS")
                        .help("Milliseconds between samples")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("beacon-interval")
                        .short('b')
                        .long("beacon-interval")
                        .value_name("MS")
                        .help("Milliseconds between heartbeat beacons")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("max-readings")
                        .long("max-readings")
                        .value_name("N")
                        .help("Readings kept in memory")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("critical-low-mb")
                        .long("critical-low-mb")
                        .value_name("MB")
                        .help("Available memory below which a sample is critical")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("critical-drop-mb")
                        .long("critical-drop-mb")
                        .value_name("MB")
                        .help("Drop between two samples that counts as a spike")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("export")
                        .short('o')
                        .long("export")
                        .value_name("PATH")
                        .help("Write the reading history as JSON on exit"),
                )
                .arg(
                    Arg::new("no-host-events")
                        .long("no-host-events")
                        .help("Don't poll for memory warnings and thermal changes")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change stored settings")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current configuration"))
                .subcommand(
                    Command::new("set-token")
                        .about("Store the webhook token (pass \"\" to clear)")
                        .arg(Arg::new("token").required(true).index(1)),
                )
                .subcommand(
                    Command::new("set-host")
                        .about("Store the webhook host")
                        .arg(Arg::new("host").required(true).index(1)),
                ),
        )
}

fn main() -> Result<()> {
    beacon::mark_process_start();
    tcc_monitor::init_logging();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run::execute(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        _ => {
            println!("Welcome to tcc-monitor!");
            println!("Use 'tcc-monitor --help' for more information.");
        }
    }

    Ok(())
}
