use crate::core::Config;
use anyhow::{Context, Result};
use colored::Colorize;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set-token", sub_matches)) => set_token(sub_matches),
        Some(("set-host", sub_matches)) => set_host(sub_matches),
        _ => {
            println!("Use 'tcc-monitor config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Configuration:".white());
    if let Ok(path) = Config::get_config_path() {
        println!("  {:<18} {}", "file", path.display().to_string().dimmed());
    }
    println!("  {:<18} {}", "webhook token", config.masked_token().cyan());
    println!("  {:<18} {}", "webhook endpoint", config.endpoint_base().cyan());
    println!("  {:<18} {} ms", "sample interval", config.sample_interval_ms);
    println!("  {:<18} {} ms", "beacon interval", config.beacon_interval_ms);
    println!("  {:<18} {}", "max readings", config.max_readings);
    println!("  {:<18} {} MB", "critical low", config.critical_low_mb);
    println!("  {:<18} {} MB", "critical drop", config.critical_drop_mb);
    println!("  {:<18} {} ms", "host poll", config.host_poll_interval_ms);
    println!("  {:<18} {} MB", "memory warning", config.memory_warning_mb);

    Ok(())
}

fn set_token(matches: &clap::ArgMatches) -> Result<()> {
    let token = matches
        .get_one::<String>("token")
        .context("Token argument is required")?;

    let mut config = Config::load()?;
    config.set_webhook_token(token.clone());
    config.save()?;

    if config.webhook_token.is_empty() {
        println!("{}", "✓ Webhook token cleared, beacons disabled".yellow());
    } else {
        println!(
            "{} {}",
            "✓ Webhook token set:".green(),
            config.masked_token()
        );
    }

    Ok(())
}

fn set_host(matches: &clap::ArgMatches) -> Result<()> {
    let host = matches
        .get_one::<String>("host")
        .context("Host argument is required")?;

    let mut config = Config::load()?;
    config.set_webhook_host(host.clone());
    config.save()?;

    println!(
        "{} {}",
        "✓ Webhook endpoint set to:".green(),
        config.endpoint_base()
    );

    Ok(())
}
