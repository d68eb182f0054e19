//! Monitor command handler.
//!
//! Starts the monitor service, prints alerts and beacon status changes as
//! they happen and stops on Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::ArgMatches;
use colored::{ColoredString, Colorize};

use crate::core::monitor::{write_export, MetricsSource, MonitorService, MonitorSnapshot, Pressure};
use crate::core::Config;
use crate::platform::{ChannelEventSource, HostEventPoller, SysinfoMetricsSource};

/// Execute the run command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("Using default configuration: {:#}", e);
        Config::default()
    });
    apply_overrides(&mut config, matches);

    let export_path = matches.get_one::<String>("export").map(PathBuf::from);
    let host_events = !matches.get_flag("no-host-events");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("monitor-worker")
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run_monitor(config, export_path, host_events))
}

/// Apply one-off command line overrides on top of the stored config
pub fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(token) = matches.get_one::<String>("token") {
        config.set_webhook_token(token.clone());
    }
    if let Some(host) = matches.get_one::<String>("host") {
        config.set_webhook_host(host.clone());
    }
    if let Some(&ms) = matches.get_one::<u64>("sample-interval") {
        config.sample_interval_ms = ms;
    }
    if let Some(&ms) = matches.get_one::<u64>("beacon-interval") {
        config.beacon_interval_ms = ms;
    }
    if let Some(&n) = matches.get_one::<usize>("max-readings") {
        config.max_readings = n;
    }
    if let Some(&mb) = matches.get_one::<f64>("critical-low-mb") {
        config.critical_low_mb = mb;
    }
    if let Some(&mb) = matches.get_one::<f64>("critical-drop-mb") {
        config.critical_drop_mb = mb;
    }
}

async fn run_monitor(config: Config, export_path: Option<PathBuf>, host_events: bool) -> Result<()> {
    let (interrupt_tx, mut interrupt_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    let source: Arc<dyn MetricsSource> = Arc::new(SysinfoMetricsSource::new());
    let emitter = ChannelEventSource::new();

    let poller = if host_events && config.host_poll_interval_ms > 0 {
        Some(HostEventPoller::spawn(
            Arc::clone(&source),
            emitter.clone(),
            Duration::from_millis(config.host_poll_interval_ms),
            config.memory_warning_mb,
        ))
    } else {
        None
    };

    let mut service = MonitorService::new(config.monitor_config(), source, Arc::new(emitter))
        .context("Invalid monitor configuration")?;
    service.start().context("Failed to start monitor")?;

    print_header(&config, &service.snapshot());

    let mut snapshots = service.subscribe();
    let mut reporter = Reporter::default();

    loop {
        tokio::select! {
            _ = interrupt_rx.recv() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot: Arc<MonitorSnapshot> = snapshots.borrow_and_update().clone();
                reporter.report(&snapshot);
            }
        }
    }

    service.stop().await;
    if let Some(poller) = poller {
        poller.stop().await;
    }

    let snapshot = service.snapshot();
    print_summary(&snapshot);

    if let Some(path) = export_path {
        write_export(&path, &snapshot.readings)
            .with_context(|| format!("Failed to write export to {:?}", path))?;
        println!(
            "{} {}",
            format!("✓ Exported {} readings to", snapshot.count()).green(),
            path.display()
        );
    }

    Ok(())
}

fn print_header(config: &Config, snapshot: &MonitorSnapshot) {
    println!("{}", "TCC Monitor".bold().cyan());
    println!(
        "  Baseline:  {}",
        format!("{:.0} MB available", snapshot.baseline_available_mb).bold()
    );
    println!(
        "  Sampling:  every {} ms, beacon every {} ms",
        config.sample_interval_ms, config.beacon_interval_ms
    );
    if config.webhook_token.is_empty() {
        println!("  Beacons:   {}", "disabled (no webhook token)".yellow());
    } else {
        println!(
            "  Beacons:   {}/{}",
            config.endpoint_base(),
            config.masked_token()
        );
    }
    println!("{}", "Press Ctrl-C to stop.".dimmed());
    println!();
}

/// Tracks what has already been printed so each alert and status shows once
#[derive(Default)]
struct Reporter {
    last_alert_at: Option<DateTime<Utc>>,
    last_status: String,
}

impl Reporter {
    fn report(&mut self, snapshot: &MonitorSnapshot) {
        if let Some(alert) = &snapshot.current_alert {
            if self.last_alert_at != Some(alert.raised_at) {
                self.last_alert_at = Some(alert.raised_at);
                println!(
                    "{} {} {}",
                    local_time(alert.raised_at).dimmed(),
                    "⚠".red().bold(),
                    alert.message.red()
                );
            }
        }

        if !snapshot.last_beacon_status.is_empty() && snapshot.last_beacon_status != self.last_status
        {
            self.last_status = snapshot.last_beacon_status.clone();
            println!("{} {}", "  beacon:".dimmed(), self.last_status.dimmed());
        }
    }
}

fn print_summary(snapshot: &MonitorSnapshot) {
    println!();
    println!(
        "{} {} readings",
        "Monitor stopped.".bold(),
        snapshot.count()
    );

    let recent = snapshot.recent(5);
    if recent.is_empty() {
        return;
    }

    println!("{}", "Most recent:".white());
    for reading in recent {
        println!(
            "  {}  {:>8.0} MB avail  {:>8.0} MB used  {:<8}  {}",
            local_time(reading.timestamp).dimmed(),
            reading.available_memory_mb,
            reading.used_memory_mb,
            reading.thermal_state,
            pressure_label(reading.pressure)
        );
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn pressure_label(pressure: Pressure) -> ColoredString {
    match pressure {
        Pressure::Normal => pressure.as_str().green(),
        Pressure::Elevated => pressure.as_str().yellow(),
        Pressure::High => pressure.as_str().bright_red(),
        Pressure::Critical | Pressure::SpikeDrop => pressure.as_str().red().bold(),
    }
}
