//! Foreground alert loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use colored::Colorize;

use taqwa::config::Config;
use taqwa::error::{Result, TaqwaError};
use taqwa::settings::SettingsStore;

use super::{build_companion, open_store};

const SETTINGS_RELOAD_INTERVAL: Duration = Duration::from_secs(15);
const LOCATION_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
const TIMINGS_RETRY_INTERVAL: Duration = Duration::from_secs(5 * 60);
const MAX_SLEEP: Duration = Duration::from_secs(1);

/// Run continuously, delivering prayer alerts as they come due
pub fn cmd_daemon() -> Result<()> {
    let config = Config::load()?;
    let store = open_store()?;
    let settings_store = SettingsStore::new(store.clone());
    let mut companion = build_companion(&config, store);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\n\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| TaqwaError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    println!("\ntaqwa daemon starting...\n");

    let now = Local::now();
    if let Err(e) = companion.start(&now) {
        eprintln!("  [ERROR] {}", e);
    }
    if let Some(location) = companion.location() {
        println!("Location: {}", location.label().bold());
    }
    print_schedule_summary(&companion);
    println!("\nPress Ctrl+C to stop.\n");

    let mut day = now.date_naive();
    let mut last_settings_reload = Instant::now();
    let mut last_location_refresh = Instant::now();
    let mut last_timings_attempt = Instant::now();

    while running.load(Ordering::SeqCst) {
        let tick = Instant::now();
        let now = Local::now();

        // New day: today's timings replace yesterday's and every alert is re-armed
        if now.date_naive() != day {
            day = now.date_naive();
            last_timings_attempt = tick;
            match companion.refetch(&now) {
                Ok(()) => print_schedule_summary(&companion),
                Err(e) => eprintln!("  [ERROR] {}", e),
            }
        }

        if tick.duration_since(last_settings_reload) >= SETTINGS_RELOAD_INTERVAL {
            companion.update_settings(settings_store.load(), &now);
            companion.sync_permission(&now);
            last_settings_reload = tick;
        }

        if tick.duration_since(last_location_refresh) >= LOCATION_REFRESH_INTERVAL {
            last_location_refresh = tick;
            if let Err(e) = companion.refresh_location(false, &now) {
                eprintln!("  [ERROR] {}", e);
            }
        }

        // Keep retrying until today's timings for the current location arrive
        if companion.needs_refetch(&now)
            && tick.duration_since(last_timings_attempt) >= TIMINGS_RETRY_INTERVAL
        {
            last_timings_attempt = tick;
            match companion.refetch(&now) {
                Ok(()) => print_schedule_summary(&companion),
                Err(e) => tracing::warn!(%e, "prayer times still unavailable"),
            }
        }

        for alert in companion.tick(Utc::now()) {
            println!(
                "  [{}] {}",
                Local::now().format("%H:%M"),
                alert.title
            );
        }

        let sleep = companion
            .scheduler()
            .next_fire_at()
            .and_then(|at| (at - Utc::now()).to_std().ok())
            .map_or(MAX_SLEEP, |until| until.min(MAX_SLEEP));
        std::thread::sleep(sleep);
    }

    companion.shutdown();
    println!("Daemon stopped.");
    Ok(())
}

fn print_schedule_summary(companion: &taqwa::companion::Companion) {
    let scheduler = companion.scheduler();
    if scheduler.is_empty() {
        if !companion.settings().enabled {
            println!("Alerts are off. Turn them on with `taqwa notify set --enabled true`.");
        } else {
            println!("No alerts scheduled. Check `taqwa notify show`.");
        }
        return;
    }

    println!("{} alerts scheduled:", scheduler.len());
    for alert in scheduler.pending() {
        println!(
            "  {} - {:?} at {}",
            alert.prayer,
            alert.kind,
            alert.fire_at.with_timezone(&Local).format("%H:%M")
        );
    }
}
