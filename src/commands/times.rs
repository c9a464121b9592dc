//! Prayer time display commands: times, next

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use serde::Serialize;

use taqwa::config::Config;
use taqwa::error::{Result, TaqwaError};
use taqwa::schedule::{NextPrayer, PrayerDisplayEntry};

use super::{build_companion, open_store};

#[derive(Serialize)]
struct TimesOutput<'a> {
    location: String,
    date: &'a str,
    prayers: Vec<PrayerDisplayEntry>,
}

#[derive(Serialize)]
struct NextOutput {
    location: String,
    next: Option<NextPrayer>,
    remaining: String,
}

/// Show today's prayer times
pub fn cmd_times(json: bool) -> Result<()> {
    let config = Config::load()?;
    let mut companion = build_companion(&config, open_store()?);
    let now = Local::now();
    companion.start(&now)?;

    let label = companion
        .location()
        .map(|l| l.label())
        .unwrap_or_default();
    let Some(timings) = companion.timings() else {
        println!("No prayer times for {}.", label);
        println!("Set a location with `taqwa location set`.");
        return Ok(());
    };

    let entries = companion.display_list(&now);
    if json {
        let output = TimesOutput {
            location: label,
            date: &timings.date,
            prayers: entries,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\n{}  {}\n", label.bold(), timings.date.dimmed());
    for entry in &entries {
        let line = format!(
            "  {:<8} {:<6} {:>5}  {:>8}",
            entry.name, entry.arabic_name, entry.time, entry.time_12h
        );
        if entry.is_next {
            println!("{}  {}", line.green().bold(), "<- next".green());
        } else {
            println!("{}", line);
        }
    }
    println!(
        "\n  {} until {}\n",
        companion.countdown(&now).bold(),
        entries
            .iter()
            .find(|e| e.is_next)
            .map(|e| e.name)
            .unwrap_or("-")
    );
    Ok(())
}

/// Show the next prayer, optionally as a live countdown
pub fn cmd_next(watch: bool, json: bool) -> Result<()> {
    let config = Config::load()?;
    let mut companion = build_companion(&config, open_store()?);
    let now = Local::now();
    companion.start(&now)?;
    let label = companion
        .location()
        .map(|l| l.label())
        .unwrap_or_default();

    if json {
        let output = NextOutput {
            location: label,
            next: companion.next_prayer(&now),
            remaining: companion.countdown(&now),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !watch {
        match companion.next_prayer(&now) {
            Some(next) => println!(
                "{} at {}{} - {} ({})",
                next.prayer.name().bold(),
                next.time,
                if next.tomorrow { " tomorrow" } else { "" },
                companion.countdown(&now),
                label
            ),
            None => println!("No prayer times for {}.", label),
        }
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| TaqwaError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let mut day = now.date_naive();
    let mut stdout = io::stdout();
    while running.load(Ordering::SeqCst) {
        let now = Local::now();
        if now.date_naive() != day {
            day = now.date_naive();
            if let Err(err) = companion.refetch(&now) {
                tracing::warn!(%err, "could not refresh prayer times for the new day");
            }
        }

        let status = match companion.next_prayer(&now) {
            Some(next) => format!(
                "{} ({})  {}",
                next.prayer.name().bold(),
                next.time,
                companion.countdown(&now)
            ),
            None => "No prayer times".to_string(),
        };
        write!(stdout, "\r\x1b[2K{}", status)?;
        stdout.flush()?;
        std::thread::sleep(Duration::from_secs(1));
    }
    println!();
    Ok(())
}
