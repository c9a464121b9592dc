//! Notification commands: show, set, toggle, permission, test

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use taqwa::config::{Config, NotifyTarget};
use taqwa::error::Result;
use taqwa::notify::{self as notifier, Alert};
use taqwa::settings::{NotificationSettings, Permission, SettingsStore, SettingsUpdate};
use taqwa::timings::Prayer;

use super::open_store;

#[derive(Serialize)]
struct NotifyOutput<'a> {
    settings: &'a NotificationSettings,
    permission: Permission,
    target: String,
}

/// Show current notification settings
pub fn cmd_notify_show(json: bool) -> Result<()> {
    let config = Config::load()?;
    let store = open_store()?;
    let settings = SettingsStore::new(store.clone()).load();
    let permission = notifier::from_config(&config, store).permission();

    if json {
        let output = NotifyOutput {
            settings: &settings,
            permission,
            target: describe_notify_target(&config.notify),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\nNotification Settings\n");
    println!("  Alerts:      {}", on_off(settings.enabled));
    println!("  Target:      {}", describe_notify_target(&config.notify));
    println!("  Permission:  {}", describe_permission(permission));
    println!(
        "  Before:      {} ({} minutes)",
        on_off(settings.notify_before),
        settings.minutes_before
    );
    println!("  At time:     {}", on_off(settings.notify_at_time));
    println!("  Adhan:       {}", on_off(settings.play_adhan));
    println!();
    for prayer in Prayer::ALL {
        println!("  {:<8} {}", prayer.name(), on_off(settings.is_prayer_enabled(prayer)));
    }

    if settings.enabled && permission != Permission::Granted {
        println!(
            "\n  {} alerts are on but permission is {}. Run `taqwa notify permission`.",
            "!".yellow(),
            permission
        );
    }
    println!();
    Ok(())
}

/// Change notification settings
pub fn cmd_notify_set(
    enabled: Option<bool>,
    before: Option<bool>,
    at_time: Option<bool>,
    minutes_before: Option<u32>,
    adhan: Option<bool>,
) -> Result<()> {
    let update = SettingsUpdate {
        enabled,
        notify_before: before,
        notify_at_time: at_time,
        minutes_before,
        play_adhan: adhan,
    };
    if update.is_empty() {
        println!("Nothing to change. See `taqwa notify set --help`.");
        return Ok(());
    }

    let config = Config::load()?;
    let settings = SettingsStore::new(open_store()?).update(&update)?;
    println!("Notification settings saved.");

    if settings.play_adhan && config.adhan_command.is_none() {
        println!(
            "  {} adhan is on, but no adhan_command is set in {}",
            "!".yellow(),
            Config::config_path()?.display()
        );
    }
    Ok(())
}

/// Flip one prayer's alerts
pub fn cmd_notify_toggle(prayer: &str) -> Result<()> {
    let prayer: Prayer = prayer.parse()?;
    let settings = SettingsStore::new(open_store()?).toggle_prayer(prayer)?;
    println!(
        "{} alerts {}",
        prayer.name(),
        on_off(settings.is_prayer_enabled(prayer))
    );
    Ok(())
}

/// Ask the platform for permission to show notifications
pub fn cmd_notify_permission() -> Result<()> {
    let config = Config::load()?;
    let mut notifier = notifier::from_config(&config, open_store()?);
    let permission = notifier.request_permission();
    println!("Notification permission: {}", describe_permission(permission));
    Ok(())
}

/// Send a test notification
pub fn cmd_notify_test() -> Result<()> {
    let config = Config::load()?;
    let notifier = notifier::from_config(&config, open_store()?);

    println!("\nSending test notification...");
    let mut alert = Alert::at_time(Prayer::Dhuhr, Utc::now());
    alert.title = "taqwa test".to_string();
    alert.body = "Prayer notifications are working".to_string();
    alert.tag = "test".to_string();
    alert.require_interaction = false;

    match notifier.notify(&alert) {
        Ok(()) => println!("  Test notification sent successfully!"),
        Err(e) => {
            println!("  Failed to send notification: {}", e);
            if let Some(hint) = e.hint() {
                println!("\n{}", hint);
            }
        }
    }
    Ok(())
}

/// Human-readable description of a notification target
pub fn describe_notify_target(target: &NotifyTarget) -> String {
    match target {
        NotifyTarget::Desktop => "desktop".to_string(),
        NotifyTarget::Ntfy { topic, server } => match server {
            Some(s) => format!("ntfy ({}/{})", s, topic),
            None => format!("ntfy (ntfy.sh/{})", topic),
        },
        NotifyTarget::Command { command } => format!("command ({})", command),
    }
}

fn describe_permission(permission: Permission) -> String {
    match permission {
        Permission::Granted => "granted".green().to_string(),
        Permission::Denied => "denied".red().to_string(),
        Permission::Default => "not asked".yellow().to_string(),
    }
}

fn on_off(value: bool) -> String {
    if value {
        "on".green().to_string()
    } else {
        "off".dimmed().to_string()
    }
}
