use std::fs::OpenOptions;
use std::io::Write;
use std::process::{Command, Stdio};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{Config, NotifyTarget};
use crate::db::KeyValueStore;
use crate::error::{Result, TaqwaError};
use crate::settings::Permission;
use crate::timings::Prayer;

pub const PERMISSION_KEY: &str = "taqwa_notification_permission";

/// Which of the two alerts per prayer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Before,
    AtTime,
}

/// A single alert as handed to a notifier
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub prayer: Prayer,
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    /// Alerts sharing a tag replace each other
    pub tag: String,
    /// Stay on screen until dismissed
    pub require_interaction: bool,
    pub fired_at: DateTime<Utc>,
}

impl Alert {
    pub fn before(prayer: Prayer, time: &str, minutes_before: u32, fired_at: DateTime<Utc>) -> Self {
        Self {
            prayer,
            kind: AlertKind::Before,
            title: format!("{} in {} minutes", prayer, minutes_before),
            body: format!("{} prayer will begin at {}", prayer, time),
            tag: format!("{}-before", prayer),
            require_interaction: false,
            fired_at,
        }
    }

    pub fn at_time(prayer: Prayer, fired_at: DateTime<Utc>) -> Self {
        Self {
            prayer,
            kind: AlertKind::AtTime,
            title: format!("{} Prayer Time", prayer),
            body: format!("It's time for {} prayer", prayer),
            tag: format!("{}-time", prayer),
            require_interaction: true,
            fired_at,
        }
    }
}

/// Platform notification capability
pub trait Notifier {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    fn notify(&self, alert: &Alert) -> Result<()>;
}

/// Build the notifier for the configured target
pub fn from_config(config: &Config, store: Rc<dyn KeyValueStore>) -> Box<dyn Notifier> {
    match &config.notify {
        NotifyTarget::Desktop => Box::new(DesktopNotifier::new(store)),
        NotifyTarget::Ntfy { topic, server } => Box::new(NtfyNotifier {
            topic: topic.clone(),
            server: server.clone(),
        }),
        NotifyTarget::Command { command } => Box::new(CommandNotifier {
            command: command.clone(),
        }),
    }
}

/// Append the alert to the notification log for later review
fn log_notification(alert: &Alert, target_type: &str) {
    if let Ok(data_dir) = Config::data_dir() {
        let _ = std::fs::create_dir_all(&data_dir);
        let log_path = data_dir.join("notifications.log");
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let log_entry = format!(
                "{} | {} | {} | {}\n",
                alert.fired_at.format("%Y-%m-%d %H:%M:%S UTC"),
                target_type,
                alert.tag,
                alert.title,
            );
            let _ = file.write_all(log_entry.as_bytes());
        }
    }
}

/// Native desktop notifications. The user's grant is remembered in the store,
/// the way a browser remembers a site's notification permission.
pub struct DesktopNotifier {
    store: Rc<dyn KeyValueStore>,
}

impl DesktopNotifier {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn show(title: &str, body: &str, require_interaction: bool) -> Result<()> {
        let mut notification = notify_rust::Notification::new();
        notification.summary(title).body(body).appname("taqwa");
        if require_interaction {
            notification.timeout(notify_rust::Timeout::Never);
        }
        notification
            .show()
            .map(|_| ())
            .map_err(|e| TaqwaError::NotificationUnsupported(e.to_string()))
    }
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        self.store
            .get(PERMISSION_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Shows a probe notification; if the desktop accepts it the grant sticks
    fn request_permission(&mut self) -> Permission {
        let permission = match Self::show("taqwa", "Prayer notifications enabled", false) {
            Ok(()) => Permission::Granted,
            Err(err) => {
                tracing::warn!(%err, "desktop notifications unavailable");
                Permission::Denied
            }
        };
        let stored = serde_json::to_string(&permission)
            .map_err(TaqwaError::from)
            .and_then(|json| self.store.set(PERMISSION_KEY, &json));
        if let Err(err) = stored {
            tracing::error!(%err, "failed to store notification permission");
        }
        permission
    }

    fn notify(&self, alert: &Alert) -> Result<()> {
        if self.permission() != Permission::Granted {
            return Err(TaqwaError::NotificationPermissionDenied);
        }
        log_notification(alert, "desktop");
        Self::show(&alert.title, &alert.body, alert.require_interaction)
    }
}

/// Push via ntfy
pub struct NtfyNotifier {
    pub topic: String,
    pub server: Option<String>,
}

impl Notifier for NtfyNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, alert: &Alert) -> Result<()> {
        log_notification(alert, "ntfy");

        let server = self.server.as_deref().unwrap_or("https://ntfy.sh");
        let url = format!("{}/{}", server.trim_end_matches('/'), self.topic);
        let priority = if alert.require_interaction { "high" } else { "default" };

        ureq::post(&url)
            .header("Title", &alert.title)
            .header("Priority", priority)
            .header("Tags", "mosque")
            .send(&alert.body)?;

        Ok(())
    }
}

/// Custom command, alert JSON on stdin
pub struct CommandNotifier {
    pub command: String,
}

impl Notifier for CommandNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, alert: &Alert) -> Result<()> {
        log_notification(alert, "command");
        let json = serde_json::to_string(alert)?;

        let mut child = Command::new("sh")
            .args(["-c", &self.command])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(ref mut stdin) = child.stdin {
            stdin.write_all(json.as_bytes())?;
        }

        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TaqwaError::NotificationUnsupported(format!(
                "Command failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Plays the adhan through a user-supplied command, without waiting for it
pub struct AdhanPlayer {
    command: String,
}

impl AdhanPlayer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn play(&self, prayer: Prayer) {
        tracing::info!(%prayer, "playing adhan");
        let spawned = Command::new("sh")
            .args(["-c", &self.command])
            .env("TAQWA_PRAYER", prayer.name())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(err) = spawned {
            tracing::warn!(%err, "failed to start adhan command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_before_alert_text() {
        let alert = Alert::before(Prayer::Maghrib, "18:20", 10, Utc::now());
        assert_eq!(alert.title, "Maghrib in 10 minutes");
        assert_eq!(alert.body, "Maghrib prayer will begin at 18:20");
        assert_eq!(alert.tag, "Maghrib-before");
        assert!(!alert.require_interaction);
    }

    #[test]
    fn test_at_time_alert_text() {
        let alert = Alert::at_time(Prayer::Fajr, Utc::now());
        assert_eq!(alert.title, "Fajr Prayer Time");
        assert_eq!(alert.body, "It's time for Fajr prayer");
        assert_eq!(alert.tag, "Fajr-time");
        assert!(alert.require_interaction);
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::at_time(Prayer::Isha, Utc::now());
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["prayer"], "Isha");
        assert_eq!(json["kind"], "at_time");
        assert_eq!(json["require_interaction"], true);
    }

    #[test]
    fn test_desktop_permission_defaults_and_blocks() {
        let store = Rc::new(MemoryStore::new());
        let notifier = DesktopNotifier::new(store.clone());
        assert_eq!(notifier.permission(), Permission::Default);

        let alert = Alert::at_time(Prayer::Asr, Utc::now());
        assert!(matches!(
            notifier.notify(&alert),
            Err(TaqwaError::NotificationPermissionDenied)
        ));

        store.set(PERMISSION_KEY, "\"denied\"").unwrap();
        assert_eq!(notifier.permission(), Permission::Denied);
    }

    #[test]
    fn test_push_targets_are_always_permitted() {
        let ntfy = NtfyNotifier {
            topic: "prayers".into(),
            server: None,
        };
        assert_eq!(ntfy.permission(), Permission::Granted);
        let command = CommandNotifier {
            command: "cat".into(),
        };
        assert_eq!(command.permission(), Permission::Granted);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_notifier_reports_failure() {
        let notifier = CommandNotifier {
            command: "cat > /dev/null; echo nope >&2; exit 3".into(),
        };
        let err = notifier
            .notify(&Alert::at_time(Prayer::Dhuhr, Utc::now()))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
