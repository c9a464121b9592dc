//! User notification settings, persisted in the key-value store

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::db::KeyValueStore;
use crate::error::Result;
use crate::timings::Prayer;

pub const SETTINGS_KEY: &str = "taqwa_notification_settings";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub enabled: bool,
    /// Alert `minutes_before` the prayer
    pub notify_before: bool,
    /// Alert at the prayer time itself
    pub notify_at_time: bool,
    pub minutes_before: u32,
    pub play_adhan: bool,
    /// Per-prayer switch; a prayer missing from the map is off
    pub prayers: BTreeMap<Prayer, bool>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_before: true,
            notify_at_time: true,
            minutes_before: 10,
            play_adhan: false,
            prayers: Prayer::ALL.into_iter().map(|p| (p, true)).collect(),
        }
    }
}

impl NotificationSettings {
    pub fn is_prayer_enabled(&self, prayer: Prayer) -> bool {
        self.prayers.get(&prayer).copied().unwrap_or(false)
    }

    pub fn toggle_prayer(&mut self, prayer: Prayer) {
        let enabled = self.is_prayer_enabled(prayer);
        self.prayers.insert(prayer, !enabled);
    }
}

/// Partial update, applied field by field
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub enabled: Option<bool>,
    pub notify_before: Option<bool>,
    pub notify_at_time: Option<bool>,
    pub minutes_before: Option<u32>,
    pub play_adhan: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.notify_before.is_none()
            && self.notify_at_time.is_none()
            && self.minutes_before.is_none()
            && self.play_adhan.is_none()
    }

    pub fn apply(&self, settings: &mut NotificationSettings) {
        if let Some(v) = self.enabled {
            settings.enabled = v;
        }
        if let Some(v) = self.notify_before {
            settings.notify_before = v;
        }
        if let Some(v) = self.notify_at_time {
            settings.notify_at_time = v;
        }
        if let Some(v) = self.minutes_before {
            settings.minutes_before = v;
        }
        if let Some(v) = self.play_adhan {
            settings.play_adhan = v;
        }
    }
}

/// Whether alerts may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Never asked
    #[default]
    Default,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Default => "default",
        })
    }
}

/// Loads and saves `NotificationSettings`
pub struct SettingsStore {
    store: Rc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored values merged over the defaults; anything unreadable gives defaults
    pub fn load(&self) -> NotificationSettings {
        match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(%err, "ignoring malformed notification settings");
                NotificationSettings::default()
            }),
            Ok(None) => NotificationSettings::default(),
            Err(err) => {
                tracing::warn!(%err, "failed to read notification settings");
                NotificationSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &NotificationSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &json)
    }

    pub fn update(&self, update: &SettingsUpdate) -> Result<NotificationSettings> {
        let mut settings = self.load();
        update.apply(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn toggle_prayer(&self, prayer: Prayer) -> Result<NotificationSettings> {
        let mut settings = self.load();
        settings.toggle_prayer(prayer);
        self.save(&settings)?;
        Ok(settings)
    }
}
