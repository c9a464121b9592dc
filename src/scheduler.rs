//! Prayer alert scheduling.
//!
//! Pending alerts live in a small map keyed by `(prayer, kind)`, so there are
//! never more than ten. Every input change cancels the whole set before a new
//! batch is armed; a driving loop calls `fire_due` with the current time.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::notify::{AdhanPlayer, Alert, AlertKind, Notifier};
use crate::schedule::duration_until;
use crate::settings::{NotificationSettings, Permission};
use crate::timings::{Prayer, PrayerTime, RawPrayerTimings};

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAlert {
    pub prayer: Prayer,
    pub kind: AlertKind,
    pub prayer_time: PrayerTime,
    pub fire_at: DateTime<Utc>,
    /// Delay computed when the alert was armed
    pub delay: Duration,
    minutes_before: u32,
    play_adhan: bool,
}

impl ScheduledAlert {
    fn to_alert(&self, fired_at: DateTime<Utc>) -> Alert {
        match self.kind {
            AlertKind::Before => Alert::before(
                self.prayer,
                &self.prayer_time.to_string(),
                self.minutes_before,
                fired_at,
            ),
            AlertKind::AtTime => Alert::at_time(self.prayer, fired_at),
        }
    }
}

#[derive(Debug, Default)]
pub struct NotificationScheduler {
    pending: BTreeMap<(Prayer, AlertKind), ScheduledAlert>,
}

impl NotificationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel everything, then arm a fresh batch if alerts are enabled,
    /// permitted and there are timings. Returns the number armed.
    pub fn reschedule<Tz: TimeZone>(
        &mut self,
        timings: Option<&RawPrayerTimings>,
        settings: &NotificationSettings,
        permission: Permission,
        now: &DateTime<Tz>,
    ) -> usize {
        self.cancel_all();

        let Some(timings) = timings else {
            return 0;
        };
        if !settings.enabled || permission != Permission::Granted {
            tracing::debug!(enabled = settings.enabled, %permission, "alerts not armed");
            return 0;
        }

        let now_utc = now.with_timezone(&Utc);
        let time_of_day = now.naive_local().time();

        for (prayer, prayer_time) in timings.iter() {
            if !settings.is_prayer_enabled(prayer) {
                continue;
            }

            let mut arm = |kind: AlertKind, target: PrayerTime| {
                let delay = duration_until(target, time_of_day);
                let alert = ScheduledAlert {
                    prayer,
                    kind,
                    prayer_time,
                    fire_at: now_utc + delay,
                    delay,
                    minutes_before: settings.minutes_before,
                    play_adhan: settings.play_adhan,
                };
                tracing::debug!(%prayer, ?kind, delay_secs = delay.num_seconds(), "alert armed");
                self.pending.insert((prayer, kind), alert);
            };

            if settings.notify_before {
                let target = PrayerTime::from_minutes(
                    prayer_time.minutes_since_midnight() as i64 - settings.minutes_before as i64,
                );
                arm(AlertKind::Before, target);
            }
            if settings.notify_at_time {
                arm(AlertKind::AtTime, prayer_time);
            }
        }

        tracing::info!(count = self.pending.len(), date = %timings.date, "prayer alerts scheduled");
        self.pending.len()
    }

    /// Drop every pending alert; returns how many were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        if cancelled > 0 {
            tracing::debug!(cancelled, "pending alerts cancelled");
        }
        cancelled
    }

    pub fn get(&self, prayer: Prayer, kind: AlertKind) -> Option<&ScheduledAlert> {
        self.pending.get(&(prayer, kind))
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScheduledAlert> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest pending fire time
    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.pending.values().map(|a| a.fire_at).min()
    }

    /// Fire and forget every alert whose time has come. Delivery failures
    /// are logged and never stop the remaining alerts.
    pub fn fire_due(
        &mut self,
        now: DateTime<Utc>,
        notifier: &dyn Notifier,
        adhan: Option<&AdhanPlayer>,
    ) -> Vec<Alert> {
        let due: Vec<(Prayer, AlertKind)> = self
            .pending
            .iter()
            .filter(|(_, alert)| alert.fire_at <= now)
            .map(|(key, _)| *key)
            .collect();

        let mut fired = Vec::with_capacity(due.len());
        for key in due {
            let Some(scheduled) = self.pending.remove(&key) else {
                continue;
            };
            let alert = scheduled.to_alert(now);

            match notifier.notify(&alert) {
                Ok(()) => tracing::info!(tag = %alert.tag, "alert sent"),
                Err(err) => tracing::warn!(tag = %alert.tag, %err, "alert failed"),
            }

            if scheduled.kind == AlertKind::AtTime && scheduled.play_adhan {
                match adhan {
                    Some(player) => player.play(scheduled.prayer),
                    None => tracing::debug!("adhan requested but no adhan_command configured"),
                }
            }

            fired.push(alert);
        }
        fired
    }
}
