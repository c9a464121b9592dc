//! Owns the pipeline state and re-runs the dependent steps whenever the
//! location, settings or permission change.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::error::Result;
use crate::location::{Location, LocationResolver};
use crate::notify::{AdhanPlayer, Alert, Notifier};
use crate::schedule::{self, NextPrayer, PrayerDisplayEntry};
use crate::scheduler::NotificationScheduler;
use crate::settings::{NotificationSettings, Permission};
use crate::timings::{PrayerTimeProvider, RawPrayerTimings};

pub struct Companion {
    resolver: LocationResolver,
    provider: PrayerTimeProvider,
    scheduler: NotificationScheduler,
    notifier: Box<dyn Notifier>,
    adhan: Option<AdhanPlayer>,
    settings: NotificationSettings,
    permission: Permission,
    /// Last location asked for; may differ from `location` while its fetch fails
    requested: Option<Location>,
    /// Location the current timings belong to
    location: Option<Location>,
    timings: Option<RawPrayerTimings>,
    /// Local date the timings were fetched on
    fetched_on: Option<NaiveDate>,
}

impl Companion {
    pub fn new(
        resolver: LocationResolver,
        provider: PrayerTimeProvider,
        notifier: Box<dyn Notifier>,
        settings: NotificationSettings,
        adhan: Option<AdhanPlayer>,
    ) -> Self {
        let permission = notifier.permission();
        Self {
            resolver,
            provider,
            scheduler: NotificationScheduler::new(),
            notifier,
            adhan,
            settings,
            permission,
            requested: None,
            location: None,
            timings: None,
            fetched_on: None,
        }
    }

    /// Resolve a location (cache first) and load its timings
    pub fn start<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<()> {
        let location = self.resolver.resolve(false);
        self.set_location(location, now)
    }

    /// Resolve again and follow the location if it moved
    pub fn refresh_location<Tz: TimeZone>(&mut self, force: bool, now: &DateTime<Tz>) -> Result<()> {
        let location = self.resolver.resolve(force);
        self.set_location(location, now)
    }

    /// User-entered location; no position lookup
    pub fn set_manual_location<Tz: TimeZone>(&mut self, location: Location, now: &DateTime<Tz>) -> Result<()> {
        self.resolver.set_manual_location(location.clone());
        self.set_location(location, now)
    }

    /// A changed location triggers a fetch and a reschedule. When the fetch
    /// fails the previous location, timings and alerts are kept and the error
    /// returned; `refetch` or a repeated call retries the new location.
    pub fn set_location<Tz: TimeZone>(&mut self, location: Location, now: &DateTime<Tz>) -> Result<()> {
        if self.location.as_ref() == Some(&location) && self.timings.is_some() {
            self.requested = Some(location);
            return Ok(());
        }
        tracing::info!(location = %location.label(), "location changed");
        self.requested = Some(location.clone());

        let timings = self.provider.fetch_timings(&location)?;
        self.location = Some(location);
        self.apply_timings(timings, now);
        Ok(())
    }

    /// Fetch timings for the last requested location again (e.g. after midnight)
    pub fn refetch<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Result<()> {
        let timings = self.provider.refetch()?;
        self.location = self.requested.clone();
        self.apply_timings(timings, now);
        Ok(())
    }

    /// Whether the timings are missing, belong to another day, or to a
    /// location other than the one last requested
    pub fn needs_refetch<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.requested.is_some()
            && (self.fetched_on != Some(now.naive_local().date()) || self.location != self.requested)
    }

    pub fn update_settings<Tz: TimeZone>(&mut self, settings: NotificationSettings, now: &DateTime<Tz>) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        self.reschedule(now);
    }

    pub fn set_permission<Tz: TimeZone>(&mut self, permission: Permission, now: &DateTime<Tz>) {
        if permission == self.permission {
            return;
        }
        self.permission = permission;
        self.reschedule(now);
    }

    /// Pick up a permission granted or revoked since startup
    pub fn sync_permission<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) {
        let permission = self.notifier.permission();
        self.set_permission(permission, now);
    }

    pub fn request_permission<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Permission {
        let permission = self.notifier.request_permission();
        self.set_permission(permission, now);
        permission
    }

    /// Deliver any alerts that are due
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Alert> {
        self.scheduler
            .fire_due(now, self.notifier.as_ref(), self.adhan.as_ref())
    }

    /// Teardown: nothing may fire after this
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn timings(&self) -> Option<&RawPrayerTimings> {
        self.timings.as_ref()
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn next_prayer<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<NextPrayer> {
        let minutes = schedule::minutes_since_midnight(now.naive_local().time());
        schedule::next_prayer(self.timings.as_ref(), minutes)
    }

    pub fn countdown<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String {
        let next = self.next_prayer(now).map(|n| n.time);
        schedule::time_until(next, now.naive_local().time())
    }

    pub fn display_list<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<PrayerDisplayEntry> {
        let minutes = schedule::minutes_since_midnight(now.naive_local().time());
        schedule::display_list(self.timings.as_ref(), minutes)
    }

    fn apply_timings<Tz: TimeZone>(&mut self, timings: Option<RawPrayerTimings>, now: &DateTime<Tz>) {
        self.timings = timings;
        self.fetched_on = Some(now.naive_local().date());
        self.reschedule(now);
    }

    fn reschedule<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) {
        self.scheduler
            .reschedule(self.timings.as_ref(), &self.settings, self.permission, now);
    }
}
