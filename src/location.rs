//! Location acquisition: a cached last-known location and a resolver that
//! falls back from a fresh cache, to a live fix, to any cache, to a default.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::KeyValueStore;
use crate::deadline::run_with_deadline;
use crate::error::{Result, TaqwaError};
use crate::geocode::ReverseGeocoder;
use crate::geolocate::Geolocator;

pub const LOCATION_KEY: &str = "lastKnownLocation";
pub const TIMESTAMP_KEY: &str = "lastKnownLocationTimestamp";

/// Extra time the whole live lookup gets on top of the GPS timeout
const LIVE_DEADLINE_BUFFER: Duration = Duration::from_millis(1000);

const PLACEHOLDER_CITY: &str = "Current Location";
const PLACEHOLDER_COUNTRY: &str = "GPS Location";
const UNKNOWN_LOCATION_LABEL: &str = "Somewhere in Duniya";

/// Source of "now"; swapped for a fixed instant in tests
pub type Clock = Rc<dyn Fn() -> DateTime<Utc>>;

pub fn system_clock() -> Clock {
    Rc::new(Utc::now)
}

/// Coordinates and/or a city and country
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn from_city(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            country: Some(country.into()),
            ..Self::default()
        }
    }

    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    /// Used when nothing better is known
    pub fn fallback() -> Self {
        Self::from_city("Makkah", "Saudi Arabia")
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn city_country(&self) -> Option<(&str, &str)> {
        self.city.as_deref().zip(self.country.as_deref())
    }

    /// Whether the timing service can be asked about this location
    pub fn is_usable(&self) -> bool {
        self.coordinates().is_some() || self.city_country().is_some()
    }

    /// "City, Country" for display
    pub fn label(&self) -> String {
        match self.city_country() {
            Some((city, country)) => format!("{}, {}", city, country),
            None => UNKNOWN_LOCATION_LABEL.to_string(),
        }
    }
}

/// A cached location and when it was stored
#[derive(Debug, Clone, PartialEq)]
pub struct LocationCacheEntry {
    pub location: Location,
    pub fetched_at_ms: i64,
}

/// Last-known location persisted in the key-value store
pub struct LocationCache {
    store: Rc<dyn KeyValueStore>,
    fresh_window: Duration,
    clock: Clock,
}

impl LocationCache {
    pub fn new(store: Rc<dyn KeyValueStore>, fresh_window: Duration) -> Self {
        Self::with_clock(store, fresh_window, system_clock())
    }

    pub fn with_clock(store: Rc<dyn KeyValueStore>, fresh_window: Duration, clock: Clock) -> Self {
        Self {
            store,
            fresh_window,
            clock,
        }
    }

    /// Missing or unreadable data reads as `None`
    pub fn read(&self) -> Option<LocationCacheEntry> {
        let raw = match self.store.get(LOCATION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(%err, "failed to read cached location");
                return None;
            }
        };

        let location: Location = match serde_json::from_str(&raw) {
            Ok(location) => location,
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed cached location");
                return None;
            }
        };

        // A location without a usable timestamp is treated as very old
        let fetched_at_ms = self
            .store
            .get(TIMESTAMP_KEY)
            .ok()
            .flatten()
            .and_then(|ts| ts.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Some(LocationCacheEntry {
            location,
            fetched_at_ms,
        })
    }

    /// Store a location stamped with the current time; failures are logged only
    pub fn write(&self, location: &Location) {
        let json = match serde_json::to_string(location) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(%err, "failed to serialize location");
                return;
            }
        };
        let now_ms = (self.clock)().timestamp_millis();

        let result = self
            .store
            .set(LOCATION_KEY, &json)
            .and_then(|_| self.store.set(TIMESTAMP_KEY, &now_ms.to_string()));
        if let Err(err) = result {
            tracing::error!(%err, "failed to cache location");
        }
    }

    pub fn is_fresh(&self, entry: &LocationCacheEntry) -> bool {
        let age_ms = (self.clock)().timestamp_millis() - entry.fetched_at_ms;
        age_ms < self.fresh_window.as_millis() as i64
    }

    pub fn clear(&self) {
        for key in [LOCATION_KEY, TIMESTAMP_KEY] {
            if let Err(err) = self.store.remove(key) {
                tracing::error!(%err, key, "failed to clear location cache");
            }
        }
    }
}

/// Produces a location through the layered fallback chain
pub struct LocationResolver {
    cache: LocationCache,
    geolocator: Arc<dyn Geolocator>,
    geocoder: Arc<dyn ReverseGeocoder>,
    gps_timeout: Duration,
    geocoding_timeout: Duration,
    current: Option<Location>,
}

impl LocationResolver {
    pub fn new(
        cache: LocationCache,
        geolocator: Arc<dyn Geolocator>,
        geocoder: Arc<dyn ReverseGeocoder>,
        gps_timeout: Duration,
        geocoding_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            geolocator,
            geocoder,
            gps_timeout,
            geocoding_timeout,
            current: None,
        }
    }

    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    /// The location most recently produced or set on this resolver
    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Always yields some location. Steps, in order: fresh cache (unless
    /// `force_refresh`), live fix plus name, any cached location, Makkah.
    pub fn resolve(&mut self, force_refresh: bool) -> Location {
        if !force_refresh {
            if let Some(entry) = self.cache.read() {
                if self.cache.is_fresh(&entry) {
                    tracing::debug!("using recent cached location");
                    return self.remember(entry.location);
                }
            }
        }

        match self.live_location(force_refresh) {
            Ok(location) => {
                tracing::info!(location = %location.label(), "resolved fresh location");
                self.cache.write(&location);
                return self.remember(location);
            }
            Err(err) => tracing::warn!(%err, "fresh location failed"),
        }

        if let Some(entry) = self.cache.read() {
            tracing::info!("using old cached location as fallback");
            return self.remember(entry.location);
        }

        tracing::info!("using default fallback location");
        let fallback = Location::fallback();
        self.cache.write(&fallback);
        self.remember(fallback)
    }

    /// Live lookup only: errors are returned instead of falling back
    pub fn refresh_strict(&mut self) -> Result<Location> {
        let location = self.live_location(true)?;
        self.cache.write(&location);
        Ok(self.remember(location))
    }

    /// Take a user-entered location as-is, skipping the position lookup
    pub fn set_manual_location(&mut self, location: Location) {
        self.cache.write(&location);
        self.current = Some(location);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.current = None;
    }

    fn remember(&mut self, location: Location) -> Location {
        self.current = Some(location.clone());
        location
    }

    /// Position fix within the GPS timeout plus a buffer, then naming under
    /// its own timeout. A naming failure never discards the fix.
    fn live_location(&self, high_accuracy: bool) -> Result<Location> {
        let geolocator = Arc::clone(&self.geolocator);
        let gps_timeout = self.gps_timeout;

        let position = run_with_deadline(gps_timeout + LIVE_DEADLINE_BUFFER, move || {
            geolocator.current_position(gps_timeout, high_accuracy)
        })
        .unwrap_or(Err(TaqwaError::GpsTimeout))?;
        tracing::debug!(lat = position.latitude, lon = position.longitude, "got coordinates");

        let (latitude, longitude) = (position.latitude, position.longitude);
        let geocoder = Arc::clone(&self.geocoder);
        let named = run_with_deadline(self.geocoding_timeout, move || {
            geocoder.reverse_geocode(latitude, longitude)
        })
        .unwrap_or(Err(TaqwaError::GeocodingTimeout));

        let (city, country) = match named {
            Ok(place) => (place.city, place.country),
            Err(err) => {
                tracing::warn!(%err, "geocoding failed, using generic names");
                (PLACEHOLDER_CITY.to_string(), PLACEHOLDER_COUNTRY.to_string())
            }
        };

        Ok(Location {
            latitude: Some(latitude),
            longitude: Some(longitude),
            city: Some(city),
            country: Some(country),
        })
    }
}
