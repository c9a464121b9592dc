//! Command implementations for the taqwa CLI

mod config;
mod daemon;
mod location;
mod notify;
mod times;

pub use config::*;
pub use daemon::*;
pub use location::*;
pub use notify::*;
pub use times::*;

use std::rc::Rc;
use std::sync::Arc;

use taqwa::companion::Companion;
use taqwa::config::Config;
use taqwa::db::{Database, KeyValueStore};
use taqwa::error::Result;
use taqwa::geocode::NominatimGeocoder;
use taqwa::geolocate;
use taqwa::location::{LocationCache, LocationResolver};
use taqwa::notify::{self as notifier, AdhanPlayer};
use taqwa::settings::SettingsStore;
use taqwa::timings::{AladhanClient, PrayerTimeProvider};

/// Open the on-disk key/value store shared by every command
fn open_store() -> Result<Rc<dyn KeyValueStore>> {
    Ok(Rc::new(Database::open()?))
}

fn build_resolver(config: &Config, store: Rc<dyn KeyValueStore>) -> LocationResolver {
    let cache = LocationCache::new(store, config.fresh_window());
    LocationResolver::new(
        cache,
        geolocate::from_config(&config.geolocation),
        Arc::new(NominatimGeocoder::new(&config.geocoding_base_url)),
        config.gps_timeout(),
        config.geocoding_timeout(),
    )
}

/// Wire the whole pipeline from configuration and the store
fn build_companion(config: &Config, store: Rc<dyn KeyValueStore>) -> Companion {
    let resolver = build_resolver(config, store.clone());
    let provider = PrayerTimeProvider::new(
        Box::new(AladhanClient::new(&config.timings_base_url)),
        config.method,
    );
    let settings = SettingsStore::new(store.clone()).load();
    let adhan = config.adhan_command.as_deref().map(AdhanPlayer::new);
    Companion::new(
        resolver,
        provider,
        notifier::from_config(config, store),
        settings,
        adhan,
    )
}
