//! Location commands: show/refresh, set, search, clear

use chrono::{TimeZone, Utc};
use colored::Colorize;

use taqwa::config::Config;
use taqwa::error::{Result, TaqwaError};
use taqwa::geocode::{NominatimGeocoder, MIN_SEARCH_QUERY_LEN};
use taqwa::location::Location;

use super::{build_resolver, open_store};

const SEARCH_LIMIT: usize = 5;

/// Show the current location, looking it up if needed
pub fn cmd_location(refresh: bool, strict: bool, json: bool) -> Result<()> {
    let config = Config::load()?;
    let store = open_store()?;
    let mut resolver = build_resolver(&config, store);

    let location = if strict {
        resolver.refresh_strict()?
    } else {
        resolver.resolve(refresh)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&location)?);
        return Ok(());
    }

    println!("\n{}", location.label().bold());
    if let Some((lat, lon)) = location.coordinates() {
        println!("  {:.4}, {:.4}", lat, lon);
    }
    if let Some(entry) = resolver.cache().read() {
        if let Some(stored) = Utc.timestamp_millis_opt(entry.fetched_at_ms).single() {
            let age = if resolver.cache().is_fresh(&entry) {
                "fresh".green()
            } else {
                "stale".yellow()
            };
            println!(
                "  {} cached {} ({})",
                "·".dimmed(),
                stored.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                age
            );
        }
    }
    println!();
    Ok(())
}

/// Store a user-entered location
pub fn cmd_location_set(
    city: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<()> {
    let location = match (city, country, lat, lon) {
        (Some(city), Some(country), _, _) => Location::from_city(city.trim(), country.trim()),
        (_, _, Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(TaqwaError::ConfigError(format!(
                    "Coordinates out of range: {}, {}",
                    lat, lon
                )));
            }
            Location::from_coordinates(lat, lon)
        }
        _ => {
            return Err(TaqwaError::ConfigError(
                "Give either --city and --country, or --lat and --lon".into(),
            ));
        }
    };

    let config = Config::load()?;
    let store = open_store()?;
    let mut resolver = build_resolver(&config, store);
    resolver.set_manual_location(location.clone());

    match location.coordinates() {
        Some((lat, lon)) => println!("Location set to {:.4}, {:.4}", lat, lon),
        None => println!("Location set to {}", location.label().bold()),
    }
    Ok(())
}

/// Search places by name; `--pick` stores one like `location set`
pub fn cmd_location_search(query: &str, pick: Option<usize>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let geocoder = NominatimGeocoder::new(&config.geocoding_base_url);
    let results = geocoder.search(query, SEARCH_LIMIT)?;

    if json {
        let locations: Vec<Location> = results.iter().map(|r| r.to_location()).collect();
        println!("{}", serde_json::to_string_pretty(&locations)?);
        return Ok(());
    }

    if results.is_empty() {
        if query.trim().chars().count() < MIN_SEARCH_QUERY_LEN {
            println!("Type at least {} characters to search.", MIN_SEARCH_QUERY_LEN);
        } else {
            println!("No places found for \"{}\".", query);
        }
        return Ok(());
    }

    let Some(n) = pick else {
        println!();
        for (i, result) in results.iter().enumerate() {
            println!(
                "  {}. {}  {}",
                i + 1,
                result.label().bold(),
                format!("({:.4}, {:.4})", result.latitude, result.longitude).dimmed()
            );
        }
        println!("\nUse one with `taqwa location search {} --pick <N>`.\n", query);
        return Ok(());
    };

    let chosen = results.get(n - 1).ok_or_else(|| {
        TaqwaError::ConfigError(format!("--pick {} is out of range (1-{})", n, results.len()))
    })?;

    let store = open_store()?;
    let mut resolver = build_resolver(&config, store);
    resolver.set_manual_location(chosen.to_location());
    println!("Location set to {}", chosen.label().bold());
    Ok(())
}

/// Forget the cached location
pub fn cmd_location_clear() -> Result<()> {
    let config = Config::load()?;
    let store = open_store()?;
    let mut resolver = build_resolver(&config, store);
    resolver.clear_cache();
    println!("Cached location cleared.");
    Ok(())
}
