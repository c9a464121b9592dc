//! Geocoding: coordinates to a city and country name, and place search

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TaqwaError};
use crate::location::Location;

/// Request timeout for the geocoding HTTP call itself
const REQUEST_TIMEOUT_SECS: u64 = 5;

const USER_AGENT: &str = "taqwa/0.1 (prayer times)";

/// Shorter queries return nothing without a request
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub city: String,
    pub country: String,
}

/// Best-effort naming service; callers treat every error as "no name"
pub trait ReverseGeocoder: Send + Sync {
    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Place>;
}

/// A place found by name
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SearchResult {
    /// "City, State, Country", or "City, Country" when there is no state
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.city, state, self.country),
            None => format!("{}, {}", self.city, self.country),
        }
    }

    pub fn to_location(&self) -> Location {
        Location {
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            city: Some(self.city.clone()),
            country: Some(self.country.clone()),
        }
    }
}

/// OpenStreetMap Nominatim `/reverse` and `/search`
pub struct NominatimGeocoder {
    agent: ureq::Agent,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimSearchItem {
    lat: String,
    lon: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
}

impl NominatimAddress {
    /// Most specific populated place name wins
    fn into_place(self) -> Place {
        let city = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.county)
            .or(self.state)
            .unwrap_or_else(|| "Unknown City".to_string());
        let country = self.country.unwrap_or_else(|| "Unknown Country".to_string());
        Place { city, country }
    }
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Places matching a free-text query, best match first
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Ok(Vec::new());
        }

        let url = format!("{}/search", self.base_url);
        tracing::debug!(%url, query, "searching places");

        let response = self
            .agent
            .get(&url)
            .query("q", query)
            .query("format", "json")
            .query("addressdetails", "1")
            .query("limit", limit.to_string())
            .header("User-Agent", USER_AGENT)
            .call();

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Timeout(_)) => return Err(TaqwaError::GeocodingTimeout),
            Err(err) => return Err(TaqwaError::GeocodingFailed(format!("search failed: {}", err))),
        };

        let items: Vec<NominatimSearchItem> = response
            .into_body()
            .read_json()
            .map_err(|e| TaqwaError::GeocodingFailed(e.to_string()))?;

        Ok(parse_search(items))
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<Place> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .agent
            .get(&url)
            .query("lat", latitude.to_string())
            .query("lon", longitude.to_string())
            .query("format", "json")
            .query("addressdetails", "1")
            .header("User-Agent", USER_AGENT)
            .call();

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Timeout(_)) => return Err(TaqwaError::GeocodingTimeout),
            Err(err) => return Err(TaqwaError::GeocodingFailed(err.to_string())),
        };

        let body: NominatimResponse = response
            .into_body()
            .read_json()
            .map_err(|e| TaqwaError::GeocodingFailed(e.to_string()))?;

        parse_place(body)
    }
}

fn parse_place(body: NominatimResponse) -> Result<Place> {
    body.address
        .map(NominatimAddress::into_place)
        .ok_or_else(|| TaqwaError::GeocodingFailed("Invalid geocoding response".into()))
}

/// Items without usable coordinates or any place name are skipped
fn parse_search(items: Vec<NominatimSearchItem>) -> Vec<SearchResult> {
    items
        .into_iter()
        .filter_map(|item| {
            let latitude = item.lat.parse().ok()?;
            let longitude = item.lon.parse().ok()?;
            let address = item.address;
            let city = address
                .city
                .or(address.town)
                .or(address.village)
                .or(item.name)?;
            Some(SearchResult {
                city,
                state: address.state,
                country: address.country.unwrap_or_default(),
                latitude,
                longitude,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Place> {
        parse_place(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_city_preferred() {
        let place = parse(
            r#"{"address":{"city":"Makkah","state":"Makkah Province","country":"Saudi Arabia"}}"#,
        )
        .unwrap();
        assert_eq!(place.city, "Makkah");
        assert_eq!(place.country, "Saudi Arabia");
    }

    #[test]
    fn test_falls_through_smaller_places() {
        let place = parse(r#"{"address":{"village":"Al Ula","country":"Saudi Arabia"}}"#).unwrap();
        assert_eq!(place.city, "Al Ula");

        let place = parse(r#"{"address":{"state":"Texas"}}"#).unwrap();
        assert_eq!(place.city, "Texas");
        assert_eq!(place.country, "Unknown Country");
    }

    #[test]
    fn test_empty_address_uses_unknown_names() {
        let place = parse(r#"{"address":{}}"#).unwrap();
        assert_eq!(place.city, "Unknown City");
        assert_eq!(place.country, "Unknown Country");
    }

    #[test]
    fn test_missing_address_is_an_error() {
        let err = parse(r#"{"error":"Unable to geocode"}"#).unwrap_err();
        assert!(matches!(err, TaqwaError::GeocodingFailed(_)));
    }

    fn search(json: &str) -> Vec<SearchResult> {
        parse_search(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_search_results() {
        let results = search(
            r#"[
                {"lat":"30.0443879","lon":"31.2357257","name":"Cairo",
                 "address":{"city":"Cairo","state":"Cairo Governorate","country":"Egypt"}},
                {"lat":"21.4225","lon":"39.8262","name":"Al Haram",
                 "address":{"country":"Saudi Arabia"}}
            ]"#,
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label(), "Cairo, Cairo Governorate, Egypt");
        assert_eq!(results[0].latitude, 30.0443879);
        assert_eq!(results[1].city, "Al Haram");
        assert_eq!(results[1].label(), "Al Haram, Saudi Arabia");

        let location = results[0].to_location();
        assert_eq!(location.coordinates(), Some((30.0443879, 31.2357257)));
        assert_eq!(location.label(), "Cairo, Egypt");
    }

    #[test]
    fn test_search_skips_unusable_items() {
        let results = search(
            r#"[
                {"lat":"north","lon":"31.2","name":"Nowhere","address":{}},
                {"lat":"30.0","lon":"31.2","address":{"country":"Egypt"}},
                {"lat":"24.5","lon":"39.6","address":{"town":"Quba","country":"Saudi Arabia"}}
            ]"#,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].city, "Quba");
        assert_eq!(results[0].state, None);
    }

    #[test]
    fn test_short_query_skips_request() {
        let geocoder = NominatimGeocoder::new("http://127.0.0.1:9");
        assert!(geocoder.search(" a ", 5).unwrap().is_empty());
    }
}
