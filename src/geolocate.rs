//! Device position sources

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{GeolocationConfig, GeolocationSource};
use crate::error::{Result, TaqwaError};

const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

/// A coordinate fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Platform geolocation capability.
///
/// Implementations fail with `GeolocationUnavailable` when there is no
/// position source, `PermissionDenied` when the user refused access and
/// `GpsTimeout` when no fix arrived within `timeout`.
pub trait Geolocator: Send + Sync {
    fn current_position(&self, timeout: Duration, high_accuracy: bool) -> Result<Position>;
}

/// Build the geolocator described by the config
pub fn from_config(config: &GeolocationConfig) -> Arc<dyn Geolocator> {
    if !config.allow {
        return Arc::new(DeniedGeolocator);
    }
    match &config.source {
        GeolocationSource::Ip { url } => Arc::new(IpGeolocator::new(url.clone())),
        GeolocationSource::Fixed { latitude, longitude } => Arc::new(FixedGeolocator {
            position: Position {
                latitude: *latitude,
                longitude: *longitude,
            },
        }),
        GeolocationSource::None => Arc::new(NoGeolocator),
    }
}

/// Approximate position from the public IP address
pub struct IpGeolocator {
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl IpGeolocator {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url: url.unwrap_or_else(|| DEFAULT_IP_LOOKUP_URL.to_string()),
        }
    }
}

impl Geolocator for IpGeolocator {
    fn current_position(&self, timeout: Duration, high_accuracy: bool) -> Result<Position> {
        tracing::debug!(url = %self.url, high_accuracy, "looking up position from IP");

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let response = match agent.get(&self.url).call() {
            Ok(response) => response,
            Err(ureq::Error::Timeout(_)) => return Err(TaqwaError::GpsTimeout),
            Err(err) => return Err(err.into()),
        };
        let lookup: IpLookupResponse = response.into_body().read_json()?;

        match (lookup.status.as_str(), lookup.lat, lookup.lon) {
            ("success", Some(latitude), Some(longitude)) => Ok(Position { latitude, longitude }),
            _ => {
                tracing::warn!(message = ?lookup.message, "IP lookup returned no position");
                Err(TaqwaError::GeolocationUnavailable)
            }
        }
    }
}

/// A position pinned in the config file
pub struct FixedGeolocator {
    pub position: Position,
}

impl Geolocator for FixedGeolocator {
    fn current_position(&self, _timeout: Duration, _high_accuracy: bool) -> Result<Position> {
        Ok(self.position)
    }
}

/// No position source on this machine
pub struct NoGeolocator;

impl Geolocator for NoGeolocator {
    fn current_position(&self, _timeout: Duration, _high_accuracy: bool) -> Result<Position> {
        Err(TaqwaError::GeolocationUnavailable)
    }
}

/// The user refused location access
pub struct DeniedGeolocator;

impl Geolocator for DeniedGeolocator {
    fn current_position(&self, _timeout: Duration, _high_accuracy: bool) -> Result<Position> {
        Err(TaqwaError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_disallowed_config_denies() {
        let config = GeolocationConfig {
            allow: false,
            source: GeolocationSource::Fixed {
                latitude: 1.0,
                longitude: 2.0,
            },
        };
        let geo = from_config(&config);
        assert!(matches!(
            geo.current_position(TIMEOUT, false),
            Err(TaqwaError::PermissionDenied)
        ));
    }

    #[test]
    fn test_fixed_source() {
        let config = GeolocationConfig {
            allow: true,
            source: GeolocationSource::Fixed {
                latitude: 21.42,
                longitude: 39.82,
            },
        };
        let position = from_config(&config).current_position(TIMEOUT, true).unwrap();
        assert_eq!(position, Position { latitude: 21.42, longitude: 39.82 });
    }

    #[test]
    fn test_no_source_is_unavailable() {
        let config = GeolocationConfig {
            allow: true,
            source: GeolocationSource::None,
        };
        assert!(matches!(
            from_config(&config).current_position(TIMEOUT, false),
            Err(TaqwaError::GeolocationUnavailable)
        ));
    }

    #[test]
    fn test_ip_lookup_response_parsing() {
        let ok: IpLookupResponse =
            serde_json::from_str(r#"{"status":"success","lat":21.42,"lon":39.82}"#).unwrap();
        assert_eq!(ok.lat, Some(21.42));

        let failed: IpLookupResponse =
            serde_json::from_str(r#"{"status":"fail","message":"reserved range"}"#).unwrap();
        assert_eq!(failed.lat, None);
        assert_eq!(failed.message.as_deref(), Some("reserved range"));
    }
}
