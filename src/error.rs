use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaqwaError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Timed out waiting for a position fix")]
    GpsTimeout,

    #[error("Geolocation is not supported")]
    GeolocationUnavailable,

    #[error("Location service timeout")]
    GeocodingTimeout,

    #[error("Failed to get location name: {0}")]
    GeocodingFailed(String),

    #[error("Failed to fetch prayer times: {0}")]
    TimingFetchFailed(String),

    #[error("Notifications not supported: {0}")]
    NotificationUnsupported(String),

    #[error("Notification permission not granted")]
    NotificationPermissionDenied,

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TaqwaError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            TaqwaError::HttpError(_) | TaqwaError::TimingFetchFailed(_) => Some(
                "Check your internet connection, or set a location manually:\n  taqwa location set --city Makkah --country \"Saudi Arabia\""
            ),
            TaqwaError::PermissionDenied => Some(
                "Allow location access in the config file:\n  [geolocation]\n  allow = true"
            ),
            TaqwaError::GpsTimeout | TaqwaError::GeolocationUnavailable => Some(
                "Set your coordinates in the config file, or use:\n  taqwa location set --lat <lat> --lon <lon>"
            ),
            TaqwaError::NotificationUnsupported(_) => Some(
                "Pick another notification target in the config file:\n  [notify]\n  type = \"ntfy\"\n  topic = \"my-prayers\""
            ),
            TaqwaError::NotificationPermissionDenied => Some(
                "Grant notification permission with `taqwa notify permission`"
            ),
            TaqwaError::DatabaseError(_) | TaqwaError::MigrationError(_) => Some(
                "Check the database path with `taqwa config path`"
            ),
            TaqwaError::TomlError(_) | TaqwaError::ConfigError(_) => Some(
                "Review your configuration with `taqwa config show`"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaqwaError>;
