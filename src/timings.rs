//! The five daily prayers and their timings from the remote timing service

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaqwaError};
use crate::location::Location;

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Leading "HH:MM" of a timing string; the service may append " (EET)"
static TIME_RE: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^\s*(\d{1,2}):(\d{2})").expect("Invalid time regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// Canonical daily order
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    pub fn arabic_name(self) -> &'static str {
        match self {
            Prayer::Fajr => "الفجر",
            Prayer::Dhuhr => "الظهر",
            Prayer::Asr => "العصر",
            Prayer::Maghrib => "المغرب",
            Prayer::Isha => "العشاء",
        }
    }

    /// Icon name, following the lucide icon set
    pub fn icon(self) -> &'static str {
        match self {
            Prayer::Fajr => "sunrise",
            Prayer::Dhuhr => "sun",
            Prayer::Asr => "cloud-sun",
            Prayer::Maghrib => "sunset",
            Prayer::Isha => "moon",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Prayer {
    type Err = TaqwaError;

    fn from_str(s: &str) -> Result<Self> {
        Prayer::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                TaqwaError::ConfigError(format!(
                    "Unknown prayer '{}'. Use one of: Fajr, Dhuhr, Asr, Maghrib, Isha",
                    s
                ))
            })
    }
}

/// A 24-hour time of day with minute precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrayerTime {
    hour: u8,
    minute: u8,
}

impl PrayerTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(TaqwaError::InvalidTime(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    /// Inverse of `minutes_since_midnight`, wrapping into a single day
    pub fn from_minutes(minutes: i64) -> Self {
        let minutes = minutes.rem_euclid(24 * 60);
        Self {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        }
    }
}

impl FromStr for PrayerTime {
    type Err = TaqwaError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = TIME_RE
            .captures(s)
            .ok_or_else(|| TaqwaError::InvalidTime(s.to_string()))?;
        let hour = caps[1]
            .parse::<u8>()
            .map_err(|_| TaqwaError::InvalidTime(s.to_string()))?;
        let minute = caps[2]
            .parse::<u8>()
            .map_err(|_| TaqwaError::InvalidTime(s.to_string()))?;
        Self::new(hour, minute).map_err(|_| TaqwaError::InvalidTime(s.to_string()))
    }
}

impl fmt::Display for PrayerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One day's five prayer times
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrayerTimings {
    /// Date stamp as reported by the service (e.g. "01 Mar 2026")
    pub date: String,
    times: [PrayerTime; 5],
}

impl RawPrayerTimings {
    /// Build from a name → "HH:MM" map; all five prayers must be present.
    /// Extra entries (Sunrise, Midnight, ...) are ignored.
    pub fn from_map(date: impl Into<String>, timings: &HashMap<String, String>) -> Result<Self> {
        let mut times = [PrayerTime { hour: 0, minute: 0 }; 5];
        for prayer in Prayer::ALL {
            let raw = timings.get(prayer.name()).ok_or_else(|| {
                TaqwaError::TimingFetchFailed(format!("missing {} in timings", prayer))
            })?;
            times[prayer.index()] = raw.parse().map_err(|_| {
                TaqwaError::TimingFetchFailed(format!("invalid {} time '{}'", prayer, raw))
            })?;
        }
        Ok(Self {
            date: date.into(),
            times,
        })
    }

    /// Convenience for fixed timings, in canonical order
    pub fn from_times(date: impl Into<String>, times: [&str; 5]) -> Result<Self> {
        let map = Prayer::ALL
            .into_iter()
            .zip(times)
            .map(|(prayer, time)| (prayer.name().to_string(), time.to_string()))
            .collect();
        Self::from_map(date, &map)
    }

    pub fn get(&self, prayer: Prayer) -> PrayerTime {
        self.times[prayer.index()]
    }

    /// Prayers with their times in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, PrayerTime)> + '_ {
        Prayer::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// Remote prayer-timing service
pub trait TimingService {
    fn timings_by_coordinates(&self, latitude: f64, longitude: f64, method: u8) -> Result<RawPrayerTimings>;
    fn timings_by_city(&self, city: &str, country: &str, method: u8) -> Result<RawPrayerTimings>;
}

/// api.aladhan.com v1
pub struct AladhanClient {
    agent: ureq::Agent,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: u16,
    #[serde(default)]
    status: Option<String>,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AladhanData {
    timings: HashMap<String, String>,
    #[serde(default)]
    date: Option<AladhanDate>,
}

#[derive(Debug, Deserialize)]
struct AladhanDate {
    readable: String,
}

impl AladhanClient {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<RawPrayerTimings> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(%url, ?params, "fetching prayer times");

        let mut request = self.agent.get(&url);
        for (key, value) in params {
            request = request.query(*key, value);
        }

        let response = request
            .call()
            .map_err(|e| TaqwaError::TimingFetchFailed(e.to_string()))?;
        let body: AladhanResponse = response
            .into_body()
            .read_json()
            .map_err(|e| TaqwaError::TimingFetchFailed(e.to_string()))?;

        parse_response(body)
    }
}

fn parse_response(body: AladhanResponse) -> Result<RawPrayerTimings> {
    if body.code != 200 {
        let detail = body
            .data
            .as_str()
            .map(String::from)
            .or(body.status)
            .unwrap_or_else(|| format!("code {}", body.code));
        return Err(TaqwaError::TimingFetchFailed(detail));
    }

    let data: AladhanData = serde_json::from_value(body.data)
        .map_err(|e| TaqwaError::TimingFetchFailed(format!("unexpected response: {}", e)))?;
    let date = data.date.map(|d| d.readable).unwrap_or_default();
    RawPrayerTimings::from_map(date, &data.timings)
}

impl TimingService for AladhanClient {
    fn timings_by_coordinates(&self, latitude: f64, longitude: f64, method: u8) -> Result<RawPrayerTimings> {
        self.get(
            "timings",
            &[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("method", method.to_string()),
            ],
        )
    }

    fn timings_by_city(&self, city: &str, country: &str, method: u8) -> Result<RawPrayerTimings> {
        self.get(
            "timingsByCity",
            &[
                ("city", city.to_string()),
                ("country", country.to_string()),
                ("method", method.to_string()),
            ],
        )
    }
}

/// Fetches a day's timings for a location. Nothing is cached; every call
/// goes to the service.
pub struct PrayerTimeProvider {
    service: Box<dyn TimingService>,
    method: u8,
    last_location: Option<Location>,
}

impl PrayerTimeProvider {
    pub fn new(service: Box<dyn TimingService>, method: u8) -> Self {
        Self {
            service,
            method,
            last_location: None,
        }
    }

    /// Coordinates win over city/country. A location with neither yields
    /// `Ok(None)` without touching the network.
    pub fn fetch_timings(&mut self, location: &Location) -> Result<Option<RawPrayerTimings>> {
        self.last_location = Some(location.clone());

        let timings = if let Some((latitude, longitude)) = location.coordinates() {
            self.service.timings_by_coordinates(latitude, longitude, self.method)?
        } else if let Some((city, country)) = location.city_country() {
            self.service.timings_by_city(city, country, self.method)?
        } else {
            tracing::debug!("location has neither coordinates nor city; skipping fetch");
            return Ok(None);
        };

        tracing::info!(date = %timings.date, location = %location.label(), "fetched prayer times");
        Ok(Some(timings))
    }

    /// Repeat the last fetch
    pub fn refetch(&mut self) -> Result<Option<RawPrayerTimings>> {
        match self.last_location.clone() {
            Some(location) => self.fetch_timings(&location),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingService {
        calls: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl RecordingService {
        fn respond(&self, call: String) -> Result<RawPrayerTimings> {
            self.calls.borrow_mut().push(call);
            if self.fail {
                return Err(TaqwaError::TimingFetchFailed("503".into()));
            }
            RawPrayerTimings::from_times("01 Mar 2026", ["05:00", "12:30", "15:45", "18:20", "19:45"])
        }
    }

    impl TimingService for RecordingService {
        fn timings_by_coordinates(&self, latitude: f64, longitude: f64, method: u8) -> Result<RawPrayerTimings> {
            self.respond(format!("coords {} {} {}", latitude, longitude, method))
        }

        fn timings_by_city(&self, city: &str, country: &str, method: u8) -> Result<RawPrayerTimings> {
            self.respond(format!("city {} {} {}", city, country, method))
        }
    }

    #[test]
    fn test_prayer_names() {
        assert_eq!(Prayer::Maghrib.to_string(), "Maghrib");
        assert_eq!(Prayer::Fajr.arabic_name(), "الفجر");
        assert_eq!(Prayer::Asr.icon(), "cloud-sun");
        assert_eq!("isha".parse::<Prayer>().unwrap(), Prayer::Isha);
        assert!("sunrise".parse::<Prayer>().is_err());
    }

    #[test]
    fn test_prayer_time_parsing() {
        let t: PrayerTime = "05:07".parse().unwrap();
        assert_eq!(t.minutes_since_midnight(), 307);
        assert_eq!(t.to_string(), "05:07");

        let with_zone: PrayerTime = "18:20 (EET)".parse().unwrap();
        assert_eq!(with_zone, PrayerTime::new(18, 20).unwrap());

        assert!("24:00".parse::<PrayerTime>().is_err());
        assert!("12:60".parse::<PrayerTime>().is_err());
        assert!("noon".parse::<PrayerTime>().is_err());
    }

    #[test]
    fn test_from_minutes_wraps() {
        assert_eq!(PrayerTime::from_minutes(-5).to_string(), "23:55");
        assert_eq!(PrayerTime::from_minutes(1440 + 61).to_string(), "01:01");
    }

    #[test]
    fn test_timings_require_all_five() {
        let mut map: HashMap<String, String> = HashMap::new();
        map.insert("Fajr".into(), "05:00".into());
        map.insert("Sunrise".into(), "06:10".into());
        assert!(matches!(
            RawPrayerTimings::from_map("today", &map),
            Err(TaqwaError::TimingFetchFailed(_))
        ));
    }

    #[test]
    fn test_parse_aladhan_response() {
        let body: AladhanResponse = serde_json::from_str(
            r#"{
                "code": 200,
                "status": "OK",
                "data": {
                    "timings": {
                        "Fajr": "04:50", "Sunrise": "06:07", "Dhuhr": "12:21",
                        "Asr": "15:43", "Sunset": "18:35", "Maghrib": "18:35",
                        "Isha": "20:05", "Imsak": "04:40", "Midnight": "00:21"
                    },
                    "date": { "readable": "01 Mar 2026", "timestamp": "1772352000" }
                }
            }"#,
        )
        .unwrap();

        let timings = parse_response(body).unwrap();
        assert_eq!(timings.date, "01 Mar 2026");
        assert_eq!(timings.get(Prayer::Isha).to_string(), "20:05");
        let order: Vec<Prayer> = timings.iter().map(|(p, _)| p).collect();
        assert_eq!(order, Prayer::ALL.to_vec());
    }

    #[test]
    fn test_parse_aladhan_error() {
        let body: AladhanResponse = serde_json::from_str(
            r#"{"code": 400, "status": "BAD_REQUEST", "data": "Please specify a city"}"#,
        )
        .unwrap();
        match parse_response(body) {
            Err(TaqwaError::TimingFetchFailed(msg)) => assert_eq!(msg, "Please specify a city"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_time_is_a_fetch_failure() {
        let body: AladhanResponse = serde_json::from_str(
            r#"{
                "code": 200,
                "status": "OK",
                "data": {
                    "timings": {
                        "Fajr": "04:50", "Dhuhr": "12:21", "Asr": "25:xx",
                        "Maghrib": "18:35", "Isha": "20:05"
                    }
                }
            }"#,
        )
        .unwrap();
        match parse_response(body) {
            Err(TaqwaError::TimingFetchFailed(msg)) => assert!(msg.contains("Asr"), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }

        assert!(matches!(
            RawPrayerTimings::from_times("today", ["05:00", "noon", "15:45", "18:20", "19:45"]),
            Err(TaqwaError::TimingFetchFailed(_))
        ));
    }

    #[test]
    fn test_provider_prefers_coordinates() {
        let service = RecordingService::default();
        let calls = service.calls.clone();
        let mut provider = PrayerTimeProvider::new(Box::new(service), 3);

        let mut location = Location::from_city("Makkah", "Saudi Arabia");
        location.latitude = Some(21.42);
        location.longitude = Some(39.82);
        assert!(provider.fetch_timings(&location).unwrap().is_some());

        provider
            .fetch_timings(&Location::from_city("Cairo", "Egypt"))
            .unwrap();

        assert_eq!(
            *calls.borrow(),
            vec!["coords 21.42 39.82 3".to_string(), "city Cairo Egypt 3".to_string()]
        );
    }

    #[test]
    fn test_provider_skips_unusable_location() {
        let service = RecordingService::default();
        let calls = service.calls.clone();
        let mut provider = PrayerTimeProvider::new(Box::new(service), 3);

        assert_eq!(provider.fetch_timings(&Location::default()).unwrap(), None);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_provider_surfaces_failures_and_refetches() {
        let service = RecordingService {
            fail: true,
            ..RecordingService::default()
        };
        let calls = service.calls.clone();
        let mut provider = PrayerTimeProvider::new(Box::new(service), 2);

        assert_eq!(provider.refetch().unwrap(), None);
        let location = Location::from_city("Cairo", "Egypt");
        assert!(matches!(
            provider.fetch_timings(&location),
            Err(TaqwaError::TimingFetchFailed(_))
        ));
        assert!(provider.refetch().is_err());
        assert_eq!(calls.borrow().len(), 2);
    }
}
