//! Pure derivations from a day's timings and the wall clock: which prayer is
//! next, how long until it, and the per-prayer display rows.

use chrono::{Duration, NaiveTime, Timelike};
use serde::Serialize;

use crate::timings::{Prayer, PrayerTime, RawPrayerTimings};

const ZERO_COUNTDOWN: &str = "00:00:00";

/// The upcoming prayer. `tomorrow` is set when every prayer today has
/// passed and the answer rolled over to the next day's Fajr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextPrayer {
    pub prayer: Prayer,
    #[serde(serialize_with = "serialize_time")]
    pub time: PrayerTime,
    pub tomorrow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrayerDisplayEntry {
    pub prayer: Prayer,
    pub name: &'static str,
    pub arabic_name: &'static str,
    pub time: String,
    pub time_12h: String,
    pub is_next: bool,
    pub icon: &'static str,
}

fn serialize_time<S: serde::Serializer>(time: &PrayerTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(time)
}

pub fn minutes_since_midnight(now: NaiveTime) -> u32 {
    now.hour() * 60 + now.minute()
}

/// First prayer in canonical order strictly after `now_minutes`, or
/// tomorrow's Fajr once Isha has passed.
pub fn next_prayer(timings: Option<&RawPrayerTimings>, now_minutes: u32) -> Option<NextPrayer> {
    let timings = timings?;

    let upcoming = timings
        .iter()
        .find(|(_, time)| time.minutes_since_midnight() > now_minutes)
        .map(|(prayer, time)| NextPrayer {
            prayer,
            time,
            tomorrow: false,
        });

    Some(upcoming.unwrap_or(NextPrayer {
        prayer: Prayer::Fajr,
        time: timings.get(Prayer::Fajr),
        tomorrow: true,
    }))
}

/// Time until the next occurrence of `target`. A target at or before `now`
/// counts as tomorrow's, so the result is always positive.
pub fn duration_until(target: PrayerTime, now: NaiveTime) -> Duration {
    let target = NaiveTime::from_hms_opt(target.hour() as u32, target.minute() as u32, 0)
        .unwrap_or(NaiveTime::MIN);
    let diff = target.signed_duration_since(now);
    if diff <= Duration::zero() {
        diff + Duration::days(1)
    } else {
        diff
    }
}

/// Countdown as "HH:MM:SS"; "00:00:00" without a target
pub fn time_until(target: Option<PrayerTime>, now: NaiveTime) -> String {
    match target {
        Some(target) => format_countdown(duration_until(target, now)),
        None => ZERO_COUNTDOWN.to_string(),
    }
}

pub fn format_countdown(remaining: Duration) -> String {
    let total_secs = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// All five prayers in canonical order with exactly one marked as next
pub fn display_list(timings: Option<&RawPrayerTimings>, now_minutes: u32) -> Vec<PrayerDisplayEntry> {
    let Some(timings) = timings else {
        return Vec::new();
    };
    let next = next_prayer(Some(timings), now_minutes).map(|n| n.prayer);

    timings
        .iter()
        .map(|(prayer, time)| PrayerDisplayEntry {
            prayer,
            name: prayer.name(),
            arabic_name: prayer.arabic_name(),
            time: time.to_string(),
            time_12h: format_time_12h(time),
            is_next: next == Some(prayer),
            icon: prayer.icon(),
        })
        .collect()
}

/// "13:05" → "1:05PM"
pub fn format_time_12h(time: PrayerTime) -> String {
    let hour = time.hour();
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02}{}", hour12, time.minute(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> RawPrayerTimings {
        RawPrayerTimings::from_times("01 Mar 2026", ["05:00", "12:30", "15:45", "18:20", "19:45"])
            .unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn time(s: &str) -> PrayerTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_next_prayer_afternoon() {
        let next = next_prayer(Some(&timings()), 16 * 60).unwrap();
        assert_eq!(next.prayer, Prayer::Maghrib);
        assert_eq!(next.time.to_string(), "18:20");
        assert!(!next.tomorrow);
    }

    #[test]
    fn test_next_prayer_is_strictly_after_now() {
        // At exactly Dhuhr, Dhuhr is no longer next
        let next = next_prayer(Some(&timings()), 12 * 60 + 30).unwrap();
        assert_eq!(next.prayer, Prayer::Asr);

        let next = next_prayer(Some(&timings()), 0).unwrap();
        assert_eq!(next.prayer, Prayer::Fajr);
        assert!(!next.tomorrow);
    }

    #[test]
    fn test_next_prayer_rolls_to_tomorrow_fajr() {
        let next = next_prayer(Some(&timings()), 19 * 60 + 45).unwrap();
        assert_eq!(next.prayer, Prayer::Fajr);
        assert_eq!(next.time.to_string(), "05:00");
        assert!(next.tomorrow);
    }

    #[test]
    fn test_next_prayer_never_in_the_past() {
        let t = timings();
        for now in (0..24 * 60).step_by(7) {
            let next = next_prayer(Some(&t), now).unwrap();
            if next.tomorrow {
                assert_eq!(next.prayer, Prayer::Fajr);
                assert!(t.iter().all(|(_, time)| time.minutes_since_midnight() <= now));
            } else {
                assert!(next.time.minutes_since_midnight() > now);
            }
        }
    }

    #[test]
    fn test_time_until_same_day() {
        assert_eq!(time_until(Some(time("18:20")), at(16, 0, 0)), "02:20:00");
        assert_eq!(time_until(Some(time("18:20")), at(18, 19, 59)), "00:00:01");
    }

    #[test]
    fn test_time_until_wraps_to_tomorrow() {
        assert_eq!(time_until(Some(time("05:00")), at(20, 0, 0)), "09:00:00");
        // Exact match counts as passed
        assert_eq!(time_until(Some(time("05:30")), at(5, 30, 0)), "24:00:00");
        assert_eq!(time_until(Some(time("05:30")), at(5, 30, 1)), "23:59:59");
    }

    #[test]
    fn test_time_until_format_is_always_padded() {
        for (h, m, s) in [(0, 0, 0), (4, 59, 59), (12, 0, 1), (23, 59, 59)] {
            let out = time_until(Some(time("05:00")), at(h, m, s));
            assert_eq!(out.len(), 8, "{}", out);
            let parts: Vec<u32> = out.split(':').map(|p| p.parse().unwrap()).collect();
            assert!(parts[0] <= 24 && parts[1] < 60 && parts[2] < 60);
        }
    }

    #[test]
    fn test_missing_timings_are_safe() {
        assert_eq!(time_until(None, at(10, 0, 0)), "00:00:00");
        assert!(display_list(None, 600).is_empty());
        assert_eq!(next_prayer(None, 600), None);
    }

    #[test]
    fn test_display_list_marks_one_next_in_fixed_order() {
        let list = display_list(Some(&timings()), 16 * 60);
        let names: Vec<&str> = list.iter().map(|e| e.name).collect();
        assert_eq!(names, ["Fajr", "Dhuhr", "Asr", "Maghrib", "Isha"]);
        assert_eq!(list.iter().filter(|e| e.is_next).count(), 1);
        assert!(list[3].is_next);
        assert_eq!(list[3].time_12h, "6:20PM");
        assert_eq!(list[3].arabic_name, "المغرب");
    }

    #[test]
    fn test_format_time_12h() {
        assert_eq!(format_time_12h(time("00:15")), "12:15AM");
        assert_eq!(format_time_12h(time("05:07")), "5:07AM");
        assert_eq!(format_time_12h(time("12:30")), "12:30PM");
        assert_eq!(format_time_12h(time("13:05")), "1:05PM");
    }

    #[test]
    fn test_next_prayer_json() {
        let next = next_prayer(Some(&timings()), 16 * 60).unwrap();
        let json = serde_json::to_value(next).unwrap();
        assert_eq!(json["prayer"], "Maghrib");
        assert_eq!(json["time"], "18:20");
        assert_eq!(json["tomorrow"], false);
    }
}
