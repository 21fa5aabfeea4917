// src/time_format.rs
use chrono::{Duration, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// --- Constants ---

pub const OPTIONS_START_HOUR: u32 = 6; // 6:00 AM
pub const OPTIONS_END_HOUR: u32 = 17; // 5:00 PM
pub const OPTIONS_STEP_MINUTES: i64 = 15;

static CLOCK_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(1[0-2]|[1-9]):([0-5][0-9]) (AM|PM)$").expect("clock label pattern is valid")
});

/// Every selectable label, computed once.
pub static TIME_OPTIONS: Lazy<Vec<String>> = Lazy::new(|| generate_time_options().collect());

/// Labels from 6:00 AM to 5:00 PM inclusive in 15 minute steps.
/// Each call starts a fresh sequence.
pub fn generate_time_options() -> impl Iterator<Item = String> {
    let start = NaiveTime::from_hms_opt(OPTIONS_START_HOUR, 0, 0);
    let end = NaiveTime::from_hms_opt(OPTIONS_END_HOUR, 0, 0);
    std::iter::successors(start, |t| {
        let (next, wrapped) = t.overflowing_add_signed(Duration::minutes(OPTIONS_STEP_MINUTES));
        (wrapped == 0).then_some(next)
    })
    .take_while(move |t| Some(*t) <= end)
    .map(format_time)
}

/// Parses `h:MM AM` / `h:MM PM`. Anything else, including a leading zero on
/// the hour, yields `None`.
pub fn parse_time(label: &str) -> Option<NaiveTime> {
    let caps = CLOCK_LABEL.captures(label)?;
    let hour12: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let hour = match (&caps[3], hour12) {
        ("AM", 12) => 0,
        ("AM", h) => h,
        ("PM", 12) => 12,
        (_, h) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Formats a wall-clock time the way labels are stored, e.g. `9:05 AM`.
/// Seconds are dropped.
pub fn format_time(time: NaiveTime) -> String {
    let (pm, hour12) = time.hour12();
    format!(
        "{}:{:02} {}",
        hour12,
        time.minute(),
        if pm { "PM" } else { "AM" }
    )
}

/// Options strictly later than `label`. An empty or unparseable label leaves
/// the full list.
pub fn options_after(label: &str) -> Vec<String> {
    match parse_time(label.trim()) {
        Some(base) => TIME_OPTIONS
            .iter()
            .filter(|opt| parse_time(opt).map_or(false, |t| t > base))
            .cloned()
            .collect(),
        None => TIME_OPTIONS.clone(),
    }
}

/// Hours between two clock times on the same day. Negative when `to` is
/// earlier than `from`.
pub fn hours_between(from: NaiveTime, to: NaiveTime) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

/// A minute-precision wall-clock time, persisted as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(time: NaiveTime) -> Self {
        // Labels carry no seconds; keep the in-memory value identical to what
        // a reload would produce.
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }

    pub fn parse(label: &str) -> Option<Self> {
        parse_time(label).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn label(&self) -> String {
        format_time(self.0)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        ClockTime::parse(&label)
            .ok_or_else(|| de::Error::custom(format!("invalid clock time '{}'", label)))
    }
}
