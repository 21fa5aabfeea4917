// src/pay_period.rs
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::time_format::ClockTime;

// --- Constants ---

pub const MAX_CYCLES_PER_DAY: usize = 2;
/// Days from a period's Monday start to its second Friday.
pub const PERIOD_SPAN_DAYS: i64 = 11;
/// Friday end to the following Monday start.
pub const ROLLOVER_DAYS: i64 = 3;

/// Monday the very first pay period starts on when nothing else is configured.
pub fn default_first_period_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 17).unwrap_or_default()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// --- Punch Records ---

/// One punch-in/punch-out pair. Open while `punch_out` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchCycle {
    pub punch_in: ClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punch_out: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl PunchCycle {
    pub fn open(punch_in: ClockTime) -> Self {
        Self {
            punch_in,
            punch_out: None,
            duration: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.punch_out.is_none()
    }

    pub fn hours(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }
}

/// The consolidated record written for a period's end date when it is
/// finalized. The second pair is optional; it is stored as empty strings
/// when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDayCycle {
    pub punch_in_1: ClockTime,
    pub punch_out_1: ClockTime,
    #[serde(default, with = "blank_clock")]
    pub punch_in_2: Option<ClockTime>,
    #[serde(default, with = "blank_clock")]
    pub punch_out_2: Option<ClockTime>,
    pub duration: f64,
}

/// Either record shape, as it appears in a day's list on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PunchRecord {
    FinalDay(FinalDayCycle),
    Ordinary(PunchCycle),
}

mod blank_clock {
    use crate::time_format::ClockTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<ClockTime>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_str(&t.label()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ClockTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(label) => ClockTime::parse(label)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid clock time '{}'", label))),
        }
    }
}

// --- Day Log ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    /// No open cycle and room for another.
    Idle,
    /// Last cycle punched in but not out.
    Open,
    /// Both cycles of the day are complete.
    Full,
    /// Holds the final-day record.
    Finalized,
}

/// A single day's punches: up to two ordinary cycles, or exactly one
/// final-day record. Lists breaking that rule are rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PunchRecord>", into = "Vec<PunchRecord>")]
pub enum DayLog {
    Cycles(Vec<PunchCycle>),
    FinalDay(FinalDayCycle),
}

impl Default for DayLog {
    fn default() -> Self {
        DayLog::Cycles(Vec::new())
    }
}

impl TryFrom<Vec<PunchRecord>> for DayLog {
    type Error = String;

    fn try_from(records: Vec<PunchRecord>) -> Result<Self, Self::Error> {
        let mut cycles = Vec::with_capacity(records.len());
        let mut final_day = None;
        for record in records {
            match record {
                PunchRecord::Ordinary(c) => cycles.push(c),
                PunchRecord::FinalDay(f) => {
                    if final_day.replace(f).is_some() {
                        return Err("a day holds at most one final-day record".to_string());
                    }
                }
            }
        }
        match final_day {
            Some(_) if !cycles.is_empty() => {
                Err("a day cannot mix ordinary cycles with a final-day record".to_string())
            }
            Some(f) => Ok(DayLog::FinalDay(f)),
            None if cycles.len() > MAX_CYCLES_PER_DAY => Err(format!(
                "a day holds at most {} punch cycles, found {}",
                MAX_CYCLES_PER_DAY,
                cycles.len()
            )),
            None => Ok(DayLog::Cycles(cycles)),
        }
    }
}

impl From<DayLog> for Vec<PunchRecord> {
    fn from(day: DayLog) -> Self {
        match day {
            DayLog::Cycles(cycles) => cycles.into_iter().map(PunchRecord::Ordinary).collect(),
            DayLog::FinalDay(f) => vec![PunchRecord::FinalDay(f)],
        }
    }
}

impl DayLog {
    pub fn state(&self) -> DayState {
        match self {
            DayLog::FinalDay(_) => DayState::Finalized,
            DayLog::Cycles(cycles) => match cycles.last() {
                Some(last) if last.is_open() => DayState::Open,
                _ if cycles.len() >= MAX_CYCLES_PER_DAY => DayState::Full,
                _ => DayState::Idle,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DayLog::Cycles(c) if c.is_empty())
    }

    /// Sum of recorded durations; open cycles count as zero.
    pub fn total(&self) -> f64 {
        match self {
            DayLog::Cycles(cycles) => cycles.iter().map(PunchCycle::hours).sum(),
            DayLog::FinalDay(f) => f.duration,
        }
    }

    /// Starts a new open cycle. The caller checks `state()` first; this
    /// refuses anything but `Idle`.
    pub(crate) fn push_open(&mut self, punch_in: ClockTime) -> bool {
        if self.state() != DayState::Idle {
            return false;
        }
        match self {
            DayLog::Cycles(cycles) => {
                cycles.push(PunchCycle::open(punch_in));
                true
            }
            DayLog::FinalDay(_) => false,
        }
    }

    pub(crate) fn open_cycle_mut(&mut self) -> Option<&mut PunchCycle> {
        match self {
            DayLog::Cycles(cycles) => cycles.last_mut().filter(|c| c.is_open()),
            DayLog::FinalDay(_) => None,
        }
    }

    /// Latest punch of an ordinary cycle on this day. The final-day record
    /// is entered after the fact and does not count as a punch.
    pub fn last_punch(&self) -> Option<ClockTime> {
        match self {
            DayLog::Cycles(cycles) => cycles.last().map(|c| c.punch_out.unwrap_or(c.punch_in)),
            DayLog::FinalDay(_) => None,
        }
    }
}

// --- Pay Period ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub records: BTreeMap<NaiveDate, DayLog>,
    #[serde(default)]
    pub custom_hours: Option<f64>,
    #[serde(default)]
    pub finalized: bool,
}

impl PayPeriod {
    pub fn starting(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: start_date + Duration::days(PERIOD_SPAN_DAYS),
            records: BTreeMap::new(),
            custom_hours: None,
            finalized: false,
        }
    }

    /// The period that follows this one: Friday end rolls over to Monday.
    pub fn next(&self) -> Self {
        Self::starting(self.end_date + Duration::days(ROLLOVER_DAYS))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Every calendar date of the period, start and end inclusive.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |d| *d <= end)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayLog> {
        self.records.get(&date)
    }

    pub fn day_state(&self, date: NaiveDate) -> DayState {
        self.day(date).map_or(DayState::Idle, DayLog::state)
    }

    pub fn last_punch(&self) -> Option<ClockTime> {
        self.records.values().filter_map(DayLog::last_punch).last()
    }
}

/// `custom_hours` when set, otherwise every recorded duration summed.
pub fn period_total(period: &PayPeriod) -> f64 {
    match period.custom_hours {
        Some(hours) => hours,
        None => period.records.values().map(DayLog::total).sum(),
    }
}

pub fn day_total(period: &PayPeriod, date: NaiveDate) -> f64 {
    period.day(date).map_or(0.0, DayLog::total)
}

// --- Users & Document ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub pay_periods: Vec<PayPeriod>,
}

impl UserRecord {
    /// The trailing period, if it is still open.
    pub fn current_period(&self) -> Option<&PayPeriod> {
        self.pay_periods.last().filter(|p| !p.finalized)
    }

    pub fn current_period_mut(&mut self) -> Option<&mut PayPeriod> {
        self.pay_periods.last_mut().filter(|p| !p.finalized)
    }

    /// Appends a fresh period when none is open. Returns whether one was
    /// created.
    pub fn open_or_create_period(&mut self, first_start: NaiveDate) -> bool {
        let next = match self.pay_periods.last() {
            Some(p) if !p.finalized => None,
            Some(p) => Some(p.next()),
            None => Some(PayPeriod::starting(first_start)),
        };
        match next {
            Some(period) => {
                self.pay_periods.push(period);
                true
            }
            None => false,
        }
    }

    pub fn period_ending(&self, end_date: NaiveDate) -> Option<&PayPeriod> {
        self.pay_periods.iter().find(|p| p.end_date == end_date)
    }

    pub fn period_ending_mut(&mut self, end_date: NaiveDate) -> Option<&mut PayPeriod> {
        self.pay_periods.iter_mut().find(|p| p.end_date == end_date)
    }
}

/// The whole persisted state: `{ "users": { <name>: { "pay_periods": [...] } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeDocument {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
}

impl TimeDocument {
    pub fn user(&self, name: &str) -> Option<&UserRecord> {
        self.users.get(name)
    }

    pub fn user_mut(&mut self, name: &str) -> Option<&mut UserRecord> {
        self.users.get_mut(name)
    }

    pub fn user_names(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }
}
