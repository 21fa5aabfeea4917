// src/views.rs
use chrono::{Datelike, Duration, NaiveDate};

use crate::pay_period::{day_total, is_weekend, period_total, DayLog, DayState, PayPeriod, UserRecord};
use crate::report::format_hours;

/// Figures shown next to the punch buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct TodaySummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// One entry per cycle, e.g. `Cycle 1: 8:00 AM - ---`.
    pub daily_punches: Vec<String>,
    pub last_punch: Option<String>,
    pub today_hours: f64,
    pub period_hours: f64,
    pub can_punch_in: bool,
    pub can_punch_out: bool,
}

impl TodaySummary {
    pub fn daily_punches_line(&self) -> String {
        if self.daily_punches.is_empty() {
            "Daily Punches: None".to_string()
        } else {
            format!("Daily Punches: {}", self.daily_punches.join("  |  "))
        }
    }
}

pub fn today_summary(period: &PayPeriod, today: NaiveDate) -> TodaySummary {
    let (can_punch_in, can_punch_out) = if is_weekend(today) {
        (false, false)
    } else {
        match period.day_state(today) {
            DayState::Idle => (true, false),
            DayState::Open => (false, true),
            DayState::Full | DayState::Finalized => (false, false),
        }
    };

    let daily_punches = match period.day(today) {
        Some(DayLog::Cycles(cycles)) => cycles
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                format!(
                    "Cycle {}: {} - {}",
                    idx + 1,
                    c.punch_in,
                    c.punch_out.map_or_else(|| "---".to_string(), |t| t.label())
                )
            })
            .collect(),
        Some(DayLog::FinalDay(f)) => vec![format!(
            "Final: {} - {}, {} - {}",
            f.punch_in_1,
            f.punch_out_1,
            f.punch_in_2.map(|t| t.label()).unwrap_or_default(),
            f.punch_out_2.map(|t| t.label()).unwrap_or_default()
        )],
        None => Vec::new(),
    };

    TodaySummary {
        period_start: period.start_date,
        period_end: period.end_date,
        daily_punches,
        last_punch: period.last_punch().map(|t| t.label()),
        today_hours: day_total(period, today),
        period_hours: period_total(period),
        can_punch_in,
        can_punch_out,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub lines: Vec<String>,
}

/// Monday through Sunday of the week holding `today`.
pub fn week_view(period: &PayPeriod, today: NaiveDate) -> Vec<WeekDay> {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (0..7)
        .map(|offset| {
            let date = monday + Duration::days(offset);
            let lines = match period.day(date) {
                Some(day) if !day.is_empty() => record_lines(day),
                _ => vec!["No punches recorded.".to_string()],
            };
            WeekDay { date, lines }
        })
        .collect()
}

fn record_lines(day: &DayLog) -> Vec<String> {
    match day {
        DayLog::Cycles(cycles) => cycles
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                format!(
                    "Cycle {}: In: {} | Out: {} | Hours: {}",
                    idx + 1,
                    c.punch_in,
                    c.punch_out.map_or_else(|| "N/A".to_string(), |t| t.label()),
                    format_hours(c.hours())
                )
            })
            .collect(),
        DayLog::FinalDay(f) => vec![format!(
            "Record (Finalized): In 1: {} | Out 1: {} | In 2: {} | Out 2: {} | Hours: {}",
            f.punch_in_1,
            f.punch_out_1,
            f.punch_in_2.map(|t| t.label()).unwrap_or_default(),
            f.punch_out_2.map(|t| t.label()).unwrap_or_default(),
            format_hours(f.duration)
        )],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_hours: f64,
}

/// Finalized periods, latest end date first.
pub fn history(user: &UserRecord) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = user
        .pay_periods
        .iter()
        .filter(|p| p.finalized)
        .map(|p| HistoryEntry {
            start_date: p.start_date,
            end_date: p.end_date,
            total_hours: period_total(p),
        })
        .collect();
    entries.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    entries
}
