// src/punch.rs
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::AppError;
use crate::pay_period::{
    is_weekend, DayLog, DayState, FinalDayCycle, PayPeriod, PunchCycle, TimeDocument, UserRecord,
};
use crate::report::{build_report, PayPeriodReport};
use crate::store::DataStore;
use crate::time_format::{hours_between, ClockTime};

// --- Final Day Entry ---

/// The four picker values of the finalize form. Empty strings mean "not
/// selected".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalDayEntry {
    pub punch_in_1: String,
    pub punch_out_1: String,
    pub punch_in_2: String,
    pub punch_out_2: String,
}

impl FinalDayEntry {
    pub fn new(in1: &str, out1: &str, in2: Option<&str>, out2: Option<&str>) -> Self {
        Self {
            punch_in_1: in1.to_string(),
            punch_out_1: out1.to_string(),
            punch_in_2: in2.unwrap_or_default().to_string(),
            punch_out_2: out2.unwrap_or_default().to_string(),
        }
    }

    /// Checks the form and computes the final-day record. Pure: nothing is
    /// touched when this fails.
    pub fn validate(&self) -> Result<FinalDayCycle, AppError> {
        let in1 = self.punch_in_1.trim();
        let out1 = self.punch_out_1.trim();
        let in2 = self.punch_in_2.trim();
        let out2 = self.punch_out_2.trim();

        if !can_finalize(in1, out1) {
            return Err(AppError::InputRequired(
                "Please select Punch In 1 and Punch Out 1 for the final pay period day."
                    .to_string(),
            ));
        }
        if in2.is_empty() != out2.is_empty() {
            return Err(AppError::ValidationError(
                "Please provide both Punch In 2 and Punch Out 2, or leave both empty.".to_string(),
            ));
        }

        let punch_in_1 = parse_field(in1, "Punch In 1")?;
        let punch_out_1 = parse_field(out1, "Punch Out 1")?;
        if punch_out_1 <= punch_in_1 {
            return Err(AppError::TimeOrderError(
                "Punch Out 1 must be after Punch In 1.".to_string(),
            ));
        }
        let mut duration = hours_between(punch_in_1.time(), punch_out_1.time());

        let (punch_in_2, punch_out_2) = if in2.is_empty() {
            (None, None)
        } else {
            let punch_in_2 = parse_field(in2, "Punch In 2")?;
            let punch_out_2 = parse_field(out2, "Punch Out 2")?;
            if punch_out_2 <= punch_in_2 {
                return Err(AppError::TimeOrderError(
                    "Punch Out 2 must be after Punch In 2.".to_string(),
                ));
            }
            duration += hours_between(punch_in_2.time(), punch_out_2.time());
            (Some(punch_in_2), Some(punch_out_2))
        };

        Ok(FinalDayCycle {
            punch_in_1,
            punch_out_1,
            punch_in_2,
            punch_out_2,
            duration,
        })
    }
}

fn parse_field(label: &str, field: &str) -> Result<ClockTime, AppError> {
    ClockTime::parse(label).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Time parsing error for {}: '{}' is not a time like 9:00 AM",
            field, label
        ))
    })
}

/// Whether the finalize action may be offered for the current field values.
pub fn can_finalize(punch_in_1: &str, punch_out_1: &str) -> bool {
    !punch_in_1.trim().is_empty() && !punch_out_1.trim().is_empty()
}

/// What a successful finalize leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub report: PayPeriodReport,
    pub next_period: PayPeriod,
}

// --- Punch Service ---

/// Owns the loaded document and applies every user action to it. Each
/// mutating call works on a copy, saves the copy, and only then swaps it in,
/// so a failed call leaves memory and disk as they were.
pub struct PunchService {
    store: DataStore,
    document: TimeDocument,
    first_period_start: NaiveDate,
    /// Set when the file on disk could not be read; it is copied aside
    /// before the first save replaces it.
    unreadable_on_load: bool,
}

impl PunchService {
    pub fn new(store: DataStore, document: TimeDocument, first_period_start: NaiveDate) -> Self {
        Self {
            store,
            document,
            first_period_start,
            unreadable_on_load: false,
        }
    }

    /// Loads the store. A corrupt file yields an empty service plus the load
    /// error for the caller to show.
    pub fn open(store: DataStore, first_period_start: NaiveDate) -> (Self, Option<AppError>) {
        let loaded = store.load();
        let mut service = Self::new(store, loaded.document, first_period_start);
        service.unreadable_on_load = loaded.error.is_some();
        (service, loaded.error)
    }

    pub fn document(&self) -> &TimeDocument {
        &self.document
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn user_names(&self) -> Vec<String> {
        self.document.user_names().map(str::to_string).collect()
    }

    pub fn user(&self, name: &str) -> Result<&UserRecord, AppError> {
        self.document
            .user(name)
            .ok_or_else(|| AppError::UnknownUser(name.to_string()))
    }

    /// The user's open period. `None` only if it has not been created yet.
    pub fn current_period(&self, name: &str) -> Result<Option<&PayPeriod>, AppError> {
        Ok(self.user(name)?.current_period())
    }

    fn commit(&mut self, working: TimeDocument) -> Result<(), AppError> {
        if self.unreadable_on_load {
            self.store.preserve_unreadable()?;
            self.unreadable_on_load = false;
        }
        self.store.save(&working)?;
        self.document = working;
        Ok(())
    }

    /// Registers `name` if new and makes sure it has an open period.
    pub fn login(&mut self, name: &str) -> Result<&PayPeriod, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InputRequired("Please enter your name.".to_string()));
        }
        if name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
            return Err(AppError::ValidationError(format!(
                "'{}' cannot be used as a name: no slashes, and not '.' or '..'.",
                name
            )));
        }

        if self.document.user(name).is_none() {
            let mut working = self.document.clone();
            let mut user = UserRecord::default();
            user.open_or_create_period(self.first_period_start);
            working.users.insert(name.to_string(), user);
            self.commit(working)?;
            info!("Registered new user {}", name);
        }
        self.open_or_create_period(name)
    }

    /// Returns the trailing period if still open; otherwise appends the next
    /// one and persists.
    pub fn open_or_create_period(&mut self, name: &str) -> Result<&PayPeriod, AppError> {
        let needs_new = self.user(name)?.current_period().is_none();
        if needs_new {
            let mut working = self.document.clone();
            if let Some(user) = working.user_mut(name) {
                user.open_or_create_period(self.first_period_start);
            }
            self.commit(working)?;
        }

        let period = self
            .user(name)?
            .current_period()
            .ok_or_else(|| AppError::SequenceError("No open pay period.".to_string()))?;
        if needs_new {
            info!(
                "Opened pay period {} to {} for {}",
                period.start_date, period.end_date, name
            );
        }
        Ok(period)
    }

    /// Working copy of the document plus the user's open period in it,
    /// created if missing.
    fn working_period<'a>(
        &self,
        working: &'a mut TimeDocument,
        name: &str,
    ) -> Result<&'a mut PayPeriod, AppError> {
        let user = working
            .user_mut(name)
            .ok_or_else(|| AppError::UnknownUser(name.to_string()))?;
        user.open_or_create_period(self.first_period_start);
        user.current_period_mut()
            .ok_or_else(|| AppError::SequenceError("No open pay period.".to_string()))
    }

    pub fn punch_in(&mut self, name: &str, now: NaiveDateTime) -> Result<ClockTime, AppError> {
        let today = now.date();
        if is_weekend(today) {
            return Err(AppError::WeekendBlocked(today));
        }

        let mut working = self.document.clone();
        let punch_in = ClockTime::new(now.time());
        {
            let period = self.working_period(&mut working, name)?;
            warn_outside(period, today);
            let day = period.records.entry(today).or_insert_with(DayLog::default);
            match day.state() {
                DayState::Open => {
                    return Err(AppError::SequenceError(
                        "You must punch out before punching in again.".to_string(),
                    ))
                }
                DayState::Full | DayState::Finalized => return Err(AppError::LimitReached),
                DayState::Idle => {
                    day.push_open(punch_in);
                }
            }
        }
        self.commit(working)?;
        info!("{} punched in at {} on {}", name, punch_in, today);
        Ok(punch_in)
    }

    /// Closes the open cycle. The punch-in time is read as falling on `now`'s
    /// date; a negative span clamps to zero hours.
    pub fn punch_out(&mut self, name: &str, now: NaiveDateTime) -> Result<PunchCycle, AppError> {
        let today = now.date();
        let mut working = self.document.clone();
        let closed = {
            let period = self.working_period(&mut working, name)?;
            let cycle = period
                .records
                .get_mut(&today)
                .and_then(DayLog::open_cycle_mut)
                .ok_or_else(|| {
                    AppError::SequenceError("No active punch in to punch out from.".to_string())
                })?;
            let punched_in_at = today.and_time(cycle.punch_in.time());
            let hours = (now - punched_in_at).num_milliseconds() as f64 / 3_600_000.0;
            cycle.punch_out = Some(ClockTime::new(now.time()));
            cycle.duration = Some(hours.max(0.0));
            cycle.clone()
        };
        self.commit(working)?;
        info!(
            "{} punched out at {} on {} ({:.2} hours)",
            name,
            closed.punch_out.map(|t| t.label()).unwrap_or_default(),
            today,
            closed.hours()
        );
        Ok(closed)
    }

    /// Writes the final-day record over the period's end date, locks the
    /// period, opens the next one and builds the report, all in one save.
    pub fn finalize(
        &mut self,
        name: &str,
        entry: &FinalDayEntry,
    ) -> Result<FinalizeOutcome, AppError> {
        let record = entry.validate()?;

        let mut working = self.document.clone();
        let finalized = {
            let period = self.working_period(&mut working, name)?;
            period
                .records
                .insert(period.end_date, DayLog::FinalDay(record));
            period.finalized = true;
            period.clone()
        };
        let next_period = {
            let user = working
                .user_mut(name)
                .ok_or_else(|| AppError::UnknownUser(name.to_string()))?;
            user.open_or_create_period(self.first_period_start);
            user.current_period()
                .cloned()
                .ok_or_else(|| AppError::SequenceError("No open pay period.".to_string()))?
        };
        self.commit(working)?;

        info!(
            "{} finalized pay period {} to {}; next period {} to {}",
            name,
            finalized.start_date,
            finalized.end_date,
            next_period.start_date,
            next_period.end_date
        );
        Ok(FinalizeOutcome {
            report: build_report(name, &finalized),
            next_period,
        })
    }

    /// Sets or clears the manual total of the period ending on `end_date`.
    pub fn set_custom_hours(
        &mut self,
        name: &str,
        end_date: NaiveDate,
        hours: Option<f64>,
    ) -> Result<(), AppError> {
        if let Some(h) = hours {
            if !h.is_finite() || h < 0.0 {
                return Err(AppError::ValidationError(format!(
                    "Custom hours must be a non-negative number, got {}",
                    h
                )));
            }
        }

        let mut working = self.document.clone();
        {
            let user = working
                .user_mut(name)
                .ok_or_else(|| AppError::UnknownUser(name.to_string()))?;
            let period = user
                .period_ending_mut(end_date)
                .ok_or(AppError::PeriodNotFound(end_date))?;
            period.custom_hours = hours;
        }
        self.commit(working)?;
        match hours {
            Some(h) => info!("{}: custom hours for period ending {} set to {}", name, end_date, h),
            None => info!("{}: custom hours for period ending {} cleared", name, end_date),
        }
        Ok(())
    }

    /// Report data for any of the user's periods, identified by end date.
    pub fn report_for(&self, name: &str, end_date: NaiveDate) -> Result<PayPeriodReport, AppError> {
        let period = self
            .user(name)?
            .period_ending(end_date)
            .ok_or(AppError::PeriodNotFound(end_date))?;
        Ok(build_report(name, period))
    }
}

fn warn_outside(period: &PayPeriod, date: NaiveDate) {
    if !period.contains(date) {
        warn!(
            "Punch on {} ({}) falls outside the open pay period {} to {}",
            date,
            date.weekday(),
            period.start_date,
            period.end_date
        );
    }
}
