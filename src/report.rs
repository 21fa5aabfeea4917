// src/report.rs
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::AppError;
use crate::pay_period::{is_weekend, period_total, DayLog, PayPeriod};
use crate::time_format::ClockTime;

pub const REPORT_HEADERS: [&str; 6] = ["Date", "In 1", "Out 1", "In 2", "Out 2", "Day Total"];
const EMPTY_CELL: &str = "-";

// --- Report Data ---

#[derive(Debug, Clone, PartialEq)]
pub enum ReportRow {
    /// Saturday or Sunday: rendered blank and shaded.
    Weekend { date: NaiveDate },
    Workday {
        date: NaiveDate,
        punch_in_1: Option<ClockTime>,
        punch_out_1: Option<ClockTime>,
        punch_in_2: Option<ClockTime>,
        punch_out_2: Option<ClockTime>,
        hours: f64,
    },
}

impl ReportRow {
    pub fn date(&self) -> NaiveDate {
        match self {
            ReportRow::Weekend { date } | ReportRow::Workday { date, .. } => *date,
        }
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, ReportRow::Weekend { .. })
    }

    pub fn hours(&self) -> f64 {
        match self {
            ReportRow::Weekend { .. } => 0.0,
            ReportRow::Workday { hours, .. } => *hours,
        }
    }

    /// Table cells in `REPORT_HEADERS` order. Missing punches and zero totals
    /// show a dash; weekend rows are all blank.
    pub fn cells(&self) -> [String; 6] {
        match self {
            ReportRow::Weekend { .. } => Default::default(),
            ReportRow::Workday {
                date,
                punch_in_1,
                punch_out_1,
                punch_in_2,
                punch_out_2,
                hours,
            } => [
                date.format("%Y-%m-%d").to_string(),
                dash_if_empty(punch_in_1),
                dash_if_empty(punch_out_1),
                dash_if_empty(punch_in_2),
                dash_if_empty(punch_out_2),
                if *hours > 0.0 {
                    format_hours(*hours)
                } else {
                    EMPTY_CELL.to_string()
                },
            ],
        }
    }
}

fn dash_if_empty(value: &Option<ClockTime>) -> String {
    value.map_or_else(|| EMPTY_CELL.to_string(), |t| t.label())
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekSubtotal {
    pub iso_week: u32,
    pub hours: f64,
}

/// Everything a renderer needs for one pay period.
#[derive(Debug, Clone, PartialEq)]
pub struct PayPeriodReport {
    pub employee: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub weekly: Vec<WeekSubtotal>,
    pub total_hours: f64,
}

impl PayPeriodReport {
    pub fn workday_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|r| !r.is_weekend())
    }
}

pub fn build_report(employee: &str, period: &PayPeriod) -> PayPeriodReport {
    let mut rows = Vec::new();
    let mut weekly: Vec<WeekSubtotal> = Vec::new();

    for date in period.dates() {
        if is_weekend(date) {
            rows.push(ReportRow::Weekend { date });
            continue;
        }

        let row = workday_row(date, period.day(date));
        let iso_week = date.iso_week().week();
        match weekly.iter_mut().find(|w| w.iso_week == iso_week) {
            Some(week) => week.hours += row.hours(),
            None => weekly.push(WeekSubtotal {
                iso_week,
                hours: row.hours(),
            }),
        }
        rows.push(row);
    }

    let report = PayPeriodReport {
        employee: employee.to_string(),
        start_date: period.start_date,
        end_date: period.end_date,
        rows,
        weekly,
        total_hours: period_total(period),
    };
    debug!(
        "Built report for {} ({} to {}): {} hours",
        employee, report.start_date, report.end_date, report.total_hours
    );
    report
}

fn workday_row(date: NaiveDate, day: Option<&DayLog>) -> ReportRow {
    let (punch_in_1, punch_out_1, punch_in_2, punch_out_2) = match day {
        Some(DayLog::FinalDay(f)) => (
            Some(f.punch_in_1),
            Some(f.punch_out_1),
            f.punch_in_2,
            f.punch_out_2,
        ),
        Some(DayLog::Cycles(cycles)) => {
            let first = cycles.first();
            let second = cycles.get(1);
            (
                first.map(|c| c.punch_in),
                first.and_then(|c| c.punch_out),
                second.map(|c| c.punch_in),
                second.and_then(|c| c.punch_out),
            )
        }
        None => (None, None, None, None),
    };
    ReportRow::Workday {
        date,
        punch_in_1,
        punch_out_1,
        punch_in_2,
        punch_out_2,
        hours: day.map_or(0.0, DayLog::total),
    }
}

/// Two decimals, halves rounded away from zero.
pub fn format_hours(hours: f64) -> String {
    match Decimal::from_f64(hours) {
        Some(d) => {
            let mut rounded = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(2);
            rounded.to_string()
        }
        None => format!("{:.2}", hours),
    }
}

// --- Output Location ---

/// `employee` as a single path component: separators become `_`, and `.`
/// or `..` cannot climb out of the report folder.
fn path_component(employee: &str) -> String {
    let cleaned: String = employee
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".repeat(cleaned.len().max(1)),
        _ => cleaned,
    }
}

pub fn report_folder(report_dir: &Path, employee: &str) -> PathBuf {
    report_dir.join(path_component(employee))
}

pub fn report_file_name(employee: &str, end_date: NaiveDate) -> String {
    format!(
        "{} Pay Period {}.pdf",
        path_component(employee),
        end_date.format("%Y-%m-%d")
    )
}

pub fn report_path(report_dir: &Path, employee: &str, end_date: NaiveDate) -> PathBuf {
    report_folder(report_dir, employee).join(report_file_name(employee, end_date))
}

// --- Rendering ---

/// Turns report data into a document on disk. `path` is the canonical
/// report path; implementations may swap the extension for their format and
/// return where the file actually went.
pub trait ReportRenderer {
    fn render(&self, report: &PayPeriodReport, path: &Path) -> Result<PathBuf, AppError>;
}

/// Writes the report as CSV next to the canonical path, as a spreadsheet
/// companion to the PDF.
#[derive(Debug, Clone)]
pub struct CsvReportRenderer {
    pub title: String,
}

impl CsvReportRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl ReportRenderer for CsvReportRenderer {
    fn render(&self, report: &PayPeriodReport, path: &Path) -> Result<PathBuf, AppError> {
        let out_path = path.with_extension("csv");
        if let Some(folder) = out_path.parent() {
            fs::create_dir_all(folder).map_err(|e| {
                AppError::ExternalToolError(format!(
                    "Could not create report folder {}: {}",
                    folder.display(),
                    e
                ))
            })?;
        }

        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&out_path)?;
        wtr.write_record([self.title.as_str()])?;
        wtr.write_record(["Employee", report.employee.as_str()])?;
        wtr.write_record([
            "Pay Period".to_string(),
            format!("{} to {}", report.start_date, report.end_date),
        ])?;
        wtr.write_record(REPORT_HEADERS)?;
        for row in &report.rows {
            wtr.write_record(row.cells())?;
        }
        wtr.write_record(["Weekly Hours Summary"])?;
        for week in &report.weekly {
            wtr.write_record([format!("Week {}", week.iso_week), format_hours(week.hours)])?;
        }
        wtr.write_record([
            "Total Pay Period Hours".to_string(),
            format_hours(report.total_hours),
        ])?;
        wtr.flush().map_err(|e| {
            AppError::ExternalToolError(format!("Could not write report: {}", e))
        })?;

        info!("Report written to {}", out_path.display());
        Ok(out_path)
    }
}
