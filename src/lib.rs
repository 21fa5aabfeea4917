// src/lib.rs
//! Punch in/out time tracking over two-week pay periods, persisted as one
//! JSON document, with a report of every finalized period.

pub mod config;
pub mod desktop;
pub mod error;
pub mod pay_period;
pub mod punch;
pub mod report;
pub mod report_pdf;
pub mod store;
pub mod time_format;
pub mod views;

mod punch_tests;

pub use config::AppConfig;
pub use error::AppError;
pub use pay_period::{day_total, period_total, PayPeriod, TimeDocument};
pub use punch::{can_finalize, FinalDayEntry, FinalizeOutcome, PunchService};
pub use report::{build_report, PayPeriodReport, ReportRenderer};
pub use report_pdf::PdfReportRenderer;
pub use store::DataStore;
