// src/main.rs
use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use timepunch::desktop::{mail_subject, DesktopLauncher, SystemLauncher};
use timepunch::report::{format_hours, report_folder, report_path, CsvReportRenderer, PayPeriodReport};
use timepunch::time_format::{options_after, TIME_OPTIONS};
use timepunch::views::{history, today_summary, week_view};
use timepunch::{
    period_total, AppConfig, AppError, DataStore, FinalDayEntry, PdfReportRenderer, PunchService,
    ReportRenderer,
};

#[derive(Parser)]
#[command(name = "timepunch")]
#[command(version)]
#[command(about = "Punch in/out over two-week pay periods and export the hours", long_about = None)]
struct Cli {
    /// Data file holding every user (overrides TIMEPUNCH_DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Folder reports are written to (overrides TIMEPUNCH_REPORT_DIR)
    #[arg(long, global = true)]
    report_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved user names
    Users,
    /// Register or open a user and show the current pay period
    Login {
        #[arg(short, long)]
        user: String,
    },
    /// Punch in at the current time
    In {
        #[arg(short, long)]
        user: String,
    },
    /// Punch out at the current time
    Out {
        #[arg(short, long)]
        user: String,
    },
    /// Today's punches and the running totals
    Status {
        #[arg(short, long)]
        user: String,
    },
    /// This week's punches, Monday to Sunday
    Week {
        #[arg(short, long)]
        user: String,
    },
    /// Finalized pay periods, newest first
    History {
        #[arg(short, long)]
        user: String,
    },
    /// Selectable times for the final day
    Options {
        /// Only list times later than this one
        #[arg(long)]
        after: Option<String>,
    },
    /// Close the current pay period with the final day's punches
    Finalize {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        in1: String,
        #[arg(long)]
        out1: String,
        #[arg(long)]
        in2: Option<String>,
        #[arg(long)]
        out2: Option<String>,
        /// Open the report once written
        #[arg(long)]
        open: bool,
        /// Start a mail to the report recipient
        #[arg(long)]
        send: bool,
    },
    /// Write the report of a pay period again
    Report {
        #[arg(short, long)]
        user: String,
        /// End date of the pay period
        #[arg(long, value_name = "YYYY-MM-DD")]
        end: NaiveDate,
        #[arg(long)]
        open: bool,
    },
    /// Override or clear the total hours of a pay period
    Adjust {
        #[arg(short, long)]
        user: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        end: NaiveDate,
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        hours: Option<f64>,
        #[arg(long)]
        clear: bool,
    },
    /// Open the user's report folder
    OpenFolder {
        #[arg(short, long)]
        user: String,
    },
}

struct App {
    config: AppConfig,
    service: PunchService,
    pdf: PdfReportRenderer,
    csv: CsvReportRenderer,
    launcher: SystemLauncher,
}

impl App {
    /// Writes the PDF at the report path plus a CSV copy beside it. Returns
    /// the PDF's path.
    fn write_report(&self, report: &PayPeriodReport, user: &str) -> Result<PathBuf, AppError> {
        let path = report_path(&self.config.report_dir, user, report.end_date);
        let written = self.pdf.render(report, &path)?;
        let csv = self.csv.render(report, &path)?;
        println!("Report saved to {}", written.display());
        println!("Spreadsheet copy saved to {}", csv.display());
        Ok(written)
    }

    fn run(&mut self, command: Commands, now: NaiveDateTime) -> Result<(), AppError> {
        match command {
            Commands::Users => {
                let names = self.service.user_names();
                if names.is_empty() {
                    println!("No saved users.");
                }
                for name in names {
                    println!("{}", name);
                }
            }
            Commands::Login { user } => {
                let period = self.service.login(&user)?;
                println!(
                    "Logged in as {}. Pay period: {} to {}",
                    user.trim(),
                    period.start_date,
                    period.end_date
                );
            }
            Commands::In { user } => {
                let stamp = self.service.punch_in(&user, now)?;
                println!("Punched in at {}", stamp);
            }
            Commands::Out { user } => {
                let cycle = self.service.punch_out(&user, now)?;
                println!(
                    "Punched out at {} ({} hours)",
                    cycle.punch_out.map(|t| t.label()).unwrap_or_default(),
                    format_hours(cycle.hours())
                );
            }
            Commands::Status { user } => {
                let period = self.service.open_or_create_period(&user)?;
                let summary = today_summary(period, now.date());
                println!("Pay Period: {} to {}", summary.period_start, summary.period_end);
                println!("{}", summary.daily_punches_line());
                println!(
                    "Last Punch: {}",
                    summary.last_punch.as_deref().unwrap_or("None")
                );
                println!("Today's Hours: {}", format_hours(summary.today_hours));
                println!("Total Pay Period Hours: {}", format_hours(summary.period_hours));
                println!(
                    "Punch In: {}  |  Punch Out: {}",
                    availability(summary.can_punch_in),
                    availability(summary.can_punch_out)
                );
            }
            Commands::Week { user } => {
                let period = self.service.open_or_create_period(&user)?;
                for day in week_view(period, now.date()) {
                    println!("{} ({})", day.date, day.date.weekday());
                    for line in day.lines {
                        println!("  {}", line);
                    }
                }
            }
            Commands::History { user } => {
                let entries = history(self.service.user(&user)?);
                if entries.is_empty() {
                    println!("No finalized pay periods.");
                }
                for entry in entries {
                    println!(
                        "{} to {}: {} hours",
                        entry.start_date,
                        entry.end_date,
                        format_hours(entry.total_hours)
                    );
                }
            }
            Commands::Options { after } => {
                let options = match after {
                    Some(label) => options_after(&label),
                    None => TIME_OPTIONS.clone(),
                };
                for option in options {
                    println!("{}", option);
                }
            }
            Commands::Finalize {
                user,
                in1,
                out1,
                in2,
                out2,
                open,
                send,
            } => {
                let entry = FinalDayEntry::new(&in1, &out1, in2.as_deref(), out2.as_deref());
                let outcome = self.service.finalize(&user, &entry)?;
                println!(
                    "Pay period {} to {} finalized: {} hours",
                    outcome.report.start_date,
                    outcome.report.end_date,
                    format_hours(outcome.report.total_hours)
                );
                println!(
                    "Next pay period: {} to {}",
                    outcome.next_period.start_date, outcome.next_period.end_date
                );

                let written = self.write_report(&outcome.report, &user)?;
                if open {
                    self.launcher.open_path(&written)?;
                }
                if send {
                    let recipient = self.config.report_recipient.as_deref().unwrap_or_default();
                    let subject = mail_subject(&user, outcome.report.end_date);
                    self.launcher.send_report(recipient, &subject, &written)?;
                }
            }
            Commands::Report { user, end, open } => {
                let report = self.service.report_for(&user, end)?;
                let written = self.write_report(&report, &user)?;
                if open {
                    self.launcher.open_path(&written)?;
                }
            }
            Commands::Adjust {
                user,
                end,
                hours,
                clear,
            } => {
                let hours = if clear { None } else { hours };
                self.service.set_custom_hours(&user, end, hours)?;
                let total = self
                    .service
                    .user(&user)?
                    .period_ending(end)
                    .map_or(0.0, period_total);
                println!(
                    "Total hours for the pay period ending {}: {}",
                    end,
                    format_hours(total)
                );
            }
            Commands::OpenFolder { user } => {
                self.service.user(&user)?;
                let folder = report_folder(&self.config.report_dir, &user);
                fs::create_dir_all(&folder).map_err(|e| {
                    AppError::ExternalToolError(format!(
                        "Could not create report folder {}: {}",
                        folder.display(),
                        e
                    ))
                })?;
                self.launcher.open_path(&folder)?;
            }
        }
        Ok(())
    }
}

fn availability(enabled: bool) -> &'static str {
    if enabled {
        "available"
    } else {
        "unavailable"
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn start(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(data_file) = cli.data_file {
        config.data_file = data_file;
    }
    if let Some(report_dir) = cli.report_dir {
        config.report_dir = report_dir;
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.log_level);
    info!("Using data file {}", config.data_file.display());

    let store = DataStore::new(&config.data_file);
    let (service, load_error) = PunchService::open(store, config.first_period_start);
    if let Some(e) = load_error {
        eprintln!("{}: {}", e.title(), e);
        eprintln!("The unreadable file will be kept as a .corrupt copy before anything is saved.");
    }

    let mut app = App {
        pdf: PdfReportRenderer::new(config.report_title.clone()),
        csv: CsvReportRenderer::new(config.report_title.clone()),
        launcher: SystemLauncher,
        service,
        config,
    };
    app.run(cli.command, Local::now().naive_local())?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match start(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<AppError>() {
                Some(app_err) => {
                    error!("{}", app_err);
                    eprintln!("{}: {}", app_err.title(), app_err);
                }
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
