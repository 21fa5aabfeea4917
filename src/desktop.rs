// src/desktop.rs
use chrono::NaiveDate;
use std::path::Path;
use std::process::Command;
use tracing::{error, info};
use url::Url;

use crate::error::AppError;

const MAIL_COMPOSE_URL: &str = "https://mail.google.com/mail/";

/// Hands files, folders and mail drafts to whatever the host uses for them.
pub trait DesktopLauncher {
    fn open_path(&self, path: &Path) -> Result<(), AppError>;
    fn open_url(&self, url: &Url) -> Result<(), AppError>;

    fn compose_mail(&self, recipient: &str, subject: &str) -> Result<(), AppError> {
        let url = compose_url(recipient, subject)?;
        self.open_url(&url)
    }

    /// Starts the mail and opens the folder holding `report_file` so it can
    /// be attached.
    fn send_report(&self, recipient: &str, subject: &str, report_file: &Path) -> Result<(), AppError> {
        self.compose_mail(recipient, subject)?;
        match report_file.parent() {
            Some(folder) => self.open_path(folder),
            None => Ok(()),
        }
    }
}

/// Web-mail compose link with recipient and subject filled in.
pub fn compose_url(recipient: &str, subject: &str) -> Result<Url, AppError> {
    if recipient.trim().is_empty() {
        return Err(AppError::InputRequired(
            "A report recipient is required to send hours.".to_string(),
        ));
    }
    Url::parse_with_params(
        MAIL_COMPOSE_URL,
        &[
            ("view", "cm"),
            ("fs", "1"),
            ("to", recipient.trim()),
            ("su", subject),
        ],
    )
    .map_err(|e| AppError::ExternalToolError(format!("Could not build mail link: {}", e)))
}

pub fn mail_subject(employee: &str, end_date: NaiveDate) -> String {
    format!("{} Hours - {}", employee, end_date.format("%Y-%m-%d"))
}

/// Uses the platform's opener: `open` on macOS, `explorer` on Windows,
/// `xdg-open` elsewhere.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn opener() -> Command {
        if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            Command::new("explorer")
        } else {
            Command::new("xdg-open")
        }
    }

    fn launch(&self, target: &str) -> Result<(), AppError> {
        info!("Opening {}", target);
        Self::opener().arg(target).spawn().map(|_| ()).map_err(|e| {
            error!("Could not open {}: {}", target, e);
            AppError::ExternalToolError(format!("Could not open {}: {}", target, e))
        })
    }
}

impl DesktopLauncher for SystemLauncher {
    fn open_path(&self, path: &Path) -> Result<(), AppError> {
        if !path.exists() {
            return Err(AppError::ExternalToolError(format!(
                "Could not open {}: no such file or folder",
                path.display()
            )));
        }
        self.launch(&path.to_string_lossy())
    }

    fn open_url(&self, url: &Url) -> Result<(), AppError> {
        self.launch(url.as_str())
    }
}
