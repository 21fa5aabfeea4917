// src/store.rs
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::pay_period::TimeDocument;

pub const DEFAULT_DATA_FILE: &str = "data.json";

/// Result of reading the data file. A corrupt or unreadable file still
/// yields a usable (empty) document; the failure rides along in `error` so
/// the caller can tell the user.
#[derive(Debug)]
pub struct Loaded {
    pub document: TimeDocument,
    pub error: Option<AppError>,
}

/// Owns the path of the single JSON document holding every user.
#[derive(Debug, Clone)]
pub struct DataStore {
    path: PathBuf,
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. Missing file: empty document, no error.
    /// Unreadable or malformed file: empty document plus the error. The file
    /// itself is left untouched.
    pub fn load(&self) -> Loaded {
        match self.read() {
            Ok(Some(document)) => {
                info!(
                    "Loaded {} user(s) from {}",
                    document.users.len(),
                    self.path.display()
                );
                Loaded {
                    document,
                    error: None,
                }
            }
            Ok(None) => {
                info!("Data file {} not found, starting empty.", self.path.display());
                Loaded {
                    document: TimeDocument::default(),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Falling back to an empty document: {}", e);
                Loaded {
                    document: TimeDocument::default(),
                    error: Some(e),
                }
            }
        }
    }

    fn read(&self) -> Result<Option<TimeDocument>, AppError> {
        let json_string = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::persistence(&self.path, e)),
        };
        serde_json::from_str(&json_string)
            .map(Some)
            .map_err(|e| AppError::persistence(&self.path, e))
    }

    /// Overwrites the whole file. The JSON goes to a sibling temp file first
    /// and is renamed into place, so a failed write leaves the previous
    /// version intact. No retry.
    pub fn save(&self, document: &TimeDocument) -> Result<(), AppError> {
        self.write(document).map_err(|e| {
            error!("Failed to save data to {}: {}", self.path.display(), e);
            e
        })?;
        info!("Data saved to {}", self.path.display());
        Ok(())
    }

    fn write(&self, document: &TimeDocument) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::persistence(parent, e))?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document
            .serialize(&mut ser)
            .map_err(|e| AppError::persistence(&self.path, e))?;

        let tmp_path = self.temp_path();
        let mut file = File::create(&tmp_path).map_err(|e| AppError::persistence(&tmp_path, e))?;
        file.write_all(&buf)
            .and_then(|_| file.sync_all())
            .map_err(|e| AppError::persistence(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            AppError::persistence(&self.path, e)
        })
    }

    /// Copies the current file aside as `<file>.corrupt-<timestamp>` so a
    /// document that failed to load survives the next save. Nothing to copy
    /// when the file is gone.
    pub fn preserve_unreadable(&self) -> Result<Option<PathBuf>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup = self.backup_path(Local::now().naive_local());
        fs::copy(&self.path, &backup).map_err(|e| AppError::persistence(&backup, e))?;
        warn!(
            "Unreadable data file {} preserved as {}",
            self.path.display(),
            backup.display()
        );
        Ok(Some(backup))
    }

    fn backup_path(&self, at: NaiveDateTime) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.into());
        name.push(format!(".corrupt-{}", at.format("%Y%m%d-%H%M%S%3f")));
        self.path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_DATA_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
