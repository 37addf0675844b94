use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Custom error types with descriptive messages
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("No {marker}*.json files found in the archive")]
    NoHistoryFiles { marker: String },

    #[error("No valid streaming records found in the files")]
    NoValidRecords,

    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("Malformed history file {file}: {source}")]
    MalformedFile {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Artist not found in selected range: {artist}")]
    ArtistNotFound { artist: String },

    #[error("Track not found in selected range: {track} - {artist}")]
    TrackNotFound { track: String, artist: String },

    #[error("No data in selected date range")]
    EmptyRange,

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Could not read archive {path:?}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ExplorerResult<T> = std::result::Result<T, ExplorerError>;

/// Structured logging helpers
pub struct LogHelper;

impl LogHelper {
    pub fn log_error_with_context(context: &str, error: &anyhow::Error) {
        error!(
            context = %context,
            error = %error,
            error_chain = ?error.chain().map(|e| e.to_string()).collect::<Vec<_>>(),
            "Error occurred"
        );
    }

    pub fn log_skipped_entry(file: &str, reason: &str) {
        debug!(file = %file, reason = %reason, "Skipping history entry");
    }

    pub fn log_performance_warning(operation: &str, duration_ms: u64, threshold_ms: u64) {
        if duration_ms > threshold_ms {
            warn!(
                operation = %operation,
                duration_ms = duration_ms,
                threshold_ms = threshold_ms,
                "Operation exceeded performance threshold"
            );
        }
    }
}

/// User-friendly error messages
pub struct UserErrorFormatter;

impl UserErrorFormatter {
    pub fn format_for_user(error: &anyhow::Error) -> String {
        if let Some(explorer_error) = error.downcast_ref::<ExplorerError>() {
            return Self::format_explorer_error(explorer_error);
        }

        // Typed errors may sit below a context layer
        for cause in error.chain() {
            if let Some(explorer_error) = cause.downcast_ref::<ExplorerError>() {
                return Self::format_explorer_error(explorer_error);
            }
        }

        format!("{:#}", error)
    }

    fn format_explorer_error(error: &ExplorerError) -> String {
        match error {
            ExplorerError::NoHistoryFiles { marker } => format!(
                "No {}*.json files found in the ZIP file. Request the \"Extended streaming history\" export.",
                marker
            ),
            ExplorerError::Archive { path, .. } => {
                format!("{} is not a readable ZIP archive.", path.display())
            }
            ExplorerError::EmptyRange => "No data in selected date range.".to_string(),
            ExplorerError::ArtistNotFound { artist } => {
                format!("No tracks found for {} in the selected date range.", artist)
            }
            _ => error.to_string(),
        }
    }
}

/// Performance monitoring
pub struct PerformanceMonitor {
    operation: String,
    start: Instant,
    threshold_ms: u64,
}

impl PerformanceMonitor {
    pub fn new(operation: impl Into<String>, threshold_ms: u64) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
            threshold_ms,
        }
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        LogHelper::log_performance_warning(&self.operation, duration_ms, self.threshold_ms);

        debug!(
            operation = %self.operation,
            duration_ms = duration_ms,
            "Operation completed"
        );
    }
}
