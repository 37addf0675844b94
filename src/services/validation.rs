use crate::domain::period::DateRange;
use crate::services::error_handling::{ExplorerError, ExplorerResult};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

/// Input validation for all user-provided data
pub struct InputValidator;

impl InputValidator {
    /// Parse a `YYYY-MM-DD` date
    pub fn parse_date(field: &str, value: &str) -> ExplorerResult<NaiveDate> {
        let trimmed = value.trim();

        if !DATE_PATTERN.is_match(trimmed) {
            return Err(invalid(field, "expected a date like 2023-01-31"));
        }

        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map_err(|_| invalid(field, &format!("{} is not a calendar date", trimmed)))
    }

    /// Resolve the selected range against the dates the history covers.
    /// Missing ends default to the history's first / last day and the
    /// result is clamped to what is available.
    pub fn resolve_range(
        from: Option<&str>,
        to: Option<&str>,
        available: DateRange,
    ) -> ExplorerResult<DateRange> {
        let start = match from {
            Some(value) => Self::parse_date("from", value)?,
            None => available.start(),
        };
        let end = match to {
            Some(value) => Self::parse_date("to", value)?,
            None => available.end(),
        };

        let requested = DateRange::new(start, end)?;
        requested
            .intersect(&available)
            .ok_or(ExplorerError::EmptyRange)
    }

    /// Validate list lengths
    pub fn validate_top_n(top_n: usize) -> ExplorerResult<usize> {
        if top_n == 0 {
            return Err(invalid("top", "must be at least 1"));
        }
        Ok(top_n)
    }

    /// Validate and trim artist / track names
    pub fn validate_name(field: &str, value: &str) -> ExplorerResult<String> {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(invalid(field, "cannot be empty"));
        }

        Ok(trimmed.to_string())
    }
}

fn invalid(field: &str, reason: &str) -> ExplorerError {
    ExplorerError::Validation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
