use crate::domain::period::MonthPeriod;
use crate::services::error_handling::{ExplorerError, ExplorerResult};
use crate::utils::ms_to_hours;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a `Streaming_History_Audio_*.json` file as exported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStreamEntry {
    pub ts: Option<String>,
    pub platform: Option<String>,
    pub ms_played: Option<u64>,
    pub master_metadata_track_name: Option<String>,
    pub master_metadata_album_artist_name: Option<String>,
    pub master_metadata_album_album_name: Option<String>,
    pub spotify_track_uri: Option<String>,
    pub skipped: Option<bool>,
    pub shuffle: Option<bool>,
    pub offline: Option<bool>,
    pub incognito_mode: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamRecord {
    pub timestamp: DateTime<Utc>,
    pub platform: Option<String>,
    pub ms_played: Option<u64>,
    pub track_name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub spotify_uri: Option<String>,
    pub skipped: Option<bool>,
    pub shuffle: Option<bool>,
    pub offline: Option<bool>,
    pub incognito_mode: Option<bool>,
    pub source_file: String,
}

/// Why an entry did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingTimestamp,
    TooLong,
}

impl StreamRecord {
    /// Convert a raw entry. Entries without a timestamp or longer than
    /// `max_play_ms` are rejected; a timestamp that does not parse is an error.
    pub fn from_raw(
        raw: RawStreamEntry,
        source_file: &str,
        max_play_ms: u64,
    ) -> ExplorerResult<Result<Self, Rejection>> {
        let ts = match raw.ts.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => ts,
            _ => return Ok(Err(Rejection::MissingTimestamp)),
        };

        if raw.ms_played.is_some_and(|ms| ms > max_play_ms) {
            return Ok(Err(Rejection::TooLong));
        }

        let timestamp = parse_timestamp(ts)?;

        Ok(Ok(Self {
            timestamp,
            platform: raw.platform,
            ms_played: raw.ms_played,
            track_name: raw.master_metadata_track_name,
            artist: raw.master_metadata_album_artist_name,
            album: raw.master_metadata_album_album_name,
            spotify_uri: raw.spotify_track_uri,
            skipped: raw.skipped,
            shuffle: raw.shuffle,
            offline: raw.offline,
            incognito_mode: raw.incognito_mode,
            source_file: source_file.to_string(),
        }))
    }

    /// Hours listened; a missing `ms_played` counts as nothing.
    pub fn hours_played(&self) -> f64 {
        ms_to_hours(self.ms_played.unwrap_or(0))
    }

    pub fn is_likely_skipped(&self, threshold_ms: u64) -> bool {
        self.ms_played.is_some_and(|ms| ms < threshold_ms)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn month(&self) -> MonthPeriod {
        MonthPeriod::new(self.timestamp.year(), self.timestamp.month())
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Parse an export timestamp such as `2023-04-01T18:22:05Z`.
pub fn parse_timestamp(value: &str) -> ExplorerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ExplorerError::InvalidTimestamp {
            value: value.to_string(),
        })
}
