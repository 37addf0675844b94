use crate::domain::period::{DateRange, MonthPeriod};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A track is identified by its name together with the album artist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub track: String,
    pub artist: String,
}

impl TrackKey {
    pub fn new(track: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            artist: artist.into(),
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.track, self.artist)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry<K> {
    pub key: K,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyHours {
    pub month: MonthPeriod,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTrack {
    pub track: TrackKey,
    pub skip_count: usize,
    pub avg_listen_ms: f64,
}

impl SkippedTrack {
    pub fn avg_listen_seconds(&self) -> f64 {
        self.avg_listen_ms / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningMetrics {
    pub total_hours: f64,
    pub total_streams: usize,
    pub unique_artists: usize,
    pub unique_tracks: usize,
    pub top_artists: Vec<RankedEntry<String>>,
    pub top_tracks: Vec<RankedEntry<TrackKey>>,
    pub monthly_listening: Vec<MonthlyHours>,
    pub most_skipped: Vec<SkippedTrack>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformShare {
    pub platform: String,
    pub hours: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkipStats {
    pub skip_rate_pct: f64,
    /// `None` when no play in the range carries a duration
    pub avg_listen_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistProfile {
    pub artist: String,
    pub top_songs: Vec<RankedEntry<String>>,
    pub total_hours: f64,
    pub total_plays: usize,
    pub unique_songs: usize,
    pub monthly_listening: Vec<MonthlyHours>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicsCandidate {
    pub track: TrackKey,
    pub play_count: usize,
    pub hours: f64,
}

impl ForensicsCandidate {
    pub fn label(&self) -> String {
        format!("{} ({} plays)", self.track, self.play_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlays {
    pub date: NaiveDate,
    pub plays: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPlays {
    pub hour: u32,
    pub plays: usize,
}

/// Half-open bin `[lower, upper)`; the last bin of a histogram also holds `upper`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub platform: Option<String>,
    pub skipped: Option<bool>,
    pub shuffle: Option<bool>,
    pub offline: Option<bool>,
    pub duration_seconds: f64,
    pub likely_skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackForensics {
    pub track: TrackKey,
    /// Every play of the track, skips included
    pub play_count: usize,
    /// Plays that were not likely skipped
    pub full_plays: usize,
    pub total_hours: f64,
    pub avg_listen_seconds: Option<f64>,
    pub skip_count: usize,
    pub skip_rate_pct: f64,
    pub daily_plays: Vec<DailyPlays>,
    pub duration_histogram: Vec<HistogramBin>,
    pub hourly_plays: Vec<HourlyPlays>,
    pub most_common_hour: Option<u32>,
    /// Most recent play first
    pub history: Vec<PlayHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPlay {
    pub timestamp: DateTime<Utc>,
    pub track_name: Option<String>,
    pub artist: Option<String>,
    pub minutes_played: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickStats {
    pub total_hours: f64,
    pub total_streams: usize,
    pub unique_artists: usize,
    pub unique_tracks: usize,
}

impl From<&ListeningMetrics> for QuickStats {
    fn from(metrics: &ListeningMetrics) -> Self {
        Self {
            total_hours: metrics.total_hours,
            total_streams: metrics.total_streams,
            unique_artists: metrics.unique_artists,
            unique_tracks: metrics.unique_tracks,
        }
    }
}

/// Everything the session view shows for one date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    /// Whole history, independent of the selected range
    pub quick_stats: QuickStats,
    pub available: DateRange,
    pub range: DateRange,
    pub metrics: ListeningMetrics,
    pub platform_usage: Vec<PlatformShare>,
    pub skip_stats: SkipStats,
    pub artist_options: Vec<String>,
    pub recent_activity: Vec<RecentPlay>,
}
