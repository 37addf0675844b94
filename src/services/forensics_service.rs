use crate::config::AppConfig;
use crate::domain::metrics::{
    DailyPlays, ForensicsCandidate, HistogramBin, HourlyPlays, PlayHistoryEntry, TrackForensics,
    TrackKey,
};
use crate::domain::period::DateRange;
use crate::domain::stream::StreamRecord;
use crate::repository::Repository;
use crate::repository::stream_repository::StreamFilters;
use crate::services::error_handling::{ExplorerError, ExplorerResult};
use crate::services::metrics_service::{self, track_key};
use crate::utils::{ms_to_hours, percentage, round_to};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Play-by-play analysis of single tracks
#[derive(Clone)]
pub struct ForensicsService {
    repository: Arc<Repository>,
    config: AppConfig,
}

impl ForensicsService {
    pub fn new(repository: Arc<Repository>, config: AppConfig) -> Self {
        Self { repository, config }
    }

    /// Tracks played often enough to be worth a closer look, most played first.
    pub fn candidates(&self, range: Option<DateRange>) -> Vec<ForensicsCandidate> {
        let records = self.repository.streams.list(&StreamFilters::in_range(range));

        let mut groups: BTreeMap<TrackKey, (usize, u64)> = BTreeMap::new();
        for record in &records {
            if let Some(key) = track_key(record) {
                let group = groups.entry(key).or_insert((0, 0));
                group.0 += 1;
                group.1 += record.ms_played.unwrap_or(0);
            }
        }

        let mut candidates: Vec<ForensicsCandidate> = groups
            .into_iter()
            .filter(|(_, (plays, _))| *plays >= self.config.forensics_min_plays)
            .map(|(track, (play_count, ms))| ForensicsCandidate {
                track,
                play_count,
                hours: ms_to_hours(ms),
            })
            .collect();
        candidates.sort_by_key(|c| (Reverse(c.play_count), Reverse(OrderedFloat(c.hours))));
        candidates.truncate(self.config.forensics_limit);
        candidates
    }

    pub fn analyze(
        &self,
        track: &str,
        artist: &str,
        range: Option<DateRange>,
    ) -> ExplorerResult<TrackForensics> {
        let records: Vec<StreamRecord> = self
            .repository
            .streams
            .list(&StreamFilters {
                date_range: range,
                artist: Some(artist.to_string()),
                track_name: Some(track.to_string()),
                ..Default::default()
            });

        if records.is_empty() {
            return Err(ExplorerError::TrackNotFound {
                track: track.to_string(),
                artist: artist.to_string(),
            });
        }

        let threshold = self.config.skip_threshold_ms;
        let play_count = records.len();
        let skip_count = records.iter().filter(|r| r.is_likely_skipped(threshold)).count();
        let hourly_plays = hourly_plays(&records);

        let mut history: Vec<PlayHistoryEntry> = records
            .iter()
            .map(|r| PlayHistoryEntry {
                timestamp: r.timestamp,
                platform: r.platform.clone(),
                skipped: r.skipped,
                shuffle: r.shuffle,
                offline: r.offline,
                duration_seconds: round_to(r.ms_played.unwrap_or(0) as f64 / 1000.0, 1),
                likely_skipped: r.is_likely_skipped(threshold),
            })
            .collect();
        history.sort_by_key(|entry| Reverse(entry.timestamp));

        debug!(track = %track, artist = %artist, plays = play_count, "Analyzed track");

        Ok(TrackForensics {
            track: TrackKey::new(track, artist),
            play_count,
            full_plays: play_count - skip_count,
            total_hours: metrics_service::total_hours(&records),
            avg_listen_seconds: metrics_service::avg_listen_seconds(&records),
            skip_count,
            skip_rate_pct: percentage(skip_count, play_count),
            daily_plays: daily_plays(&records),
            duration_histogram: duration_histogram(&records, self.config.histogram_bins),
            most_common_hour: most_common_hour(&hourly_plays),
            hourly_plays,
            history,
        })
    }
}

fn daily_plays(records: &[StreamRecord]) -> Vec<DailyPlays> {
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in records {
        *days.entry(record.date()).or_insert(0) += 1;
    }
    days.into_iter()
        .map(|(date, plays)| DailyPlays { date, plays })
        .collect()
}

fn hourly_plays(records: &[StreamRecord]) -> Vec<HourlyPlays> {
    let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
    for record in records {
        *hours.entry(record.hour()).or_insert(0) += 1;
    }
    hours
        .into_iter()
        .map(|(hour, plays)| HourlyPlays { hour, plays })
        .collect()
}

/// Busiest hour; the earliest one wins a tie.
fn most_common_hour(hourly: &[HourlyPlays]) -> Option<u32> {
    hourly
        .iter()
        .max_by_key(|h| (h.plays, Reverse(h.hour)))
        .map(|h| h.hour)
}

/// Equal-width bins over listen durations in seconds.
pub(crate) fn duration_histogram(records: &[StreamRecord], bins: usize) -> Vec<HistogramBin> {
    let seconds: Vec<f64> = records
        .iter()
        .filter_map(|r| r.ms_played)
        .map(|ms| ms as f64 / 1000.0)
        .collect();

    let (Some(&min), Some(&max)) = (
        seconds.iter().min_by_key(|s| OrderedFloat(**s)),
        seconds.iter().max_by_key(|s| OrderedFloat(**s)),
    ) else {
        return Vec::new();
    };

    if bins == 0 {
        return Vec::new();
    }

    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: seconds.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in &seconds {
        let index = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::archive::{ImportReport, ImportedHistory};
    use crate::test_helpers::play;

    fn service_with(records: Vec<StreamRecord>) -> ForensicsService {
        let history = ImportedHistory {
            records,
            report: ImportReport::default(),
        };
        ForensicsService::new(Arc::new(Repository::new(history)), AppConfig::default())
    }

    fn service() -> ForensicsService {
        service_with(vec![
            play("2023-05-01T08:10:00Z", "Teardrop", "Massive Attack", 330_000, "ios"),
            play("2023-05-01T21:00:00Z", "Teardrop", "Massive Attack", 4_000, "ios"),
            play("2023-05-03T08:45:00Z", "Teardrop", "Massive Attack", 330_000, "android"),
            play("2023-05-04T22:00:00Z", "Angel", "Massive Attack", 379_000, "ios"),
            play("2023-05-05T22:00:00Z", "Angel", "Massive Attack", 379_000, "ios"),
            play("2023-05-06T22:00:00Z", "Unfinished", "Massive Attack", 200_000, "ios"),
        ])
    }

    #[test]
    fn test_candidates() {
        let candidates = service().candidates(None);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].track, TrackKey::new("Teardrop", "Massive Attack"));
        assert_eq!(candidates[0].play_count, 3);
        assert_eq!(candidates[0].label(), "Teardrop - Massive Attack (3 plays)");
        assert_eq!(candidates[1].play_count, 2);
    }

    #[test]
    fn test_candidates_limit() {
        let mut config = AppConfig::default();
        config.forensics_limit = 1;
        let service = ForensicsService {
            config,
            ..service()
        };

        assert_eq!(service.candidates(None).len(), 1);
    }

    #[test]
    fn test_analyze() {
        let forensics = service().analyze("Teardrop", "Massive Attack", None).unwrap();

        assert_eq!(forensics.play_count, 3);
        assert_eq!(forensics.full_plays, 2);
        assert_eq!(forensics.skip_count, 1);
        assert!((forensics.skip_rate_pct - 100.0 / 3.0).abs() < 1e-9);
        assert!((forensics.avg_listen_seconds.unwrap() - 664.0 / 3.0).abs() < 1e-9);
        assert_eq!(forensics.daily_plays.len(), 2);
        assert_eq!(forensics.daily_plays[0].plays, 2);
        assert_eq!(forensics.most_common_hour, Some(8));
        assert_eq!(forensics.hourly_plays.len(), 2);

        assert_eq!(forensics.history[0].platform.as_deref(), Some("android"));
        assert!(forensics.history[1].likely_skipped);
        assert_eq!(forensics.history[1].duration_seconds, 4.0);
    }

    #[test]
    fn test_analyze_unknown_track() {
        let err = service().analyze("Teardrop", "Elizabeth Fraser", None).unwrap_err();
        assert!(matches!(err, ExplorerError::TrackNotFound { .. }));
    }

    #[test]
    fn test_histogram_bins() {
        let records = vec![
            play("2023-05-01T08:00:00Z", "t", "a", 0, "ios"),
            play("2023-05-01T09:00:00Z", "t", "a", 10_000, "ios"),
            play("2023-05-01T10:00:00Z", "t", "a", 19_000, "ios"),
            play("2023-05-01T11:00:00Z", "t", "a", 20_000, "ios"),
        ];

        let bins = duration_histogram(&records, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 0, 1, 2]);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[3].upper, 20.0);
    }

    #[test]
    fn test_histogram_single_value() {
        let records = vec![
            play("2023-05-01T08:00:00Z", "t", "a", 5_000, "ios"),
            play("2023-05-02T08:00:00Z", "t", "a", 5_000, "ios"),
        ];

        let bins = duration_histogram(&records, 20);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
        assert!(duration_histogram(&[], 20).is_empty());
    }
}
