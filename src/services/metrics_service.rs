use crate::config::AppConfig;
use crate::domain::metrics::{
    ListeningMetrics, MonthlyHours, PlatformShare, RankedEntry, RecentPlay, SkipStats,
    SkippedTrack, TrackKey,
};
use crate::domain::period::MonthPeriod;
use crate::domain::stream::StreamRecord;
use crate::utils::{ms_to_hours, percentage, round_to};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Sum `ms_played` per key; records without a key are left out of the grouping.
pub(crate) fn sum_ms_by<'a, K, F>(records: &'a [StreamRecord], key: F) -> BTreeMap<K, u64>
where
    K: Ord,
    F: Fn(&'a StreamRecord) -> Option<K>,
{
    let mut totals = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            *totals.entry(k).or_insert(0) += record.ms_played.unwrap_or(0);
        }
    }
    totals
}

/// The `n` largest totals in hours. Equal totals keep key order.
pub(crate) fn rank_by_hours<K: Ord>(totals: BTreeMap<K, u64>, n: usize) -> Vec<RankedEntry<K>> {
    let mut ranked: Vec<RankedEntry<K>> = totals
        .into_iter()
        .map(|(key, ms)| RankedEntry {
            key,
            hours: ms_to_hours(ms),
        })
        .collect();
    ranked.sort_by_key(|entry| Reverse(OrderedFloat(entry.hours)));
    ranked.truncate(n);
    ranked
}

pub(crate) fn monthly_hours(records: &[StreamRecord]) -> Vec<MonthlyHours> {
    sum_ms_by(records, |r| Some(r.month()))
        .into_iter()
        .map(|(month, ms): (MonthPeriod, u64)| MonthlyHours {
            month,
            hours: ms_to_hours(ms),
        })
        .collect()
}

pub(crate) fn total_hours(records: &[StreamRecord]) -> f64 {
    ms_to_hours(records.iter().filter_map(|r| r.ms_played).sum())
}

/// Mean of the plays that carry a duration, in seconds.
pub(crate) fn avg_listen_seconds(records: &[StreamRecord]) -> Option<f64> {
    let durations: Vec<u64> = records.iter().filter_map(|r| r.ms_played).collect();
    if durations.is_empty() {
        return None;
    }
    let sum: u64 = durations.iter().sum();
    Some(sum as f64 / durations.len() as f64 / 1000.0)
}

pub(crate) fn track_key(record: &StreamRecord) -> Option<TrackKey> {
    Some(TrackKey::new(record.track_name.clone()?, record.artist.clone()?))
}

#[derive(Debug, Clone)]
pub struct MetricsService {
    config: AppConfig,
}

impl MetricsService {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Key metrics over a slice of plays
    pub fn calculate_metrics(&self, records: &[StreamRecord]) -> ListeningMetrics {
        let metrics = ListeningMetrics {
            total_hours: total_hours(records),
            total_streams: records.len(),
            unique_artists: Self::unique_artists(records),
            unique_tracks: Self::unique_tracks(records),
            top_artists: Self::top_artists(records, self.config.top_n),
            top_tracks: Self::top_tracks(records, self.config.top_n),
            monthly_listening: monthly_hours(records),
            most_skipped: self.most_skipped(records, self.config.top_n),
        };

        debug!(
            streams = metrics.total_streams,
            hours = metrics.total_hours,
            "Calculated listening metrics"
        );
        metrics
    }

    pub fn unique_artists(records: &[StreamRecord]) -> usize {
        records
            .iter()
            .filter_map(|r| r.artist.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct track names; equal names by different artists count once.
    pub fn unique_tracks(records: &[StreamRecord]) -> usize {
        records
            .iter()
            .filter_map(|r| r.track_name.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn top_artists(records: &[StreamRecord], n: usize) -> Vec<RankedEntry<String>> {
        rank_by_hours(sum_ms_by(records, |r| r.artist.clone()), n)
    }

    pub fn top_tracks(records: &[StreamRecord], n: usize) -> Vec<RankedEntry<TrackKey>> {
        rank_by_hours(sum_ms_by(records, track_key), n)
    }

    /// Tracks most often dropped before the skip threshold.
    pub fn most_skipped(&self, records: &[StreamRecord], n: usize) -> Vec<SkippedTrack> {
        let mut groups: BTreeMap<TrackKey, (usize, u64)> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.is_likely_skipped(self.config.skip_threshold_ms))
        {
            if let Some(key) = track_key(record) {
                let group = groups.entry(key).or_insert((0, 0));
                group.0 += 1;
                group.1 += record.ms_played.unwrap_or(0);
            }
        }

        let mut skipped: Vec<SkippedTrack> = groups
            .into_iter()
            .filter(|(_, (count, _))| *count >= self.config.min_skip_count)
            .map(|(track, (skip_count, total_ms))| SkippedTrack {
                track,
                skip_count,
                avg_listen_ms: total_ms as f64 / skip_count as f64,
            })
            .collect();
        skipped.sort_by_key(|s| Reverse(s.skip_count));
        skipped.truncate(n);
        skipped
    }

    /// Hours per platform, largest first, with each platform's share.
    pub fn platform_usage(records: &[StreamRecord]) -> Vec<PlatformShare> {
        let totals = sum_ms_by(records, |r| r.platform.clone());
        let all_ms: u64 = totals.values().sum();

        let mut shares: Vec<PlatformShare> = totals
            .into_iter()
            .map(|(platform, ms)| PlatformShare {
                platform,
                hours: ms_to_hours(ms),
                percent: if all_ms == 0 {
                    0.0
                } else {
                    ms as f64 / all_ms as f64 * 100.0
                },
            })
            .collect();
        shares.sort_by_key(|share| Reverse(OrderedFloat(share.hours)));
        shares
    }

    pub fn skip_stats(&self, records: &[StreamRecord]) -> SkipStats {
        let skipped = records
            .iter()
            .filter(|r| r.is_likely_skipped(self.config.skip_threshold_ms))
            .count();

        SkipStats {
            skip_rate_pct: percentage(skipped, records.len()),
            avg_listen_seconds: avg_listen_seconds(records),
        }
    }

    /// Latest plays first.
    pub fn recent_activity(records: &[StreamRecord], limit: usize) -> Vec<RecentPlay> {
        let mut latest: Vec<&StreamRecord> = records.iter().collect();
        latest.sort_by_key(|r| Reverse(r.timestamp));
        latest
            .into_iter()
            .take(limit)
            .map(|r| RecentPlay {
                timestamp: r.timestamp,
                track_name: r.track_name.clone(),
                artist: r.artist.clone(),
                minutes_played: round_to(r.ms_played.unwrap_or(0) as f64 / 60_000.0, 2),
            })
            .collect()
    }
}
