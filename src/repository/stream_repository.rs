use crate::domain::period::DateRange;
use crate::domain::stream::StreamRecord;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StreamFilters {
    pub date_range: Option<DateRange>,
    pub artist: Option<String>,
    pub track_name: Option<String>,
    pub platform: Option<String>,
    pub limit: Option<usize>,
}

impl StreamFilters {
    pub fn in_range(date_range: Option<DateRange>) -> Self {
        Self {
            date_range,
            ..Default::default()
        }
    }

    fn matches(&self, record: &StreamRecord) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(record.date()) {
                return false;
            }
        }
        if let Some(artist) = &self.artist {
            if record.artist.as_deref() != Some(artist.as_str()) {
                return false;
            }
        }
        if let Some(track) = &self.track_name {
            if record.track_name.as_deref() != Some(track.as_str()) {
                return false;
            }
        }
        if let Some(platform) = &self.platform {
            if record.platform.as_deref() != Some(platform.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Imported plays, held in timestamp order.
#[derive(Debug, Clone)]
pub struct StreamRepository {
    records: Arc<Vec<StreamRecord>>,
}

impl StreamRepository {
    pub fn new(mut records: Vec<StreamRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self {
            records: Arc::new(records),
        }
    }

    pub fn all(&self) -> &[StreamRecord] {
        &self.records
    }

    pub fn list(&self, filters: &StreamFilters) -> Vec<StreamRecord> {
        let matching = self.records.iter().filter(|r| filters.matches(r)).cloned();
        match filters.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// First and last play date.
    pub fn date_bounds(&self) -> Option<DateRange> {
        let first = self.records.first()?.date();
        let last = self.records.last()?.date();
        DateRange::new(first, last).ok()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stream::parse_timestamp;
    use chrono::NaiveDate;

    fn record(ts: &str, artist: &str, track: &str, platform: &str) -> StreamRecord {
        StreamRecord {
            timestamp: parse_timestamp(ts).unwrap(),
            platform: Some(platform.to_string()),
            ms_played: Some(60_000),
            track_name: Some(track.to_string()),
            artist: Some(artist.to_string()),
            album: None,
            spotify_uri: None,
            skipped: None,
            shuffle: None,
            offline: None,
            incognito_mode: None,
            source_file: "test.json".to_string(),
        }
    }

    fn repository() -> StreamRepository {
        StreamRepository::new(vec![
            record("2023-03-10T08:00:00Z", "X", "One", "ios"),
            record("2023-01-05T08:00:00Z", "Y", "Two", "android"),
            record("2023-02-20T23:59:59Z", "X", "Three", "ios"),
        ])
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_records_are_kept_in_time_order() {
        let repo = repository();
        let tracks: Vec<_> = repo.all().iter().map(|r| r.track_name.clone().unwrap()).collect();
        assert_eq!(tracks, vec!["Two", "Three", "One"]);
    }

    #[test]
    fn test_date_bounds() {
        let bounds = repository().date_bounds().unwrap();
        assert_eq!(bounds.start(), date(2023, 1, 5));
        assert_eq!(bounds.end(), date(2023, 3, 10));
        assert!(StreamRepository::new(Vec::new()).date_bounds().is_none());
    }

    #[test]
    fn test_filter_by_range_and_artist() {
        let repo = repository();
        let range = DateRange::new(date(2023, 2, 1), date(2023, 2, 20)).unwrap();

        let in_range = repo.list(&StreamFilters::in_range(Some(range)));
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].track_name.as_deref(), Some("Three"));

        let by_artist = repo.list(&StreamFilters {
            artist: Some("X".to_string()),
            ..Default::default()
        });
        assert_eq!(by_artist.len(), 2);
    }

    #[test]
    fn test_filter_by_platform_with_limit() {
        let repo = repository();
        let filters = StreamFilters {
            platform: Some("ios".to_string()),
            limit: Some(1),
            ..Default::default()
        };

        let results = repo.list(&filters);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].track_name.as_deref(), Some("Three"));
    }
}
