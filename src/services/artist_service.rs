use crate::config::AppConfig;
use crate::domain::metrics::ArtistProfile;
use crate::domain::period::DateRange;
use crate::repository::Repository;
use crate::repository::stream_repository::StreamFilters;
use crate::services::error_handling::{ExplorerError, ExplorerResult};
use crate::services::metrics_service::{self, MetricsService};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Artist deep dive
#[derive(Clone)]
pub struct ArtistService {
    repository: Arc<Repository>,
    config: AppConfig,
}

impl ArtistService {
    pub fn new(repository: Arc<Repository>, config: AppConfig) -> Self {
        Self { repository, config }
    }

    /// Artists offered for a deep dive: the top artists of the range.
    pub fn artist_options(&self, range: Option<DateRange>) -> Vec<String> {
        let records = self.repository.streams.list(&StreamFilters::in_range(range));
        MetricsService::top_artists(&records, self.config.top_n)
            .into_iter()
            .map(|entry| entry.key)
            .collect()
    }

    pub fn profile(&self, artist: &str, range: Option<DateRange>) -> ExplorerResult<ArtistProfile> {
        let records = self.repository.streams.list(&StreamFilters {
            date_range: range,
            artist: Some(artist.to_string()),
            ..Default::default()
        });

        if records.is_empty() {
            return Err(ExplorerError::ArtistNotFound {
                artist: artist.to_string(),
            });
        }

        let top_songs = metrics_service::rank_by_hours(
            metrics_service::sum_ms_by(&records, |r| r.track_name.clone()),
            self.config.top_n,
        );
        let unique_songs = records
            .iter()
            .filter_map(|r| r.track_name.as_deref())
            .collect::<HashSet<_>>()
            .len();

        debug!(artist = %artist, plays = records.len(), "Built artist profile");

        Ok(ArtistProfile {
            artist: artist.to_string(),
            top_songs,
            total_hours: metrics_service::total_hours(&records),
            total_plays: records.len(),
            unique_songs,
            monthly_listening: metrics_service::monthly_hours(&records),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::archive::{ImportReport, ImportedHistory};
    use crate::test_helpers::play;
    use chrono::NaiveDate;

    fn service() -> ArtistService {
        let records = vec![
            play("2023-01-01T10:00:00Z", "Intro", "Moderat", 120_000, "ios"),
            play("2023-01-03T10:00:00Z", "Bad Kingdom", "Moderat", 240_000, "ios"),
            play("2023-02-03T10:00:00Z", "Bad Kingdom", "Moderat", 240_000, "ios"),
            play("2023-02-04T10:00:00Z", "Reminder", "Moderat", 10_000, "android"),
            play("2023-02-05T10:00:00Z", "Roads", "Portishead", 300_000, "android"),
        ];
        let history = ImportedHistory {
            records,
            report: ImportReport::default(),
        };
        ArtistService::new(Arc::new(Repository::new(history)), AppConfig::default())
    }

    #[test]
    fn test_profile() {
        let profile = service().profile("Moderat", None).unwrap();

        assert_eq!(profile.total_plays, 4);
        assert_eq!(profile.unique_songs, 3);
        assert_eq!(profile.top_songs[0].key, "Bad Kingdom");
        assert!((profile.total_hours - 610_000.0 / 3_600_000.0).abs() < 1e-12);
        assert_eq!(profile.monthly_listening.len(), 2);
    }

    #[test]
    fn test_profile_respects_range() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(),
        )
        .unwrap();

        let profile = service().profile("Moderat", Some(range)).unwrap();
        assert_eq!(profile.total_plays, 2);
        assert_eq!(profile.monthly_listening.len(), 1);
    }

    #[test]
    fn test_unknown_artist() {
        let err = service().profile("Nobody", None).unwrap_err();
        assert!(matches!(err, ExplorerError::ArtistNotFound { .. }));
    }

    #[test]
    fn test_profile_without_track_names() {
        let mut untitled = play("2023-03-01T10:00:00Z", "", "Burial", 200_000, "ios");
        untitled.track_name = None;
        let history = ImportedHistory {
            records: vec![untitled],
            report: ImportReport::default(),
        };
        let service = ArtistService::new(Arc::new(Repository::new(history)), AppConfig::default());

        let profile = service.profile("Burial", None).unwrap();
        assert_eq!(profile.total_plays, 1);
        assert!(profile.top_songs.is_empty());
        assert_eq!(profile.unique_songs, 0);
    }

    #[test]
    fn test_artist_options_follow_hours() {
        assert_eq!(service().artist_options(None), vec!["Moderat", "Portishead"]);
    }
}
