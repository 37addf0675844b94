use crate::config::AppConfig;
use crate::domain::metrics::{DashboardReport, QuickStats};
use crate::domain::period::DateRange;
use crate::repository::Repository;
use crate::repository::stream_repository::StreamFilters;
use crate::services::error_handling::{ExplorerError, ExplorerResult};
use crate::services::metrics_service::MetricsService;
use std::sync::Arc;
use tracing::{info, instrument};

/// Assembles the session view: quick stats, range metrics and tables.
#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<Repository>,
    config: AppConfig,
    metrics: MetricsService,
}

impl DashboardService {
    pub fn new(repository: Arc<Repository>, config: AppConfig) -> Self {
        Self {
            metrics: MetricsService::new(config.clone()),
            repository,
            config,
        }
    }

    /// Dates covered by the imported history.
    pub fn available_range(&self) -> ExplorerResult<DateRange> {
        self.repository
            .streams
            .date_bounds()
            .ok_or(ExplorerError::NoValidRecords)
    }

    /// Build the dashboard for `range`; the whole history when `None`.
    #[instrument(skip(self))]
    pub fn build(&self, range: Option<DateRange>) -> ExplorerResult<DashboardReport> {
        let available = self.available_range()?;
        let range = range.unwrap_or(available);

        let quick_stats = QuickStats::from(&self.metrics.calculate_metrics(self.repository.streams.all()));

        let records = self.repository.streams.list(&StreamFilters::in_range(Some(range)));
        if records.is_empty() {
            return Err(ExplorerError::EmptyRange);
        }

        let metrics = self.metrics.calculate_metrics(&records);
        let artist_options = metrics.top_artists.iter().map(|a| a.key.clone()).collect();

        info!(
            range = %range,
            streams = metrics.total_streams,
            "Built dashboard"
        );

        Ok(DashboardReport {
            quick_stats,
            available,
            range,
            platform_usage: MetricsService::platform_usage(&records),
            skip_stats: self.metrics.skip_stats(&records),
            recent_activity: MetricsService::recent_activity(&records, self.config.recent_limit),
            artist_options,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::archive::{ImportReport, ImportedHistory};
    use crate::test_helpers::play;
    use chrono::NaiveDate;

    fn service() -> DashboardService {
        let records = vec![
            play("2022-12-30T10:00:00Z", "Windowlicker", "Aphex Twin", 360_000, "osx"),
            play("2023-01-02T10:00:00Z", "Xtal", "Aphex Twin", 290_000, "osx"),
            play("2023-01-03T10:00:00Z", "Avril 14th", "Aphex Twin", 5_000, "ios"),
            play("2023-01-04T10:00:00Z", "Glue", "Bicep", 269_000, "ios"),
        ];
        let history = ImportedHistory {
            records,
            report: ImportReport::default(),
        };
        DashboardService::new(Arc::new(Repository::new(history)), AppConfig::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_history_dashboard() {
        let report = service().build(None).unwrap();

        assert_eq!(report.range, report.available);
        assert_eq!(report.available.start(), date(2022, 12, 30));
        assert_eq!(report.quick_stats.total_streams, 4);
        assert_eq!(report.metrics.total_streams, 4);
        assert_eq!(report.artist_options, vec!["Aphex Twin", "Bicep"]);
        assert_eq!(report.recent_activity[0].track_name.as_deref(), Some("Glue"));
        assert!((report.skip_stats.skip_rate_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_range_changes_metrics_but_not_quick_stats() {
        let range = DateRange::new(date(2023, 1, 1), date(2023, 1, 3)).unwrap();
        let report = service().build(Some(range)).unwrap();

        assert_eq!(report.quick_stats.total_streams, 4);
        assert_eq!(report.metrics.total_streams, 2);
        assert_eq!(report.platform_usage.len(), 2);
    }

    #[test]
    fn test_empty_range() {
        let range = DateRange::new(date(2022, 12, 31), date(2023, 1, 1)).unwrap();
        let err = service().build(Some(range)).unwrap_err();
        assert!(matches!(err, ExplorerError::EmptyRange));
    }
}
