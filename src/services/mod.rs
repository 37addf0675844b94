pub mod artist_service;
pub mod dashboard_service;
pub mod error_handling;
pub mod export_service;
pub mod forensics_service;
pub mod metrics_service;
pub mod validation;

pub use artist_service::ArtistService;
pub use dashboard_service::DashboardService;
pub use export_service::{ExportFormat, ExportService};
pub use forensics_service::ForensicsService;
pub use metrics_service::MetricsService;
