pub mod archive;
pub mod stream_repository;

use crate::config::AppConfig;
use crate::services::error_handling::ExplorerResult;
use archive::{ImportReport, ImportedHistory};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Repository {
    pub streams: stream_repository::StreamRepository,
    pub import_report: ImportReport,
}

impl Repository {
    pub fn new(history: ImportedHistory) -> Self {
        Self {
            streams: stream_repository::StreamRepository::new(history.records),
            import_report: history.report,
        }
    }

    /// Import a data export, either a ZIP archive or an unpacked folder.
    /// Extraction is blocking work, so it runs off the async executor.
    pub async fn open(path: &Path, config: &AppConfig) -> anyhow::Result<Self> {
        let path = path.to_path_buf();
        let config = config.clone();

        let history = tokio::task::spawn_blocking(move || -> ExplorerResult<ImportedHistory> {
            if path.is_dir() {
                archive::load_folder(&path, &config)
            } else {
                archive::load_zip(&path, &config)
            }
        })
        .await??;

        Ok(Self::new(history))
    }

    pub fn from_zip_bytes(bytes: Vec<u8>, config: &AppConfig) -> ExplorerResult<Self> {
        archive::load_zip_bytes(bytes, config).map(Self::new)
    }
}
