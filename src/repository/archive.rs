use crate::config::AppConfig;
use crate::domain::stream::{RawStreamEntry, Rejection, StreamRecord};
use crate::services::error_handling::{ExplorerError, ExplorerResult, LogHelper, PerformanceMonitor};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;

/// Counters collected while importing a data export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub files: usize,
    pub records: usize,
    pub missing_timestamp: usize,
    pub too_long: usize,
    pub invalid_timestamp: usize,
    pub malformed_entries: usize,
}

impl ImportReport {
    fn merge(mut self, other: ImportReport) -> ImportReport {
        self.files += other.files;
        self.records += other.records;
        self.missing_timestamp += other.missing_timestamp;
        self.too_long += other.too_long;
        self.invalid_timestamp += other.invalid_timestamp;
        self.malformed_entries += other.malformed_entries;
        self
    }

    pub fn skipped(&self) -> usize {
        self.missing_timestamp + self.too_long + self.invalid_timestamp + self.malformed_entries
    }
}

#[derive(Debug, Clone)]
pub struct ImportedHistory {
    /// Sorted by timestamp
    pub records: Vec<StreamRecord>,
    pub report: ImportReport,
}

/// Archive entry names are matched the way the export lays them out,
/// e.g. `Spotify Extended Streaming History/Streaming_History_Audio_2023.json`.
pub fn is_history_entry(name: &str, marker: &str) -> bool {
    name.contains(marker) && name.ends_with(".json")
}

fn folder_pattern(marker: &str) -> ExplorerResult<Regex> {
    Regex::new(&format!(r"^{}.*\.json$", regex::escape(marker))).map_err(|e| ExplorerError::Config {
        message: format!("history_file_marker: {}", e),
    })
}

/// Load a data export ZIP from disk.
#[instrument(skip(config))]
pub fn load_zip(path: &Path, config: &AppConfig) -> ExplorerResult<ImportedHistory> {
    let file = std::fs::File::open(path)?;
    load_archive(file, path, config)
}

/// Load a data export ZIP already held in memory.
pub fn load_zip_bytes(bytes: Vec<u8>, config: &AppConfig) -> ExplorerResult<ImportedHistory> {
    load_archive(Cursor::new(bytes), Path::new("<memory>"), config)
}

fn load_archive<R: Read + Seek>(
    reader: R,
    path: &Path,
    config: &AppConfig,
) -> ExplorerResult<ImportedHistory> {
    let _monitor = PerformanceMonitor::new("load_archive", 5_000);
    let archive_error = |source| ExplorerError::Archive {
        path: path.to_path_buf(),
        source,
    };

    let mut archive = zip::ZipArchive::new(reader).map_err(archive_error)?;
    let mut files = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_error)?;
        if entry.is_dir() || !is_history_entry(entry.name(), &config.history_file_marker) {
            continue;
        }

        let name = entry.name().to_string();
        let mut contents = Vec::with_capacity(initial_capacity(entry.size()));
        entry.read_to_end(&mut contents)?;
        debug!(file = %name, bytes = contents.len(), "Extracted history file");
        files.push((name, contents));
    }

    parse_history_files(files, config)
}

// The header size is only a hint; a corrupt archive can declare anything.
fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOC_BYTES) as usize
}

/// Load the `Streaming_History_Audio_*.json` files of an unpacked export.
#[instrument(skip(config))]
pub fn load_folder(dir: &Path, config: &AppConfig) -> ExplorerResult<ImportedHistory> {
    let pattern = folder_pattern(&config.history_file_marker)?;
    let mut paths: Vec<PathBuf> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.is_match(name));
        if matches && entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let files = paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            std::fs::read(&path).map(|contents| (name, contents))
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    parse_history_files(files, config)
}

fn parse_history_files(
    files: Vec<(String, Vec<u8>)>,
    config: &AppConfig,
) -> ExplorerResult<ImportedHistory> {
    if files.is_empty() {
        return Err(ExplorerError::NoHistoryFiles {
            marker: config.history_file_marker.clone(),
        });
    }

    let parsed = files
        .par_iter()
        .map(|(name, contents)| parse_history_file(name, contents, config.max_play_ms))
        .collect::<ExplorerResult<Vec<_>>>()?;

    let mut records = Vec::new();
    let mut report = ImportReport::default();
    for (file_records, file_report) in parsed {
        records.extend(file_records);
        report = report.merge(file_report);
    }

    if records.is_empty() {
        return Err(ExplorerError::NoValidRecords);
    }

    // Stable, so plays sharing a timestamp keep file order
    records.sort_by_key(|r| r.timestamp);

    if report.skipped() > 0 {
        warn!(
            missing_timestamp = report.missing_timestamp,
            too_long = report.too_long,
            invalid_timestamp = report.invalid_timestamp,
            malformed_entries = report.malformed_entries,
            "Skipped history entries"
        );
    }
    info!(files = report.files, records = report.records, "Imported listening history");

    Ok(ImportedHistory { records, report })
}

fn parse_history_file(
    name: &str,
    contents: &[u8],
    max_play_ms: u64,
) -> ExplorerResult<(Vec<StreamRecord>, ImportReport)> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_slice(contents).map_err(|source| ExplorerError::MalformedFile {
            file: name.to_string(),
            source,
        })?;

    let mut records = Vec::with_capacity(entries.len());
    let mut report = ImportReport {
        files: 1,
        ..Default::default()
    };

    for value in entries {
        let raw: RawStreamEntry = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                LogHelper::log_skipped_entry(name, &e.to_string());
                report.malformed_entries += 1;
                continue;
            }
        };

        match StreamRecord::from_raw(raw, name, max_play_ms) {
            Ok(Ok(record)) => records.push(record),
            Ok(Err(Rejection::MissingTimestamp)) => report.missing_timestamp += 1,
            Ok(Err(Rejection::TooLong)) => report.too_long += 1,
            Err(e) => {
                LogHelper::log_skipped_entry(name, &e.to_string());
                report.invalid_timestamp += 1;
            }
        }
    }

    report.records = records.len();
    Ok((records, report))
}
