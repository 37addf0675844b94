use crate::domain::metrics::{
    ArtistProfile, DashboardReport, ForensicsCandidate, MonthlyHours, TrackForensics,
};
use crate::domain::stream::StreamRecord;
use crate::utils::table::{Align, TextTable, bar};
use crate::utils::{format_thousands, round_to};
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use csv::Writer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Text,
    Markdown,
    Json,
}

/// One row of the combined / per-year CSV files.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    platform: Option<&'a str>,
    ms_played: Option<u64>,
    track_name: Option<&'a str>,
    artist: Option<&'a str>,
    album: Option<&'a str>,
    spotify_uri: Option<&'a str>,
    skipped: Option<bool>,
    shuffle: Option<bool>,
    offline: Option<bool>,
    incognito_mode: Option<bool>,
    source_file: &'a str,
}

impl<'a> From<&'a StreamRecord> for CsvRow<'a> {
    fn from(record: &'a StreamRecord) -> Self {
        CsvRow {
            timestamp: record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            platform: record.platform.as_deref(),
            ms_played: record.ms_played,
            track_name: record.track_name.as_deref(),
            artist: record.artist.as_deref(),
            album: record.album.as_deref(),
            spotify_uri: record.spotify_uri.as_deref(),
            skipped: record.skipped,
            shuffle: record.shuffle,
            offline: record.offline,
            incognito_mode: record.incognito_mode,
            source_file: &record.source_file,
        }
    }
}

/// Result of writing one yearly CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearExport {
    pub year: i32,
    pub path: PathBuf,
    pub rows: usize,
}

pub struct ExportService;

impl ExportService {
    /// Export plays to CSV, in the order given
    pub fn export_to_csv(records: &[StreamRecord]) -> Result<String> {
        let mut wtr = Writer::from_writer(vec![]);
        write_rows(&mut wtr, records.iter())?;
        let data = wtr.into_inner().context("flushing CSV buffer")?;
        Ok(String::from_utf8(data)?)
    }

    /// All plays in one CSV file. Returns the number of rows written.
    pub fn export_combined_csv(records: &[StreamRecord], path: &Path) -> Result<usize> {
        let mut sorted: Vec<&StreamRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);

        let mut wtr = Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_rows(&mut wtr, sorted.into_iter())?;
        wtr.flush()?;

        info!(rows = records.len(), path = %path.display(), "Wrote combined history");
        Ok(records.len())
    }

    /// One `spotify_history_<year>.csv` per calendar year inside `dir`.
    pub fn export_by_year(records: &[StreamRecord], dir: &Path) -> Result<Vec<YearExport>> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let mut by_year: BTreeMap<i32, Vec<&StreamRecord>> = BTreeMap::new();
        for record in records {
            by_year.entry(record.year()).or_default().push(record);
        }

        let mut exports = Vec::with_capacity(by_year.len());
        for (year, mut rows) in by_year {
            rows.sort_by_key(|r| r.timestamp);
            let path = dir.join(format!("spotify_history_{}.csv", year));

            let mut wtr = Writer::from_path(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_rows(&mut wtr, rows.iter().copied())?;
            wtr.flush()?;

            info!(year = year, rows = rows.len(), path = %path.display(), "Wrote yearly history");
            exports.push(YearExport {
                year,
                path,
                rows: rows.len(),
            });
        }

        Ok(exports)
    }

    pub fn render_dashboard(report: &DashboardReport, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            ExportFormat::Markdown => Ok(dashboard_markdown(report)),
            ExportFormat::Text => Ok(dashboard_text(report)),
        }
    }

    pub fn render_artist(profile: &ArtistProfile, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(profile)?),
            ExportFormat::Markdown => Ok(artist_markdown(profile)),
            ExportFormat::Text => Ok(artist_text(profile)),
        }
    }

    pub fn render_candidates(candidates: &[ForensicsCandidate], format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(candidates)?),
            ExportFormat::Markdown => {
                let mut output = String::from("| Track | Artist | Plays | Hours |\n|---|---|---:|---:|\n");
                for c in candidates {
                    let _ = writeln!(
                        output,
                        "| {} | {} | {} | {:.2} |",
                        md_escape(&c.track.track),
                        md_escape(&c.track.artist),
                        c.play_count,
                        c.hours
                    );
                }
                Ok(output)
            }
            ExportFormat::Text => {
                if candidates.is_empty() {
                    return Ok("No tracks with multiple plays found for forensics analysis.\n".to_string());
                }
                let mut table = TextTable::new(&[
                    ("Track", Align::Left),
                    ("Artist", Align::Left),
                    ("Plays", Align::Right),
                    ("Hours", Align::Right),
                ]);
                for c in candidates {
                    table.push(vec![
                        c.track.track.clone(),
                        c.track.artist.clone(),
                        format_thousands(c.play_count),
                        format!("{:.2}", c.hours),
                    ]);
                }
                Ok(table.render())
            }
        }
    }

    pub fn render_forensics(forensics: &TrackForensics, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(forensics)?),
            ExportFormat::Markdown => Ok(forensics_markdown(forensics)),
            ExportFormat::Text => Ok(forensics_text(forensics)),
        }
    }

    /// Save rendered output to file
    pub fn export_to_file(content: &str, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn write_rows<'a, W: Write>(
    wtr: &mut Writer<W>,
    records: impl Iterator<Item = &'a StreamRecord>,
) -> Result<()> {
    // Header comes from the first serialized row; an empty export still gets one
    let mut wrote_any = false;
    for record in records {
        wtr.serialize(CsvRow::from(record))?;
        wrote_any = true;
    }
    if !wrote_any {
        wtr.write_record([
            "timestamp",
            "platform",
            "ms_played",
            "track_name",
            "artist",
            "album",
            "spotify_uri",
            "skipped",
            "shuffle",
            "offline",
            "incognito_mode",
            "source_file",
        ])?;
    }
    Ok(())
}

fn section(output: &mut String, title: &str) {
    let _ = writeln!(output, "\n{}\n{}", title, "=".repeat(title.chars().count()));
}

fn monthly_table(monthly: &[MonthlyHours]) -> TextTable {
    let max = monthly.iter().map(|m| m.hours).fold(0.0, f64::max);
    let mut table = TextTable::new(&[
        ("Month", Align::Left),
        ("Hours", Align::Right),
        ("", Align::Left),
    ])
    .with_max_width(BAR_WIDTH);
    for m in monthly {
        table.push(vec![
            m.month.to_string(),
            format!("{:.1}", m.hours),
            bar(m.hours, max, BAR_WIDTH),
        ]);
    }
    table
}

fn format_seconds(seconds: Option<f64>) -> String {
    seconds
        .map(|s| format!("{:.0} seconds", s))
        .unwrap_or_else(|| "n/a".to_string())
}

fn dashboard_text(report: &DashboardReport) -> String {
    let mut output = String::new();
    let stats = &report.quick_stats;
    let metrics = &report.metrics;

    let _ = writeln!(output, "Processed {} streams ({})", format_thousands(stats.total_streams), report.available);

    section(&mut output, "Quick Stats");
    let _ = writeln!(output, "  Total Listening Time  {:.1} hours", stats.total_hours);
    let _ = writeln!(output, "  Total Streams         {}", format_thousands(stats.total_streams));
    let _ = writeln!(output, "  Unique Artists        {}", format_thousands(stats.unique_artists));
    let _ = writeln!(output, "  Unique Tracks         {}", format_thousands(stats.unique_tracks));

    let _ = writeln!(
        output,
        "\nSelected range: {} ({} streams, {:.1} hours)",
        report.range,
        format_thousands(metrics.total_streams),
        metrics.total_hours
    );

    section(&mut output, &format!("Top {} Artists", metrics.top_artists.len()));
    let mut artists = TextTable::new(&[("#", Align::Right), ("Artist", Align::Left), ("Hours", Align::Right)]);
    for (i, a) in metrics.top_artists.iter().enumerate() {
        artists.push(vec![(i + 1).to_string(), a.key.clone(), format!("{:.2}", a.hours)]);
    }
    output.push_str(&artists.render());

    section(&mut output, &format!("Top {} Tracks", metrics.top_tracks.len()));
    let mut tracks = TextTable::new(&[
        ("#", Align::Right),
        ("Track", Align::Left),
        ("Artist", Align::Left),
        ("Hours", Align::Right),
    ]);
    for (i, t) in metrics.top_tracks.iter().enumerate() {
        tracks.push(vec![
            (i + 1).to_string(),
            t.key.track.clone(),
            t.key.artist.clone(),
            format!("{:.2}", t.hours),
        ]);
    }
    output.push_str(&tracks.render());

    section(&mut output, "Monthly Listening Hours");
    output.push_str(&monthly_table(&metrics.monthly_listening).render());

    section(&mut output, "Platform Usage");
    match report.platform_usage.as_slice() {
        [] => output.push_str("  No platform information\n"),
        [only] => {
            let _ = writeln!(output, "  All listening on: {}", only.platform);
        }
        shares => {
            let mut platforms = TextTable::new(&[
                ("Platform", Align::Left),
                ("Hours", Align::Right),
                ("Share", Align::Right),
            ]);
            for p in shares {
                platforms.push(vec![
                    p.platform.clone(),
                    format!("{:.1}", p.hours),
                    format!("{:.1}%", p.percent),
                ]);
            }
            output.push_str(&platforms.render());
        }
    }

    section(&mut output, "Skip Rate Analysis");
    let _ = writeln!(output, "  Estimated Skip Rate  {:.1}%", report.skip_stats.skip_rate_pct);
    let _ = writeln!(
        output,
        "  Average Listen Time  {}",
        format_seconds(report.skip_stats.avg_listen_seconds)
    );

    section(&mut output, "Most Skipped");
    if metrics.most_skipped.is_empty() {
        output.push_str("  No frequently skipped tracks found.\n");
    } else {
        let mut skipped = TextTable::new(&[
            ("Track", Align::Left),
            ("Artist", Align::Left),
            ("Times Skipped", Align::Right),
            ("Avg Listen Time (sec)", Align::Right),
        ]);
        for s in &metrics.most_skipped {
            skipped.push(vec![
                s.track.track.clone(),
                s.track.artist.clone(),
                s.skip_count.to_string(),
                format!("{:.1}", round_to(s.avg_listen_seconds(), 1)),
            ]);
        }
        output.push_str(&skipped.render());
    }

    section(&mut output, "Artist Explorer");
    if report.artist_options.is_empty() {
        output.push_str("  No artists in selected range\n");
    } else {
        let _ = writeln!(output, "  {}", report.artist_options.join(", "));
    }

    section(&mut output, "Recent Activity");
    let mut recent = TextTable::new(&[
        ("Timestamp", Align::Left),
        ("Track", Align::Left),
        ("Artist", Align::Left),
        ("Minutes", Align::Right),
    ]);
    for r in &report.recent_activity {
        recent.push(vec![
            r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.track_name.clone().unwrap_or_default(),
            r.artist.clone().unwrap_or_default(),
            format!("{:.2}", r.minutes_played),
        ]);
    }
    output.push_str(&recent.render());

    output
}

fn md_escape(text: &str) -> String {
    text.replace('|', "\\|")
}

fn dashboard_markdown(report: &DashboardReport) -> String {
    let mut output = String::new();
    let stats = &report.quick_stats;
    let metrics = &report.metrics;

    output.push_str("# Listening History\n\n");
    let _ = writeln!(output, "History covers {}; selected range {}.\n", report.available, report.range);

    output.push_str("## Quick Stats\n\n");
    let _ = writeln!(output, "- **Total Listening Time:** {:.1} hours", stats.total_hours);
    let _ = writeln!(output, "- **Total Streams:** {}", format_thousands(stats.total_streams));
    let _ = writeln!(output, "- **Unique Artists:** {}", format_thousands(stats.unique_artists));
    let _ = writeln!(output, "- **Unique Tracks:** {}", format_thousands(stats.unique_tracks));

    output.push_str("\n## Top Artists\n\n| Artist | Hours Listened |\n|---|---:|\n");
    for a in &metrics.top_artists {
        let _ = writeln!(output, "| {} | {:.2} |", md_escape(&a.key), a.hours);
    }

    output.push_str("\n## Top Tracks\n\n| Track | Artist | Hours Listened |\n|---|---|---:|\n");
    for t in &metrics.top_tracks {
        let _ = writeln!(
            output,
            "| {} | {} | {:.2} |",
            md_escape(&t.key.track),
            md_escape(&t.key.artist),
            t.hours
        );
    }

    output.push_str("\n## Monthly Listening\n\n| Month | Hours |\n|---|---:|\n");
    for m in &metrics.monthly_listening {
        let _ = writeln!(output, "| {} | {:.1} |", m.month, m.hours);
    }

    output.push_str("\n## Platform Usage\n\n");
    match report.platform_usage.as_slice() {
        [] => output.push_str("No platform information\n"),
        [only] => {
            let _ = writeln!(output, "All listening on: {}", md_escape(&only.platform));
        }
        shares => {
            output.push_str("| Platform | Hours | Share |\n|---|---:|---:|\n");
            for p in shares {
                let _ = writeln!(output, "| {} | {:.1} | {:.1}% |", md_escape(&p.platform), p.hours, p.percent);
            }
        }
    }

    output.push_str("\n## Skip Rate Analysis\n\n");
    let _ = writeln!(output, "- **Estimated Skip Rate:** {:.1}%", report.skip_stats.skip_rate_pct);
    let _ = writeln!(
        output,
        "- **Average Listen Time:** {}",
        format_seconds(report.skip_stats.avg_listen_seconds)
    );

    output.push_str("\n## Most Skipped\n\n");
    if metrics.most_skipped.is_empty() {
        output.push_str("No frequently skipped tracks found.\n");
    } else {
        output.push_str("| Track | Artist | Times Skipped | Avg Listen Time (sec) |\n|---|---|---:|---:|\n");
        for s in &metrics.most_skipped {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.1} |",
                md_escape(&s.track.track),
                md_escape(&s.track.artist),
                s.skip_count,
                round_to(s.avg_listen_seconds(), 1)
            );
        }
    }

    output.push_str("\n## Artist Explorer\n\n");
    if report.artist_options.is_empty() {
        output.push_str("No artists in selected range\n");
    }
    for artist in &report.artist_options {
        let _ = writeln!(output, "- {}", md_escape(artist));
    }

    output.push_str("\n## Recent Activity\n\n| Timestamp | Track | Artist | Minutes |\n|---|---|---|---:|\n");
    for r in &report.recent_activity {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.2} |",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            md_escape(r.track_name.as_deref().unwrap_or("")),
            md_escape(r.artist.as_deref().unwrap_or("")),
            r.minutes_played
        );
    }

    output
}

fn no_tracks_message(artist: &str) -> String {
    format!("No tracks found for {} in the selected date range.", artist)
}

fn artist_text(profile: &ArtistProfile) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", profile.artist);
    let _ = writeln!(output, "  Total Hours Listened  {:.1}", profile.total_hours);
    let _ = writeln!(output, "  Total Plays           {}", format_thousands(profile.total_plays));
    let _ = writeln!(output, "  Unique Songs          {}", format_thousands(profile.unique_songs));

    section(&mut output, &format!("Top Songs by {}", profile.artist));
    if profile.top_songs.is_empty() {
        let _ = writeln!(output, "  {}", no_tracks_message(&profile.artist));
    } else {
        let mut songs = TextTable::new(&[("#", Align::Right), ("Track", Align::Left), ("Hours", Align::Right)]);
        for (i, s) in profile.top_songs.iter().enumerate() {
            songs.push(vec![(i + 1).to_string(), s.key.clone(), format!("{:.2}", s.hours)]);
        }
        output.push_str(&songs.render());
    }

    if profile.monthly_listening.len() > 1 {
        section(&mut output, "Monthly Listening Pattern");
        output.push_str(&monthly_table(&profile.monthly_listening).render());
    }
    output
}

fn artist_markdown(profile: &ArtistProfile) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}\n", md_escape(&profile.artist));
    let _ = writeln!(output, "- **Total Hours Listened:** {:.1}", profile.total_hours);
    let _ = writeln!(output, "- **Total Plays:** {}", format_thousands(profile.total_plays));
    let _ = writeln!(output, "- **Unique Songs:** {}", format_thousands(profile.unique_songs));

    output.push_str("\n## Top Songs\n\n");
    if profile.top_songs.is_empty() {
        let _ = writeln!(output, "{}", no_tracks_message(&md_escape(&profile.artist)));
    } else {
        output.push_str("| Track | Hours |\n|---|---:|\n");
        for s in &profile.top_songs {
            let _ = writeln!(output, "| {} | {:.2} |", md_escape(&s.key), s.hours);
        }
    }

    if profile.monthly_listening.len() > 1 {
        output.push_str("\n## Monthly Hours\n\n| Month | Hours |\n|---|---:|\n");
        for m in &profile.monthly_listening {
            let _ = writeln!(output, "| {} | {:.1} |", m.month, m.hours);
        }
    }
    output
}

fn flag(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn forensics_text(forensics: &TrackForensics) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}\n  by {}", forensics.track.track, forensics.track.artist);
    let _ = writeln!(output, "  Total Plays          {}", format_thousands(forensics.full_plays));
    let _ = writeln!(output, "  Total Listen Time    {:.1} hours", forensics.total_hours);
    let _ = writeln!(output, "  Average Listen Time  {}", format_seconds(forensics.avg_listen_seconds));
    let _ = writeln!(output, "  Skip Rate            {:.1}%", forensics.skip_rate_pct);

    section(&mut output, "Play Timeline");
    if forensics.daily_plays.len() > 1 {
        let max = forensics.daily_plays.iter().map(|d| d.plays).max().unwrap_or(0) as f64;
        let mut days = TextTable::new(&[("Date", Align::Left), ("Plays", Align::Right), ("", Align::Left)])
            .with_max_width(BAR_WIDTH);
        for d in &forensics.daily_plays {
            days.push(vec![d.date.to_string(), d.plays.to_string(), bar(d.plays as f64, max, BAR_WIDTH)]);
        }
        output.push_str(&days.render());
    } else {
        output.push_str("  Only played on one day\n");
    }

    section(&mut output, "Listen Duration Pattern");
    let max = forensics.duration_histogram.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    let mut histogram = TextTable::new(&[("Seconds", Align::Left), ("Plays", Align::Right), ("", Align::Left)])
        .with_max_width(BAR_WIDTH);
    for b in &forensics.duration_histogram {
        histogram.push(vec![
            format!("{:.0}-{:.0}", b.lower, b.upper),
            b.count.to_string(),
            bar(b.count as f64, max, BAR_WIDTH),
        ]);
    }
    output.push_str(&histogram.render());

    section(&mut output, "Listening Patterns");
    if let Some(hour) = forensics.most_common_hour {
        let _ = writeln!(output, "  Most commonly played at hour: {}:00", hour);
    }
    if forensics.hourly_plays.len() > 1 {
        let max = forensics.hourly_plays.iter().map(|h| h.plays).max().unwrap_or(0) as f64;
        let mut hours = TextTable::new(&[("Hour", Align::Right), ("Plays", Align::Right), ("", Align::Left)])
            .with_max_width(BAR_WIDTH);
        for h in &forensics.hourly_plays {
            hours.push(vec![format!("{:02}:00", h.hour), h.plays.to_string(), bar(h.plays as f64, max, BAR_WIDTH)]);
        }
        output.push_str(&hours.render());
    }

    section(&mut output, "Complete Play History");
    let mut history = TextTable::new(&[
        ("Timestamp", Align::Left),
        ("Platform", Align::Left),
        ("Skipped", Align::Left),
        ("Shuffle", Align::Left),
        ("Offline", Align::Left),
        ("Duration (sec)", Align::Right),
        ("Likely Skipped", Align::Left),
    ]);
    for h in &forensics.history {
        history.push(vec![
            h.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            h.platform.clone().unwrap_or_default(),
            flag(h.skipped),
            flag(h.shuffle),
            flag(h.offline),
            format!("{:.1}", h.duration_seconds),
            h.likely_skipped.to_string(),
        ]);
    }
    output.push_str(&history.render());

    output
}

fn forensics_markdown(forensics: &TrackForensics) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}\n\n**by {}**\n", md_escape(&forensics.track.track), md_escape(&forensics.track.artist));
    let _ = writeln!(output, "- **Total Plays:** {}", format_thousands(forensics.full_plays));
    let _ = writeln!(output, "- **Total Listen Time:** {:.1} hours", forensics.total_hours);
    let _ = writeln!(output, "- **Average Listen Time:** {}", format_seconds(forensics.avg_listen_seconds));
    let _ = writeln!(output, "- **Skip Rate:** {:.1}%", forensics.skip_rate_pct);

    output.push_str("\n## Daily Plays\n\n| Date | Plays |\n|---|---:|\n");
    for d in &forensics.daily_plays {
        let _ = writeln!(output, "| {} | {} |", d.date, d.plays);
    }

    output.push_str("\n## Listen Duration Pattern\n\n| Seconds | Plays |\n|---|---:|\n");
    for b in &forensics.duration_histogram {
        let _ = writeln!(output, "| {:.0}-{:.0} | {} |", b.lower, b.upper, b.count);
    }

    output.push_str("\n## Listening Patterns\n\n");
    if let Some(hour) = forensics.most_common_hour {
        let _ = writeln!(output, "Most commonly played at hour: {}:00\n", hour);
    }
    output.push_str("| Hour | Plays |\n|---:|---:|\n");
    for h in &forensics.hourly_plays {
        let _ = writeln!(output, "| {:02}:00 | {} |", h.hour, h.plays);
    }

    output.push_str(
        "\n## Complete Play History\n\n| Timestamp | Platform | Skipped | Shuffle | Offline | Duration (sec) | Likely Skipped |\n|---|---|---|---|---|---:|---|\n",
    );
    for h in &forensics.history {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {:.1} | {} |",
            h.timestamp.format("%Y-%m-%d %H:%M:%S"),
            md_escape(h.platform.as_deref().unwrap_or("")),
            flag(h.skipped),
            flag(h.shuffle),
            flag(h.offline),
            h.duration_seconds,
            h.likely_skipped
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::metrics::{RankedEntry, TrackKey};
    use crate::repository::Repository;
    use crate::repository::archive::{ImportReport, ImportedHistory};
    use crate::services::dashboard_service::DashboardService;
    use crate::services::forensics_service::ForensicsService;
    use crate::test_helpers::play;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn records() -> Vec<StreamRecord> {
        vec![
            play("2023-01-02T09:00:00Z", "Hyperballad", "Björk", 300_000, "ios"),
            play("2022-12-31T23:00:00Z", "Army of Me", "Björk", 4_000, "android"),
            play("2022-06-01T12:00:00Z", "Glory Box", "Portishead", 301_000, "ios"),
        ]
    }

    #[test]
    fn test_export_to_csv() {
        let csv = ExportService::export_to_csv(&records()).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "timestamp,platform,ms_played,track_name,artist,album,spotify_uri,skipped,shuffle,offline,incognito_mode,source_file"
        );
        assert_eq!(
            lines[1],
            "2023-01-02T09:00:00Z,ios,300000,Hyperballad,Björk,,,false,false,false,false,Streaming_History_Audio_test.json"
        );
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_empty_csv_has_header() {
        let csv = ExportService::export_to_csv(&[]).unwrap();
        assert!(csv.starts_with("timestamp,platform,ms_played"));
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_combined_csv_is_chronological() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spotify_history_all_years.csv");

        let rows = ExportService::export_combined_csv(&records(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();

        assert_eq!(rows, 3);
        assert!(lines[1].starts_with("2022-06-01T12:00:00Z"));
        assert!(lines[3].starts_with("2023-01-02T09:00:00Z"));
    }

    #[test]
    fn test_export_by_year() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("outputByYear");

        let exports = ExportService::export_by_year(&records(), &out).unwrap();

        assert_eq!(exports.len(), 2);
        assert_eq!(exports[0].year, 2022);
        assert_eq!(exports[0].rows, 2);
        assert_eq!(exports[1].path, out.join("spotify_history_2023.csv"));

        let content = std::fs::read_to_string(&exports[0].path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Glory Box"));
        assert!(lines[2].contains("Army of Me"));
    }

    fn dashboard() -> DashboardReport {
        let history = ImportedHistory {
            records: records(),
            report: ImportReport::default(),
        };
        DashboardService::new(Arc::new(Repository::new(history)), AppConfig::default())
            .build(None)
            .unwrap()
    }

    #[test]
    fn test_render_dashboard_text() {
        let text = ExportService::render_dashboard(&dashboard(), ExportFormat::Text).unwrap();

        assert!(text.contains("Processed 3 streams"));
        assert!(text.contains("Quick Stats"));
        assert!(text.contains("Top 2 Artists"));
        assert!(text.contains("Estimated Skip Rate  33.3%"));
        assert!(text.contains("No frequently skipped tracks found."));
        assert!(text.contains("2022-06"));
    }

    #[test]
    fn test_render_dashboard_markdown() {
        let markdown = ExportService::render_dashboard(&dashboard(), ExportFormat::Markdown).unwrap();

        assert!(markdown.contains("# Listening History"));
        assert!(markdown.contains("## Top Artists"));
        assert!(markdown.contains("| Portishead | 0.08 |"));
        assert!(markdown.contains("- **Total Streams:** 3"));
    }

    #[test]
    fn test_render_dashboard_json() {
        let json = ExportService::render_dashboard(&dashboard(), ExportFormat::Json).unwrap();

        let parsed: DashboardReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.quick_stats.total_streams, 3);
        assert_eq!(parsed.metrics.top_artists[0].key, "Björk");
    }

    fn single_platform_repository() -> Arc<Repository> {
        let records = vec![
            play("2023-03-01T09:00:00Z", "Hyperballad", "Björk", 300_000, "ios"),
            play("2023-03-02T21:00:00Z", "Hyperballad", "Björk", 5_000, "ios"),
        ];
        let history = ImportedHistory {
            records,
            report: ImportReport::default(),
        };
        Arc::new(Repository::new(history))
    }

    #[test]
    fn test_dashboard_markdown_carries_every_section() {
        let markdown = ExportService::render_dashboard(&dashboard(), ExportFormat::Markdown).unwrap();

        assert!(markdown.contains("| Platform | Hours | Share |"));
        assert!(markdown.contains("No frequently skipped tracks found."));
        assert!(markdown.contains("## Artist Explorer\n\n- Björk\n- Portishead\n"));
        assert!(markdown.contains("## Recent Activity"));
        assert!(markdown.contains("| 2023-01-02 09:00:00 | Hyperballad | Björk | 5.00 |"));
    }

    #[test]
    fn test_single_platform_dashboard() {
        let report = DashboardService::new(single_platform_repository(), AppConfig::default())
            .build(None)
            .unwrap();

        let text = ExportService::render_dashboard(&report, ExportFormat::Text).unwrap();
        assert!(text.contains("All listening on: ios"));
        assert!(!text.contains("Share"));

        let markdown = ExportService::render_dashboard(&report, ExportFormat::Markdown).unwrap();
        assert!(markdown.contains("All listening on: ios"));
        assert!(!markdown.contains("| Platform | Hours | Share |"));
    }

    fn profile(top_songs: Vec<RankedEntry<String>>) -> ArtistProfile {
        ArtistProfile {
            artist: "Björk".to_string(),
            top_songs,
            total_hours: 0.5,
            total_plays: 6,
            unique_songs: 2,
            monthly_listening: Vec::new(),
        }
    }

    #[test]
    fn test_render_artist() {
        let profile = profile(vec![
            RankedEntry { key: "Hyperballad".to_string(), hours: 0.25 },
            RankedEntry { key: "Jóga".to_string(), hours: 0.2 },
        ]);

        let text = ExportService::render_artist(&profile, ExportFormat::Text).unwrap();
        assert!(text.contains("Total Plays           6"));
        assert!(text.contains("Top Songs by Björk"));
        assert!(text.contains("Hyperballad   0.25"));

        let markdown = ExportService::render_artist(&profile, ExportFormat::Markdown).unwrap();
        assert!(markdown.starts_with("# Björk\n"));
        assert!(markdown.contains("| Jóga | 0.20 |"));

        let json = ExportService::render_artist(&profile, ExportFormat::Json).unwrap();
        let parsed: ArtistProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_render_artist_without_track_names() {
        let profile = profile(Vec::new());

        for format in [ExportFormat::Text, ExportFormat::Markdown] {
            let rendered = ExportService::render_artist(&profile, format).unwrap();
            assert!(rendered.contains("No tracks found for Björk in the selected date range."));
        }
    }

    #[test]
    fn test_render_candidates() {
        let candidates = vec![ForensicsCandidate {
            track: TrackKey::new("Glory Box", "Portishead"),
            play_count: 1200,
            hours: 12.5,
        }];

        let text = ExportService::render_candidates(&candidates, ExportFormat::Text).unwrap();
        assert!(text.contains("Glory Box"));
        assert!(text.contains("1,200"));

        let markdown = ExportService::render_candidates(&candidates, ExportFormat::Markdown).unwrap();
        assert!(markdown.contains("| Glory Box | Portishead | 1200 | 12.50 |"));

        let json = ExportService::render_candidates(&candidates, ExportFormat::Json).unwrap();
        assert!(json.contains("\"play_count\": 1200"));

        let empty = ExportService::render_candidates(&[], ExportFormat::Text).unwrap();
        assert_eq!(empty, "No tracks with multiple plays found for forensics analysis.\n");
    }

    #[test]
    fn test_render_forensics() {
        let forensics = ForensicsService::new(single_platform_repository(), AppConfig::default())
            .analyze("Hyperballad", "Björk", None)
            .unwrap();

        let text = ExportService::render_forensics(&forensics, ExportFormat::Text).unwrap();
        assert!(text.contains("Total Plays          1"));
        assert!(text.contains("Skip Rate            50.0%"));
        assert!(text.contains("Listen Duration Pattern"));
        assert!(text.contains("Most commonly played at hour: 9:00"));
        assert!(text.contains("21:00"));

        let markdown = ExportService::render_forensics(&forensics, ExportFormat::Markdown).unwrap();
        assert!(markdown.contains("## Listen Duration Pattern"));
        assert!(markdown.contains("## Listening Patterns"));
        assert!(markdown.contains("Most commonly played at hour: 9:00"));
        assert!(markdown.contains("| 09:00 | 1 |"));
        assert!(markdown.contains("| Timestamp | Platform | Skipped | Shuffle | Offline | Duration (sec) | Likely Skipped |"));
        assert!(markdown.contains("| 2023-03-02 21:00:00 | ios | false | false | false | 5.0 | true |"));

        let json = ExportService::render_forensics(&forensics, ExportFormat::Json).unwrap();
        let parsed: TrackForensics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.play_count, 2);
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        assert_eq!(md_escape("A|B"), "A\\|B");
    }
}
