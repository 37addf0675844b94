// Builders shared by unit and integration tests

use crate::domain::stream::{StreamRecord, parse_timestamp};

/// A play with the fields the aggregations look at.
pub fn play(ts: &str, track: &str, artist: &str, ms_played: u64, platform: &str) -> StreamRecord {
    StreamRecord {
        timestamp: parse_timestamp(ts).expect("test timestamp"),
        platform: Some(platform.to_string()),
        ms_played: Some(ms_played),
        track_name: Some(track.to_string()),
        artist: Some(artist.to_string()),
        album: None,
        spotify_uri: None,
        skipped: Some(false),
        shuffle: Some(false),
        offline: Some(false),
        incognito_mode: Some(false),
        source_file: "Streaming_History_Audio_test.json".to_string(),
    }
}

/// JSON text of one export entry, as found in a history file.
pub fn entry_json(ts: &str, track: &str, artist: &str, ms_played: u64, platform: &str) -> String {
    serde_json::json!({
        "ts": ts,
        "platform": platform,
        "ms_played": ms_played,
        "conn_country": "DE",
        "master_metadata_track_name": track,
        "master_metadata_album_artist_name": artist,
        "master_metadata_album_album_name": format!("{} album", artist),
        "spotify_track_uri": format!("spotify:track:{}", track.to_lowercase().replace(' ', "")),
        "skipped": false,
        "shuffle": true,
        "offline": false,
        "incognito_mode": false
    })
    .to_string()
}
