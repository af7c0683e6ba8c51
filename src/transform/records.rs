use chrono::NaiveDate;
use std::collections::HashMap;

/// One observed play. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord {
    pub time_track_key: String,
    pub track_id: String,
    pub artist_id: String,
    pub album_id: String,
    /// Calendar date of the play in the reference time zone.
    pub played_at: NaiveDate,
    /// Date the row was produced by the pipeline.
    pub date_appended: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub track_id: String,
    pub track_name: String,
    pub track_url: String,
    pub track_length_ms: i64,
    pub track_popularity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub artist_url: String,
    pub artist_followers: i64,
    pub artist_popularity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRecord {
    pub album_id: String,
    pub album_name: String,
    pub album_url: String,
    pub album_popularity: i64,
    pub album_total_tracks: i64,
    pub album_release_date: NaiveDate,
}

/// Records identified by a single key column.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for PlayRecord {
    fn key(&self) -> &str {
        &self.time_track_key
    }
}

impl Keyed for TrackRecord {
    fn key(&self) -> &str {
        &self.track_id
    }
}

impl Keyed for ArtistRecord {
    fn key(&self) -> &str {
        &self.artist_id
    }
}

impl Keyed for AlbumRecord {
    fn key(&self) -> &str {
        &self.album_id
    }
}

/// Collapses records sharing a key into one.
///
/// The surviving record sits at the position of the key's first
/// occurrence and carries the values of its last occurrence.
pub fn dedup_last_observed<R: Keyed>(records: Vec<R>) -> Vec<R> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut deduped: Vec<R> = Vec::with_capacity(records.len());

    for record in records {
        if let Some(&position) = positions.get(record.key()) {
            deduped[position] = record;
            continue;
        }
        positions.insert(record.key().to_string(), deduped.len());
        deduped.push(record);
    }

    deduped
}

/// Output of one transform run, ready for the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub plays: Vec<PlayRecord>,
    pub tracks: Vec<TrackRecord>,
    pub artists: Vec<ArtistRecord>,
    pub albums: Vec<AlbumRecord>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }
}
