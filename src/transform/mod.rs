//! Reshapes a page of play events into star-schema records.

mod records;

pub use records::{
    dedup_last_observed, AlbumRecord, ArtistRecord, Batch, Keyed, PlayRecord, TrackRecord,
};

use crate::spotify::{lookup_supplement, ApiError, PlayHistoryItem, RecentlyPlayed, SpotifyApi};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Album {album_id} of track {track_id} lists no artists")]
    MissingArtist { track_id: String, album_id: String },

    #[error("Invalid played_at timestamp {value:?}: {source}")]
    InvalidPlayedAt {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid release date {value:?} for album {album_id}")]
    InvalidReleaseDate { album_id: String, value: String },

    #[error("Supplementary lookup failed: {0}")]
    Lookup(#[from] ApiError),
}

pub struct TransformSettings {
    /// Zone the played-at dates are expressed in.
    pub timezone: Tz,
    /// Value written to every play's `date_appended`.
    pub recorded_on: NaiveDate,
}

pub fn parse_played_at(value: &str) -> Result<DateTime<Utc>, TransformError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TransformError::InvalidPlayedAt {
            value: value.to_string(),
            source,
        })
}

/// Epoch seconds followed by the sub-second digits without trailing zeros.
///
/// `2024-01-01T12:00:00.000Z` gives `1704110400`,
/// `2024-01-01T12:00:00.123Z` gives `1704110400123`.
fn epoch_component(played_at: &DateTime<Utc>) -> String {
    let seconds = played_at.timestamp();
    let nanos = played_at.timestamp_subsec_nanos();
    if nanos == 0 {
        return seconds.to_string();
    }
    let fraction = format!("{:09}", nanos);
    format!("{}{}", seconds, fraction.trim_end_matches('0'))
}

pub fn composite_key(played_at: &DateTime<Utc>, track_id: &str) -> String {
    format!("{}{}", epoch_component(played_at), track_id)
}

/// Expands a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` release date to a full date,
/// defaulting missing parts to the first month/day.
pub fn normalize_release_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(month) => month.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(day) => day.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn transform_item<A: SpotifyApi + ?Sized>(
    item: &PlayHistoryItem,
    api: &A,
    settings: &TransformSettings,
    batch: &mut Batch,
) -> Result<(), TransformError> {
    let track = &item.track;
    let album = &track.album;
    let artist = album
        .artists
        .first()
        .ok_or_else(|| TransformError::MissingArtist {
            track_id: track.id.clone(),
            album_id: album.id.clone(),
        })?;

    let played_at = parse_played_at(&item.played_at)?;
    let supplement = lookup_supplement(api, &artist.id, &album.id)?;
    let release_date = normalize_release_date(&supplement.album_release_date).ok_or_else(|| {
        TransformError::InvalidReleaseDate {
            album_id: album.id.clone(),
            value: supplement.album_release_date.clone(),
        }
    })?;

    debug!(
        "Play of {} at {} by {} ({})",
        track.id, item.played_at, artist.id, album.id
    );

    batch.plays.push(PlayRecord {
        time_track_key: composite_key(&played_at, &track.id),
        track_id: track.id.clone(),
        artist_id: artist.id.clone(),
        album_id: album.id.clone(),
        played_at: played_at.with_timezone(&settings.timezone).date_naive(),
        date_appended: settings.recorded_on,
    });
    batch.tracks.push(TrackRecord {
        track_id: track.id.clone(),
        track_name: track.name.clone(),
        track_url: track.external_urls.spotify.clone(),
        track_length_ms: track.duration_ms,
        track_popularity: track.popularity,
    });
    batch.artists.push(ArtistRecord {
        artist_id: artist.id.clone(),
        artist_name: artist.name.clone(),
        artist_url: artist.external_urls.spotify.clone(),
        artist_followers: supplement.artist_followers,
        artist_popularity: supplement.artist_popularity,
    });
    batch.albums.push(AlbumRecord {
        album_id: album.id.clone(),
        album_name: album.name.clone(),
        album_url: album.external_urls.spotify.clone(),
        album_popularity: supplement.album_popularity,
        album_total_tracks: supplement.album_total_tracks,
        album_release_date: release_date,
    });

    Ok(())
}

/// Builds the four record collections for a page of play events.
///
/// Artist and album attributes are looked up once per event. Dimension
/// records are deduplicated by identifier; plays are kept as they are. Any
/// failing event fails the whole batch.
pub fn transform<A: SpotifyApi + ?Sized>(
    page: &RecentlyPlayed,
    api: &A,
    settings: &TransformSettings,
) -> Result<Batch, TransformError> {
    let mut batch = Batch::default();
    for item in &page.items {
        transform_item(item, api, settings, &mut batch)?;
    }

    batch.tracks = dedup_last_observed(batch.tracks);
    batch.artists = dedup_last_observed(batch.artists);
    batch.albums = dedup_last_observed(batch.albums);

    info!(
        "Transformed {} plays into {} tracks, {} artists, {} albums",
        batch.plays.len(),
        batch.tracks.len(),
        batch.artists.len(),
        batch.albums.len()
    );
    Ok(batch)
}
