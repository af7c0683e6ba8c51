//! Response models for the Spotify Web API endpoints we consume.
//!
//! Only the fields the pipeline reads are modeled; everything else in the
//! payloads is ignored. A missing field fails decoding of the whole page.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExternalUrls {
    pub spotify: String,
}

/// Page returned by `GET /me/player/recently-played`, most recent play first.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecentlyPlayed {
    pub items: Vec<PlayHistoryItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayHistoryItem {
    pub track: PlayedTrack,
    /// ISO 8601 UTC timestamp, e.g. `2024-01-01T12:00:00.000Z`.
    pub played_at: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayedTrack {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
    pub popularity: i64,
    pub external_urls: ExternalUrls,
    pub album: SimplifiedAlbum,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimplifiedAlbum {
    pub id: String,
    pub name: String,
    pub external_urls: ExternalUrls,
    pub artists: Vec<SimplifiedArtist>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimplifiedArtist {
    pub id: String,
    pub name: String,
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Followers {
    pub total: i64,
}

/// Subset of `GET /artists/{id}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ArtistDetails {
    pub followers: Followers,
    pub popularity: i64,
}

/// Subset of `GET /albums/{id}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AlbumDetails {
    pub popularity: i64,
    pub total_tracks: i64,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD` depending on the release date precision.
    pub release_date: String,
}
