//! Extraction side of the pipeline: the Spotify Web API.
//!
//! - `recently_played` fetches the latest page of play events
//! - `artist`/`album` lookups provide attributes the play events don't carry
//!   (follower counts, popularity, track counts, release dates)
//!
//! Every call blocks and nothing is retried; failures propagate to the caller.

mod authorize;
mod client;
mod models;
mod token;

pub use authorize::{authorization_request, extract_code, AuthorizationRequest};
pub use client::{SpotifyClient, MAX_RECENTLY_PLAYED};
pub use models::*;
pub use token::{
    AuthError, CachedToken, CachedTokenProvider, OAuthApp, StaticTokenProvider, TokenProvider,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Spotify API returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub trait SpotifyApi {
    /// The `limit` most recent play events, newest first.
    fn recently_played(&self, limit: u32) -> Result<RecentlyPlayed, ApiError>;
    fn artist(&self, artist_id: &str) -> Result<ArtistDetails, ApiError>;
    fn album(&self, album_id: &str) -> Result<AlbumDetails, ApiError>;
}

impl<A: SpotifyApi + ?Sized> SpotifyApi for &A {
    fn recently_played(&self, limit: u32) -> Result<RecentlyPlayed, ApiError> {
        (**self).recently_played(limit)
    }

    fn artist(&self, artist_id: &str) -> Result<ArtistDetails, ApiError> {
        (**self).artist(artist_id)
    }

    fn album(&self, album_id: &str) -> Result<AlbumDetails, ApiError> {
        (**self).album(album_id)
    }
}

/// Artist and album attributes missing from the recently-played payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supplement {
    pub artist_followers: i64,
    pub artist_popularity: i64,
    pub album_popularity: i64,
    pub album_total_tracks: i64,
    pub album_release_date: String,
}

/// Looks up the supplementary attributes for one play event: one artist
/// call and one album call.
pub fn lookup_supplement<A: SpotifyApi + ?Sized>(
    api: &A,
    artist_id: &str,
    album_id: &str,
) -> Result<Supplement, ApiError> {
    let artist = api.artist(artist_id)?;
    let album = api.album(album_id)?;

    Ok(Supplement {
        artist_followers: artist.followers.total,
        artist_popularity: artist.popularity,
        album_popularity: album.popularity,
        album_total_tracks: album.total_tracks,
        album_release_date: album.release_date,
    })
}
