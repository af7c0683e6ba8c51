//! Blocking HTTP client for the Spotify Web API.

use super::models::{AlbumDetails, ArtistDetails, RecentlyPlayed};
use super::token::TokenProvider;
use super::{ApiError, SpotifyApi};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Largest page the recently-played endpoint serves.
pub const MAX_RECENTLY_PLAYED: u32 = 50;

pub struct SpotifyClient<T: TokenProvider> {
    client: Client,
    tokens: T,
    base_url: String,
}

impl<T: TokenProvider> SpotifyClient<T> {
    pub fn new(tokens: T) -> Result<Self, ApiError> {
        Self::with_base_url(tokens, SPOTIFY_API_BASE)
    }

    pub fn with_base_url(tokens: T, base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn recently_played_url(&self, limit: u32) -> String {
        format!(
            "{}/me/player/recently-played?limit={}",
            self.base_url,
            limit.clamp(1, MAX_RECENTLY_PLAYED)
        )
    }

    fn get_json<R: DeserializeOwned>(&self, url: &str) -> Result<R, ApiError> {
        let token = self.tokens.access_token()?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.json().map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl<T: TokenProvider> SpotifyApi for SpotifyClient<T> {
    fn recently_played(&self, limit: u32) -> Result<RecentlyPlayed, ApiError> {
        self.get_json(&self.recently_played_url(limit))
    }

    fn artist(&self, artist_id: &str) -> Result<ArtistDetails, ApiError> {
        self.get_json(&format!(
            "{}/artists/{}",
            self.base_url,
            urlencoding::encode(artist_id)
        ))
    }

    fn album(&self, album_id: &str) -> Result<AlbumDetails, ApiError> {
        self.get_json(&format!(
            "{}/albums/{}",
            self.base_url,
            urlencoding::encode(album_id)
        ))
    }
}
