//! Fake Spotify API and temporary stores.

use super::constants::*;
use rusqlite::Connection;
use serde_json::{json, Value};
use spotify_recap::spotify::{
    AlbumDetails, ApiError, ArtistDetails, Followers, RecentlyPlayed, SpotifyApi,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct CatalogTrack {
    id: &'static str,
    name: &'static str,
    duration_ms: i64,
    popularity: i64,
    album_id: &'static str,
    album_name: &'static str,
    artist_id: &'static str,
    artist_name: &'static str,
}

const CATALOG: &[CatalogTrack] = &[
    CatalogTrack {
        id: TRACK_1_ID,
        name: "Opening Track",
        duration_ms: 180_000,
        popularity: 55,
        album_id: ALBUM_1_ID,
        album_name: "First Album",
        artist_id: ARTIST_1_ID,
        artist_name: "The Test Band",
    },
    CatalogTrack {
        id: TRACK_2_ID,
        name: "Second Song",
        duration_ms: 240_000,
        popularity: 70,
        album_id: ALBUM_1_ID,
        album_name: "First Album",
        artist_id: ARTIST_1_ID,
        artist_name: "The Test Band",
    },
    CatalogTrack {
        id: TRACK_3_ID,
        name: "Blue Hour",
        duration_ms: 360_000,
        popularity: 30,
        album_id: ALBUM_2_ID,
        album_name: "Jazz Collection",
        artist_id: ARTIST_2_ID,
        artist_name: "Jazz Ensemble",
    },
];

fn url(kind: &str, id: &str) -> Value {
    json!({ "spotify": format!("https://open.spotify.com/{kind}/{id}") })
}

/// A recently-played item as the API serializes it, for one of the
/// catalog tracks.
pub fn play_at(played_at: &str, track_id: &str) -> Value {
    let track = CATALOG
        .iter()
        .find(|t| t.id == track_id)
        .unwrap_or_else(|| panic!("unknown fixture track {track_id}"));

    json!({
        "played_at": played_at,
        "context": null,
        "track": {
            "id": track.id,
            "name": track.name,
            "duration_ms": track.duration_ms,
            "popularity": track.popularity,
            "explicit": false,
            "external_urls": url("track", track.id),
            "album": {
                "id": track.album_id,
                "name": track.album_name,
                "album_type": "album",
                "external_urls": url("album", track.album_id),
                "artists": [{
                    "id": track.artist_id,
                    "name": track.artist_name,
                    "external_urls": url("artist", track.artist_id),
                }],
            },
        },
    })
}

/// Serves a fixed page of plays plus artist and album lookups.
pub struct FakeSpotify {
    items: Vec<Value>,
    artist_popularity: RefCell<HashMap<String, i64>>,
    fail_recently_played: Cell<bool>,
    fail_album_lookups: Cell<bool>,
    pub requested_limit: Cell<Option<u32>>,
    pub lookups: Cell<usize>,
}

impl FakeSpotify {
    pub fn with_plays(items: Vec<Value>) -> Self {
        Self {
            items,
            artist_popularity: RefCell::new(HashMap::new()),
            fail_recently_played: Cell::new(false),
            fail_album_lookups: Cell::new(false),
            requested_limit: Cell::new(None),
            lookups: Cell::new(0),
        }
    }

    pub fn set_artist_popularity(&self, artist_id: &str, popularity: i64) {
        self.artist_popularity
            .borrow_mut()
            .insert(artist_id.to_string(), popularity);
    }

    pub fn fail_recently_played(&self) {
        self.fail_recently_played.set(true);
    }

    pub fn fail_album_lookups(&self) {
        self.fail_album_lookups.set(true);
    }
}

impl SpotifyApi for FakeSpotify {
    fn recently_played(&self, limit: u32) -> Result<RecentlyPlayed, ApiError> {
        self.requested_limit.set(Some(limit));
        if self.fail_recently_played.get() {
            return Err(ApiError::Status {
                url: "https://api.spotify.com/v1/me/player/recently-played".to_string(),
                status: 503,
            });
        }
        let items: Vec<Value> = self.items.iter().take(limit as usize).cloned().collect();
        Ok(serde_json::from_value(json!({ "items": items, "limit": limit })).unwrap())
    }

    fn artist(&self, artist_id: &str) -> Result<ArtistDetails, ApiError> {
        self.lookups.set(self.lookups.get() + 1);
        let popularity = self
            .artist_popularity
            .borrow()
            .get(artist_id)
            .copied()
            .unwrap_or(50);
        let followers = if artist_id == ARTIST_2_ID { 90_000 } else { 1_200 };
        Ok(ArtistDetails {
            followers: Followers { total: followers },
            popularity,
        })
    }

    fn album(&self, album_id: &str) -> Result<AlbumDetails, ApiError> {
        self.lookups.set(self.lookups.get() + 1);
        if self.fail_album_lookups.get() {
            return Err(ApiError::Status {
                url: format!("https://api.spotify.com/v1/albums/{album_id}"),
                status: 500,
            });
        }
        let (release_date, total_tracks) = if album_id == ALBUM_2_ID {
            ("1959", 8)
        } else {
            ("1987-06", 12)
        };
        Ok(AlbumDetails {
            popularity: 40,
            total_tracks,
            release_date: release_date.to_string(),
        })
    }
}

/// A store path inside a temporary directory that lives as long as this value.
pub struct TestStore {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("music.db");
        Self { _dir: dir, path }
    }

    pub fn connection(&self) -> Connection {
        Connection::open(&self.path).unwrap()
    }
}

pub fn count_rows(path: &Path, table: &str) -> i64 {
    Connection::open(path)
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}
