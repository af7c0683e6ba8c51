//! SQLite schema of the listening-history store.
//!
//! Four target tables form the star schema, each paired with a staging table
//! of the same shape (no key constraints). Staging tables are transient and
//! not part of the versioned schema; the store creates them when absent.
//! The aggregation routines read by the weekly recap are installed as views
//! over the week recorded in `recap_window`.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, SqlType, Table, VersionedSchema, View};

// =============================================================================
// Targets
// =============================================================================

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("artist_name", &SqlType::Text),
        sqlite_column!("artist_url", &SqlType::Text),
        sqlite_column!("artist_followers", &SqlType::Integer),
        sqlite_column!("artist_popularity", &SqlType::Integer),
    ],
    indices: &[],
};

pub const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("album_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("album_name", &SqlType::Text),
        sqlite_column!("album_url", &SqlType::Text),
        sqlite_column!("album_popularity", &SqlType::Integer),
        sqlite_column!("album_total_tracks", &SqlType::Integer),
        sqlite_column!("album_release_date", &SqlType::Text),
    ],
    indices: &[],
};

pub const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("track_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("track_name", &SqlType::Text),
        sqlite_column!("track_url", &SqlType::Text),
        sqlite_column!("track_length_ms", &SqlType::Integer),
        sqlite_column!("track_popularity", &SqlType::Integer),
    ],
    indices: &[],
};

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "track_id",
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "artist_id",
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "album_id",
};

pub const PLAY_LOG_TABLE: Table = Table {
    name: "play_log",
    columns: &[
        sqlite_column!("time_track_key", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sqlite_column!(
            "album_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sqlite_column!("played_at", &SqlType::Text, non_null = true),
        sqlite_column!("date_appended", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_play_log_played_at", "played_at")],
};

// =============================================================================
// Staging
// =============================================================================

pub const STAGING_ARTISTS_TABLE: Table = Table {
    name: "staging_artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
        sqlite_column!("artist_url", &SqlType::Text),
        sqlite_column!("artist_followers", &SqlType::Integer),
        sqlite_column!("artist_popularity", &SqlType::Integer),
    ],
    indices: &[],
};

pub const STAGING_ALBUMS_TABLE: Table = Table {
    name: "staging_albums",
    columns: &[
        sqlite_column!("album_id", &SqlType::Text),
        sqlite_column!("album_name", &SqlType::Text),
        sqlite_column!("album_url", &SqlType::Text),
        sqlite_column!("album_popularity", &SqlType::Integer),
        sqlite_column!("album_total_tracks", &SqlType::Integer),
        sqlite_column!("album_release_date", &SqlType::Text),
    ],
    indices: &[],
};

pub const STAGING_TRACKS_TABLE: Table = Table {
    name: "staging_tracks",
    columns: &[
        sqlite_column!("track_id", &SqlType::Text),
        sqlite_column!("track_name", &SqlType::Text),
        sqlite_column!("track_url", &SqlType::Text),
        sqlite_column!("track_length_ms", &SqlType::Integer),
        sqlite_column!("track_popularity", &SqlType::Integer),
    ],
    indices: &[],
};

pub const PLAY_LOG_STAGING_TABLE: Table = Table {
    name: "play_log_staging",
    columns: &[
        sqlite_column!("time_track_key", &SqlType::Text),
        sqlite_column!("track_id", &SqlType::Text),
        sqlite_column!("artist_id", &SqlType::Text),
        sqlite_column!("album_id", &SqlType::Text),
        sqlite_column!("played_at", &SqlType::Text),
        sqlite_column!("date_appended", &SqlType::Text),
    ],
    indices: &[],
};

pub const STAGING_TABLES: &[Table] = &[
    STAGING_ARTISTS_TABLE,
    STAGING_ALBUMS_TABLE,
    STAGING_TRACKS_TABLE,
    PLAY_LOG_STAGING_TABLE,
];

// =============================================================================
// Aggregation views
// =============================================================================

/// Single row holding the inclusive date range the views aggregate over.
pub const RECAP_WINDOW_TABLE: Table = Table {
    name: "recap_window",
    columns: &[
        sqlite_column!("week_start", &SqlType::Text, non_null = true),
        sqlite_column!("week_end", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

// Play dates are zone-local calendar days, so the window is too.
macro_rules! this_week {
    () => {
        "played_at BETWEEN (SELECT week_start FROM recap_window) \
         AND (SELECT week_end FROM recap_window)"
    };
}

const WEEKLY_TOTAL_TIME_PLAYED: View = View {
    name: "weekly_total_time_played",
    create_sql: concat!(
        "CREATE VIEW weekly_total_time_played AS ",
        "SELECT ROUND(COALESCE(SUM(t.track_length_ms), 0) / 3600000.0, 2) AS hours ",
        "FROM play_log AS p JOIN tracks AS t ON t.track_id = p.track_id ",
        "WHERE p.",
        this_week!()
    ),
};

const MOST_SONGS_PLAYED_IN_WEEK: View = View {
    name: "most_songs_played_in_week",
    create_sql: concat!(
        "CREATE VIEW most_songs_played_in_week AS ",
        "SELECT played_at AS day, COUNT(*) AS plays FROM play_log ",
        "WHERE ",
        this_week!(),
        " GROUP BY played_at ORDER BY plays DESC, day DESC LIMIT 1"
    ),
};

const MOST_PLAYED_SONGS: View = View {
    name: "most_played_songs",
    create_sql: concat!(
        "CREATE VIEW most_played_songs AS ",
        "SELECT t.track_name AS song_name, COUNT(*) AS times_played ",
        "FROM play_log AS p JOIN tracks AS t ON t.track_id = p.track_id ",
        "WHERE p.",
        this_week!(),
        " GROUP BY p.track_id, t.track_name ORDER BY times_played DESC, song_name LIMIT 5"
    ),
};

const TOP_5_MOST_POPULAR_SONGS: View = View {
    name: "top_5_most_popular_songs",
    create_sql: concat!(
        "CREATE VIEW top_5_most_popular_songs AS ",
        "SELECT t.track_name AS song_name FROM tracks AS t ",
        "WHERE t.track_id IN (SELECT track_id FROM play_log WHERE ",
        this_week!(),
        ") ORDER BY t.track_popularity DESC, song_name LIMIT 5"
    ),
};

const LONGEST_SONGS: View = View {
    name: "longest_songs",
    create_sql: concat!(
        "CREATE VIEW longest_songs AS ",
        "SELECT t.track_name AS song_name, ",
        "ROUND(t.track_length_ms / 60000.0, 2) AS track_length_minutes FROM tracks AS t ",
        "WHERE t.track_id IN (SELECT track_id FROM play_log WHERE ",
        this_week!(),
        ") ORDER BY t.track_length_ms DESC, song_name LIMIT 5"
    ),
};

const SONGS_PLAYED_BY_DECADE: View = View {
    name: "songs_played_by_decade",
    create_sql: concat!(
        "CREATE VIEW songs_played_by_decade AS ",
        "SELECT (CAST(substr(a.album_release_date, 1, 4) AS INTEGER) / 10 * 10) || 's' AS decade, ",
        "COUNT(*) AS songs_played ",
        "FROM play_log AS p JOIN albums AS a ON a.album_id = p.album_id ",
        "WHERE p.",
        this_week!(),
        " GROUP BY decade ORDER BY decade"
    ),
};

const MOST_POPULAR_ARTISTS: View = View {
    name: "most_popular_artists",
    create_sql: concat!(
        "CREATE VIEW most_popular_artists AS ",
        "SELECT ar.artist_name AS artist_name FROM artists AS ar ",
        "WHERE ar.artist_id IN (SELECT artist_id FROM play_log WHERE ",
        this_week!(),
        ") ORDER BY ar.artist_popularity DESC, artist_name LIMIT 5"
    ),
};

const MOST_FREQUENTLY_PLAYED_ARTIST: View = View {
    name: "most_frequently_played_artist",
    create_sql: concat!(
        "CREATE VIEW most_frequently_played_artist AS ",
        "SELECT ar.artist_name AS artist_name, COUNT(*) AS times_played ",
        "FROM play_log AS p JOIN artists AS ar ON ar.artist_id = p.artist_id ",
        "WHERE p.",
        this_week!(),
        " GROUP BY p.artist_id, ar.artist_name ORDER BY times_played DESC, artist_name LIMIT 5"
    ),
};

const ARTIST_WITH_MOST_FOLLOWERS: View = View {
    name: "artist_with_most_followers",
    create_sql: concat!(
        "CREATE VIEW artist_with_most_followers AS ",
        "SELECT ar.artist_name AS artist_name, ar.artist_followers AS followers ",
        "FROM artists AS ar ",
        "WHERE ar.artist_id IN (SELECT artist_id FROM play_log WHERE ",
        this_week!(),
        ") ORDER BY followers DESC, artist_name LIMIT 1"
    ),
};

const MOST_POPULAR_ALBUMS: View = View {
    name: "most_popular_albums",
    create_sql: concat!(
        "CREATE VIEW most_popular_albums AS ",
        "SELECT al.album_name AS album_name FROM albums AS al ",
        "WHERE al.album_id IN (SELECT album_id FROM play_log WHERE ",
        this_week!(),
        ") ORDER BY al.album_popularity DESC, album_name LIMIT 5"
    ),
};

const MOST_FREQUENTLY_PLAYED_ALBUM: View = View {
    name: "most_frequently_played_album",
    create_sql: concat!(
        "CREATE VIEW most_frequently_played_album AS ",
        "SELECT al.album_name AS album_name, COUNT(*) AS times_played ",
        "FROM play_log AS p JOIN albums AS al ON al.album_id = p.album_id ",
        "WHERE p.",
        this_week!(),
        " GROUP BY p.album_id, al.album_name ORDER BY times_played DESC, album_name LIMIT 1"
    ),
};

// =============================================================================
// Versions
// =============================================================================

pub const STORE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        ARTISTS_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
        PLAY_LOG_TABLE,
        RECAP_WINDOW_TABLE,
    ],
    views: &[
        WEEKLY_TOTAL_TIME_PLAYED,
        MOST_SONGS_PLAYED_IN_WEEK,
        MOST_PLAYED_SONGS,
        TOP_5_MOST_POPULAR_SONGS,
        LONGEST_SONGS,
        SONGS_PLAYED_BY_DECADE,
        MOST_POPULAR_ARTISTS,
        MOST_FREQUENTLY_PLAYED_ARTIST,
        ARTIST_WITH_MOST_FOLLOWERS,
        MOST_POPULAR_ALBUMS,
        MOST_FREQUENTLY_PLAYED_ALBUM,
    ],
}];
