//! Per-table merge descriptors.
//!
//! Each descriptor carries the statements that move one batch from its
//! staging table into the target: append to staging, insert keys missing
//! from the target, refresh the mutable columns of keys already present,
//! clear staging. The statements are assembled at compile time from the
//! literals given to `merge_table!`; row values are always bound.

use super::schema::{
    ALBUMS_TABLE, ARTISTS_TABLE, PLAY_LOG_STAGING_TABLE, PLAY_LOG_TABLE, STAGING_ALBUMS_TABLE,
    STAGING_ARTISTS_TABLE, STAGING_TRACKS_TABLE, TRACKS_TABLE,
};
use crate::sqlite_persistence::Table;
use crate::transform::{AlbumRecord, ArtistRecord, PlayRecord, TrackRecord};
use rusqlite::{params, Statement};

pub struct MergeTable {
    pub target: &'static Table,
    pub staging: &'static Table,
    pub stage_sql: &'static str,
    pub insert_missing_sql: &'static str,
    /// Overwrites the mutable columns of keys already in the target.
    pub refresh_sql: Option<&'static str>,
    pub clear_sql: &'static str,
}

macro_rules! merge_table {
    (
        target: $target:literal => $target_table:expr,
        staging: $staging:literal => $staging_table:expr,
        key: $key:literal,
        columns: [$first:literal $(, $column:literal)* $(,)?],
        refresh: [$($refresh:literal),* $(,)?] $(,)?
    ) => {
        MergeTable {
            target: &$target_table,
            staging: &$staging_table,
            stage_sql: concat!(
                "INSERT INTO ", $staging, " (", $first, $(", ", $column,)* ") VALUES (?",
                $(merge_table!(@placeholder $column),)*
                ")"
            ),
            insert_missing_sql: concat!(
                "INSERT INTO ", $target, " SELECT DISTINCT S.* FROM ", $staging, " AS S",
                " LEFT JOIN ", $target, " AS T ON T.", $key, " = S.", $key,
                " WHERE T.", $key, " IS NULL"
            ),
            refresh_sql: merge_table!(@refresh $target, $staging, $key, [$($refresh),*]),
            clear_sql: concat!("DELETE FROM ", $staging),
        }
    };
    (@placeholder $column:literal) => {
        ", ?"
    };
    (@refresh $target:literal, $staging:literal, $key:literal, []) => {
        None
    };
    (@refresh $target:literal, $staging:literal, $key:literal, [$first:literal $(, $rest:literal)*]) => {
        Some(concat!(
            "UPDATE ", $target, " AS M SET ", $first, " = S.", $first,
            $(", ", $rest, " = S.", $rest,)*
            " FROM ", $staging, " AS S WHERE M.", $key, " = S.", $key
        ))
    };
}

pub const ARTISTS_MERGE: MergeTable = merge_table! {
    target: "artists" => ARTISTS_TABLE,
    staging: "staging_artists" => STAGING_ARTISTS_TABLE,
    key: "artist_id",
    columns: ["artist_id", "artist_name", "artist_url", "artist_followers", "artist_popularity"],
    refresh: ["artist_followers", "artist_popularity"],
};

pub const ALBUMS_MERGE: MergeTable = merge_table! {
    target: "albums" => ALBUMS_TABLE,
    staging: "staging_albums" => STAGING_ALBUMS_TABLE,
    key: "album_id",
    columns: [
        "album_id",
        "album_name",
        "album_url",
        "album_popularity",
        "album_total_tracks",
        "album_release_date",
    ],
    refresh: ["album_popularity", "album_total_tracks"],
};

pub const TRACKS_MERGE: MergeTable = merge_table! {
    target: "tracks" => TRACKS_TABLE,
    staging: "staging_tracks" => STAGING_TRACKS_TABLE,
    key: "track_id",
    columns: ["track_id", "track_name", "track_url", "track_length_ms", "track_popularity"],
    refresh: ["track_popularity"],
};

pub const PLAY_LOG_MERGE: MergeTable = merge_table! {
    target: "play_log" => PLAY_LOG_TABLE,
    staging: "play_log_staging" => PLAY_LOG_STAGING_TABLE,
    key: "time_track_key",
    columns: [
        "time_track_key",
        "track_id",
        "artist_id",
        "album_id",
        "played_at",
        "date_appended",
    ],
    refresh: [],
};

/// A record that can be appended to its staging table.
pub trait StagedRow {
    /// Executes the staging insert for this row, binding every column in
    /// table order.
    fn stage(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
}

impl StagedRow for ArtistRecord {
    fn stage(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.artist_id,
            self.artist_name,
            self.artist_url,
            self.artist_followers,
            self.artist_popularity,
        ])
    }
}

impl StagedRow for AlbumRecord {
    fn stage(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.album_id,
            self.album_name,
            self.album_url,
            self.album_popularity,
            self.album_total_tracks,
            self.album_release_date.to_string(),
        ])
    }
}

impl StagedRow for TrackRecord {
    fn stage(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.track_id,
            self.track_name,
            self.track_url,
            self.track_length_ms,
            self.track_popularity,
        ])
    }
}

impl StagedRow for PlayRecord {
    fn stage(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.time_track_key,
            self.track_id,
            self.artist_id,
            self.album_id,
            self.played_at.to_string(),
            self.date_appended.to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_statements_for_artists() {
        assert_eq!(
            ARTISTS_MERGE.stage_sql,
            "INSERT INTO staging_artists (artist_id, artist_name, artist_url, artist_followers, \
             artist_popularity) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(
            ARTISTS_MERGE.insert_missing_sql,
            "INSERT INTO artists SELECT DISTINCT S.* FROM staging_artists AS S \
             LEFT JOIN artists AS T ON T.artist_id = S.artist_id WHERE T.artist_id IS NULL"
        );
        assert_eq!(
            ARTISTS_MERGE.refresh_sql,
            Some(
                "UPDATE artists AS M SET artist_followers = S.artist_followers, \
                 artist_popularity = S.artist_popularity FROM staging_artists AS S \
                 WHERE M.artist_id = S.artist_id"
            )
        );
        assert_eq!(ARTISTS_MERGE.clear_sql, "DELETE FROM staging_artists");
    }

    #[test]
    fn play_log_is_insert_only() {
        assert_eq!(PLAY_LOG_MERGE.refresh_sql, None);
    }

    #[test]
    fn descriptors_agree_with_table_definitions() {
        for merge in [&ARTISTS_MERGE, &ALBUMS_MERGE, &TRACKS_MERGE, &PLAY_LOG_MERGE] {
            let columns = merge.target.column_names();
            assert_eq!(columns, merge.staging.column_names());
            let key = columns[0];
            assert!(merge
                .insert_missing_sql
                .ends_with(&format!("WHERE T.{key} IS NULL")));
            if let Some(refresh) = merge.refresh_sql {
                assert!(refresh.ends_with(&format!("WHERE M.{key} = S.{key}")));
                assert!(!refresh.contains(&format!("SET {key} =")));
            }

            let expected_stage = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                merge.staging.name,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            );
            assert_eq!(merge.stage_sql, expected_stage);
            assert!(merge
                .insert_missing_sql
                .starts_with(&format!("INSERT INTO {} ", merge.target.name)));
        }
    }
}
