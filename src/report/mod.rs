//! Weekly recap built from the store's aggregation views.

mod mail;
mod render;

pub use mail::{build_message, send_message, smtp_transport, MailSettings};
pub use render::{escape_html, render_html, render_plain, subject};

use crate::load::MusicStore;
use chrono::{Days, NaiveDate};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to read {routine} from the store: {source}")]
    Store {
        routine: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to deliver recap email: {0}")]
    Mail(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// A named aggregation view and how its rows are presented.
pub struct Routine {
    pub name: &'static str,
    pub query: &'static str,
    pub caption: &'static str,
    pub headers: &'static [&'static str],
}

macro_rules! routine {
    ($name:literal, $caption:literal, [$($header:literal),+ $(,)?]) => {
        Routine {
            name: $name,
            query: concat!("SELECT * FROM ", $name),
            caption: $caption,
            headers: &[$($header),+],
        }
    };
}

const TOTAL_TIME: Routine = routine!("weekly_total_time_played", "", ["Hours"]);
const BUSIEST_DAY: Routine = routine!("most_songs_played_in_week", "", ["Day", "Plays"]);

/// Tabular routines in the order they appear in the email.
pub const TABULAR_ROUTINES: [Routine; 9] = [
    routine!(
        "most_played_songs",
        "Your most played songs were:",
        ["Song Name", "Times Played"]
    ),
    routine!(
        "top_5_most_popular_songs",
        "The top 5 most popular songs you played were:",
        ["Song Name"]
    ),
    routine!(
        "longest_songs",
        "The longest songs you listened to were:",
        ["Song Name", "Track Length (Minutes)"]
    ),
    routine!(
        "songs_played_by_decade",
        "Your song release date distributed by decade looks like:",
        ["Decade", "Songs Played"]
    ),
    routine!(
        "most_popular_artists",
        "The most popular artists you listened to were:",
        ["Artist Name"]
    ),
    routine!(
        "most_frequently_played_artist",
        "Your most played artists were:",
        ["Artist Name", "Times Played"]
    ),
    routine!(
        "artist_with_most_followers",
        "The artist you listened to with the most followers was:",
        ["Artist Name", "Followers"]
    ),
    routine!(
        "most_popular_albums",
        "The most popular albums you listened to were:",
        ["Album Name"]
    ),
    routine!(
        "most_frequently_played_album",
        "Your most played album was:",
        ["Album Name", "Times Played"]
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub caption: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusiestDay {
    pub day: String,
    pub plays: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recap {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_hours: f64,
    /// `None` when nothing was played during the week.
    pub busiest_day: Option<BusiestDay>,
    pub sections: Vec<Section>,
}

fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

fn query_section(conn: &Connection, routine: &Routine) -> rusqlite::Result<Section> {
    let mut stmt = conn.prepare(routine.query)?;
    let width = routine.headers.len().min(stmt.column_count());
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(cell_text))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Section {
        caption: routine.caption,
        headers: routine.headers,
        rows,
    })
}

/// Runs every routine for the seven days ending on `today`, a calendar date
/// in the zone the plays were recorded in.
pub fn collect_recap(store: &MusicStore, today: NaiveDate) -> Result<Recap, ReportError> {
    let conn = store.connection();
    let store_err = |routine: &'static str| {
        move |source: rusqlite::Error| ReportError::Store { routine, source }
    };

    let week_start = today.checked_sub_days(Days::new(6)).unwrap_or(today);
    store
        .set_recap_window(week_start, today)
        .map_err(store_err("recap_window"))?;

    let total_hours: f64 = conn
        .query_row(TOTAL_TIME.query, [], |row| row.get(0))
        .map_err(store_err(TOTAL_TIME.name))?;

    let busiest_day = conn
        .query_row(BUSIEST_DAY.query, [], |row| {
            Ok(BusiestDay {
                day: row.get(0)?,
                plays: row.get(1)?,
            })
        })
        .optional()
        .map_err(store_err(BUSIEST_DAY.name))?;

    let mut sections = Vec::with_capacity(TABULAR_ROUTINES.len());
    for routine in &TABULAR_ROUTINES {
        let section = query_section(conn, routine).map_err(store_err(routine.name))?;
        debug!("{} returned {} rows", routine.name, section.rows.len());
        sections.push(section);
    }

    Ok(Recap {
        week_start,
        week_end: today,
        total_hours,
        busiest_day,
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{AlbumRecord, ArtistRecord, Batch, PlayRecord, TrackRecord};
    use chrono::Local;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, MusicStore) {
        let dir = TempDir::new().unwrap();
        let store = MusicStore::open(dir.path().join("music.db")).unwrap();
        (dir, store)
    }

    fn track(id: &str, name: &str, length_ms: i64, popularity: i64) -> TrackRecord {
        TrackRecord {
            track_id: id.to_string(),
            track_name: name.to_string(),
            track_url: format!("https://open.spotify.com/track/{id}"),
            track_length_ms: length_ms,
            track_popularity: popularity,
        }
    }

    fn play(key: &str, track_id: &str, played_at: NaiveDate) -> PlayRecord {
        PlayRecord {
            time_track_key: key.to_string(),
            track_id: track_id.to_string(),
            artist_id: "AR1".to_string(),
            album_id: "AL1".to_string(),
            played_at,
            date_appended: played_at,
        }
    }

    fn week_batch(today: NaiveDate) -> Batch {
        let long_ago = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        Batch {
            plays: vec![
                play("1T1", "T1", today),
                play("2T1", "T1", today),
                play("3T2", "T2", today),
                play("4T2", "T2", long_ago),
            ],
            tracks: vec![
                track("T1", "Fish & <Chips>", 1_800_000, 40),
                track("T2", "Second", 3_600_000, 90),
            ],
            artists: vec![ArtistRecord {
                artist_id: "AR1".to_string(),
                artist_name: "Artist".to_string(),
                artist_url: "https://open.spotify.com/artist/AR1".to_string(),
                artist_followers: 1234,
                artist_popularity: 70,
            }],
            albums: vec![AlbumRecord {
                album_id: "AL1".to_string(),
                album_name: "Album".to_string(),
                album_url: "https://open.spotify.com/album/AL1".to_string(),
                album_popularity: 40,
                album_total_tracks: 12,
                album_release_date: NaiveDate::from_ymd_opt(1987, 6, 1).unwrap(),
            }],
        }
    }

    #[test]
    fn routines_match_installed_views() {
        let (_dir, store) = open_store();
        for routine in TABULAR_ROUTINES.iter().chain([&TOTAL_TIME, &BUSIEST_DAY]) {
            let stmt = store.connection().prepare(routine.query).unwrap();
            assert_eq!(stmt.column_count(), routine.headers.len(), "{}", routine.name);
        }
    }

    #[test]
    fn empty_store_yields_empty_recap() {
        let (_dir, store) = open_store();
        let today = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

        let recap = collect_recap(&store, today).unwrap();

        assert_eq!(recap.week_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(recap.total_hours, 0.0);
        assert_eq!(recap.busiest_day, None);
        assert_eq!(recap.sections.len(), 9);
        assert!(recap.sections.iter().all(|s| s.rows.is_empty()));
    }

    #[test]
    fn aggregates_plays_of_the_week() {
        let (_dir, mut store) = open_store();
        let today = Local::now().date_naive();
        store.load(&week_batch(today)).unwrap();

        let recap = collect_recap(&store, today).unwrap();

        // Two plays of a half-hour track and one of an hour-long track.
        assert_eq!(recap.total_hours, 2.0);
        assert_eq!(
            recap.busiest_day,
            Some(BusiestDay {
                day: today.to_string(),
                plays: 3
            })
        );

        let most_played = &recap.sections[0];
        assert_eq!(most_played.caption, "Your most played songs were:");
        assert_eq!(
            most_played.rows,
            vec![
                vec!["Fish & <Chips>".to_string(), "2".to_string()],
                vec!["Second".to_string(), "1".to_string()],
            ]
        );

        let popular = &recap.sections[1];
        assert_eq!(popular.rows[0], vec!["Second".to_string()]);

        let longest = &recap.sections[2];
        assert_eq!(longest.rows[0], vec!["Second".to_string(), "60".to_string()]);

        let decades = &recap.sections[3];
        assert_eq!(decades.rows, vec![vec!["1980s".to_string(), "3".to_string()]]);

        let followers = &recap.sections[6];
        assert_eq!(
            followers.rows,
            vec![vec!["Artist".to_string(), "1234".to_string()]]
        );
    }

    #[test]
    fn week_ends_on_the_given_day() {
        let (_dir, mut store) = open_store();
        let today = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let mut batch = week_batch(today);
        batch.plays = vec![
            play("1T1", "T1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            play("2T1", "T1", today),
            play("3T2", "T2", NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            play("4T2", "T2", NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()),
        ];
        store.load(&batch).unwrap();

        let recap = collect_recap(&store, today).unwrap();

        assert_eq!(recap.total_hours, 1.0);
        assert_eq!(
            recap.sections[0].rows,
            vec![vec!["Fish & <Chips>".to_string(), "2".to_string()]]
        );

        // A later week sees only the play after the earlier window.
        let next = collect_recap(&store, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()).unwrap();
        assert_eq!(
            next.sections[0].rows,
            vec![vec!["Second".to_string(), "1".to_string()]]
        );
    }

    #[test]
    fn missing_view_is_a_store_error() {
        let (_dir, store) = open_store();
        store
            .connection()
            .execute_batch("DROP VIEW longest_songs;")
            .unwrap();

        let err = collect_recap(&store, Local::now().date_naive()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::Store {
                routine: "longest_songs",
                ..
            }
        ));
    }

    #[test]
    fn null_and_real_cells_render_as_text() {
        assert_eq!(cell_text(ValueRef::Null), "");
        assert_eq!(cell_text(ValueRef::Real(3.25)), "3.25");
        assert_eq!(cell_text(ValueRef::Integer(7)), "7");
        assert_eq!(cell_text(ValueRef::Text(b"x")), "x");
    }
}
