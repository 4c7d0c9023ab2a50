//! Record store
//!
//! `Store` owns the connection pool and is the only handle through which
//! the registry is read or written. It is cheap to clone; clones share
//! the pool. Writes are expected to arrive through the write queue, reads
//! may be issued from anywhere.

use crate::db::init::{init_database, init_memory_database};
use crate::db::models::*;
use crate::db::requests::fetch_all_requests;
use crate::{Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Timestamp layout for `registration_date`; sorts lexicographically
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the database file, creating it and its schema if needed
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self { pool })
    }

    /// Fresh private database, used by tests and dry runs
    pub async fn open_in_memory() -> Result<Self> {
        let pool = init_memory_database().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Inserts
    // -----------------------------------------------------------------------

    /// Append a registry row. Back-references are left unset and the
    /// referenced names are not checked; reconciliation resolves them.
    pub async fn insert(&self, submission: &Submission) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let stamp = timestamp_now();
        let id = insert_entry(&mut conn, submission.kind().table(), submission, None, &stamp).await?;

        debug!(
            kind = %submission.kind(),
            id,
            name = submission.name(),
            recorder = submission.recorder_name(),
            "Registered entry"
        );
        Ok(id)
    }

    /// Append a pending request row to the kind's shadow table
    pub async fn insert_request(&self, submission: &Submission) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let stamp = timestamp_now();
        let id = insert_entry(
            &mut conn,
            submission.kind().request_table(),
            submission,
            None,
            &stamp,
        )
        .await?;

        debug!(
            kind = %submission.kind(),
            id,
            name = submission.name(),
            recorder = submission.recorder_name(),
            "Stored pending request"
        );
        Ok(id)
    }

    pub async fn insert_creator(&self, creator: NewCreator) -> Result<i64> {
        self.insert(&Submission::Creator(creator)).await
    }

    pub async fn insert_layout(&self, layout: NewLayout) -> Result<i64> {
        self.insert(&Submission::Layout(layout)).await
    }

    pub async fn insert_collab(&self, collab: NewCollab) -> Result<i64> {
        self.insert(&Submission::Collab(collab)).await
    }

    pub async fn insert_music(&self, music: NewMusic) -> Result<i64> {
        self.insert(&Submission::Music(music)).await
    }

    pub async fn insert_artist(&self, artist: NewArtist) -> Result<i64> {
        self.insert(&Submission::Artist(artist)).await
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Creators with exactly this username, oldest first
    pub async fn find_creator_by_name(&self, username: &str) -> Result<Vec<Creator>> {
        let rows = sqlx::query_as::<_, Creator>(
            "SELECT * FROM creator WHERE username = ? ORDER BY id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        found(rows, EntityKind::Creator, username)
    }

    pub async fn find_layout_by_name(&self, name: &str) -> Result<Vec<Layout>> {
        let rows = sqlx::query_as::<_, Layout>("SELECT * FROM layout WHERE name = ? ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        found(rows, EntityKind::Layout, name)
    }

    pub async fn find_collab_by_name(&self, name: &str) -> Result<Vec<Collab>> {
        let rows = sqlx::query_as::<_, Collab>("SELECT * FROM collab WHERE name = ? ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        found(rows, EntityKind::Collab, name)
    }

    pub async fn find_music_by_name(&self, name: &str) -> Result<Vec<Music>> {
        let rows = sqlx::query_as::<_, Music>("SELECT * FROM music WHERE name = ? ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        found(rows, EntityKind::Music, name)
    }

    pub async fn find_artist_by_name(&self, name: &str) -> Result<Vec<Artist>> {
        let rows = sqlx::query_as::<_, Artist>("SELECT * FROM artist WHERE name = ? ORDER BY id")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        found(rows, EntityKind::Artist, name)
    }

    pub async fn list_creators(&self) -> Result<Vec<Creator>> {
        let mut conn = self.pool.acquire().await?;
        fetch_table(&mut conn, "creator").await
    }

    pub async fn list_layouts(&self) -> Result<Vec<Layout>> {
        let mut conn = self.pool.acquire().await?;
        fetch_table(&mut conn, "layout").await
    }

    pub async fn list_collabs(&self) -> Result<Vec<Collab>> {
        let mut conn = self.pool.acquire().await?;
        fetch_table(&mut conn, "collab").await
    }

    pub async fn list_musics(&self) -> Result<Vec<Music>> {
        let mut conn = self.pool.acquire().await?;
        fetch_table(&mut conn, "music").await
    }

    pub async fn list_artists(&self) -> Result<Vec<Artist>> {
        let mut conn = self.pool.acquire().await?;
        fetch_table(&mut conn, "artist").await
    }

    /// Row count of a registry table
    pub async fn count(&self, kind: EntityKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    // -----------------------------------------------------------------------
    // Snapshot / restore
    // -----------------------------------------------------------------------

    /// Copy every table, registry and pending requests alike.
    ///
    /// All tables are read inside one transaction, so the copy is a single
    /// point in time even while writes and reconciliation keep committing.
    /// Back-references in the copy therefore always point at rows it holds.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let mut tx = self.pool.begin().await?;

        let snapshot = Snapshot {
            created_at: timestamp_now(),
            creators: fetch_table(&mut tx, "creator").await?,
            layouts: fetch_table(&mut tx, "layout").await?,
            collabs: fetch_table(&mut tx, "collab").await?,
            musics: fetch_table(&mut tx, "music").await?,
            artists: fetch_table(&mut tx, "artist").await?,
            requests: fetch_all_requests(&mut tx).await?,
        };

        // Read-only; nothing to commit
        tx.rollback().await?;
        Ok(snapshot)
    }

    /// Delete every row of every table and reset id sequences
    pub async fn clear_registry(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_all(&mut tx).await?;
        tx.commit().await?;

        info!("Registry cleared");
        Ok(())
    }

    /// Replace the whole database content with `snapshot`, ids included.
    ///
    /// Runs in one transaction: a failure leaves the previous content.
    pub async fn restore(&self, snapshot: &Snapshot) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear_all(&mut tx).await?;

        for artist in &snapshot.artists {
            restore_artist(&mut tx, artist).await?;
        }
        for creator in &snapshot.creators {
            restore_creator(&mut tx, creator).await?;
        }
        for music in &snapshot.musics {
            restore_music(&mut tx, music).await?;
        }
        for layout in &snapshot.layouts {
            restore_layout(&mut tx, layout).await?;
        }
        for collab in &snapshot.collabs {
            restore_collab(&mut tx, collab).await?;
        }
        for request in &snapshot.requests {
            insert_entry(
                &mut tx,
                request.kind().request_table(),
                &request.submission,
                Some(request.id),
                &request.submitted_at,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            creators = snapshot.creators.len(),
            layouts = snapshot.layouts.len(),
            collabs = snapshot.collabs.len(),
            musics = snapshot.musics.len(),
            artists = snapshot.artists.len(),
            requests = snapshot.requests.len(),
            "Registry restored from snapshot taken {}",
            snapshot.created_at
        );
        Ok(())
    }
}

/// Every row of a registry table, by id
async fn fetch_table<T>(conn: &mut SqliteConnection, table: &str) -> Result<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} ORDER BY id", table);
    Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&mut *conn).await?)
}

/// Turn an empty lookup into `NotFound`
fn found<T>(rows: Vec<T>, kind: EntityKind, name: &str) -> Result<Vec<T>> {
    if rows.is_empty() {
        Err(Error::NotFound(format!("No {} named '{}'", kind, name)))
    } else {
        Ok(rows)
    }
}

/// Insert the submitted columns of `submission` into `table`.
///
/// `table` is either the kind's registry table or its request shadow; both
/// share the submitted columns. An explicit `id` is only given on restore.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    table: &str,
    submission: &Submission,
    id: Option<i64>,
    registration_date: &str,
) -> Result<i64> {
    let mut columns: Vec<&str> = Vec::with_capacity(16);
    if id.is_some() {
        columns.push("id");
    }
    columns.extend_from_slice(submission.kind().entry_columns());
    columns.push("registration_date");

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    if let Some(id) = id {
        query = query.bind(id);
    }
    query = bind_entry(query, submission);
    query = query.bind(registration_date.to_string());

    let result = query.execute(&mut *conn).await?;
    Ok(result.last_insert_rowid())
}

/// Bind submitted fields in `EntityKind::entry_columns` order
fn bind_entry<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    submission: &Submission,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match submission {
        Submission::Creator(c) => query
            .bind(c.username.clone())
            .bind(c.nationality.clone())
            .bind(c.discord.clone())
            .bind(c.discord_uid)
            .bind(c.yt.clone())
            .bind(c.recorder_name.clone()),
        Submission::Layout(l) => query
            .bind(l.creator_name.clone())
            .bind(l.layout_type.clone())
            .bind(l.name.clone())
            .bind(l.length.clone())
            .bind(l.yt.clone())
            .bind(l.music_ngid)
            .bind(l.music_name.clone())
            .bind(l.music_artist.clone())
            .bind(l.igid)
            .bind(l.masterlevel.clone())
            .bind(l.recorder_name.clone())
            .bind(l.recorder_notes.clone()),
        Submission::Collab(c) => query
            .bind(c.host_name.clone())
            .bind(c.name.clone())
            .bind(c.builders_number)
            .bind(c.length.clone())
            .bind(c.yt.clone())
            .bind(c.music_ngid)
            .bind(c.music_name.clone())
            .bind(c.music_artist.clone())
            .bind(c.igid)
            .bind(c.recorder_name.clone())
            .bind(c.recorder_notes.clone()),
        Submission::Music(m) => query
            .bind(m.name.clone())
            .bind(m.artist.clone())
            .bind(m.length.clone())
            .bind(m.music_type.clone())
            .bind(m.yt.clone())
            .bind(m.soundcloud.clone())
            .bind(m.ngid)
            .bind(m.recorder_name.clone())
            .bind(m.recorder_notes.clone()),
        Submission::Artist(a) => query
            .bind(a.name.clone())
            .bind(a.yt.clone())
            .bind(a.soundcloud.clone())
            .bind(a.recorder_name.clone())
            .bind(a.recorder_notes.clone()),
    }
}

async fn clear_all(conn: &mut SqliteConnection) -> Result<()> {
    // Referencing tables first
    let tables = [
        "layout",
        "collab",
        "music",
        "creator",
        "artist",
        "requestcreator",
        "requestlayout",
        "requestcollab",
        "requestmusic",
        "requestartist",
    ];

    for table in tables {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("DELETE FROM sqlite_sequence")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn restore_creator(conn: &mut SqliteConnection, creator: &Creator) -> Result<()> {
    let submission = Submission::Creator(creator.entry.clone());
    insert_entry(conn, "creator", &submission, Some(creator.id), &creator.registration_date).await?;

    sqlx::query(
        "UPDATE creator SET layouts_registered = ?, collab_participations = ?, total_time_built = ? WHERE id = ?",
    )
    .bind(creator.layouts_registered)
    .bind(creator.collab_participations)
    .bind(&creator.total_time_built)
    .bind(creator.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn restore_artist(conn: &mut SqliteConnection, artist: &Artist) -> Result<()> {
    let submission = Submission::Artist(artist.entry.clone());
    insert_entry(conn, "artist", &submission, Some(artist.id), &artist.registration_date).await?;

    sqlx::query("UPDATE artist SET songs_registered = ?, total_song_uses = ? WHERE id = ?")
        .bind(artist.songs_registered)
        .bind(artist.total_song_uses)
        .bind(artist.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn restore_music(conn: &mut SqliteConnection, music: &Music) -> Result<()> {
    let submission = Submission::Music(music.entry.clone());
    insert_entry(conn, "music", &submission, Some(music.id), &music.registration_date).await?;

    sqlx::query("UPDATE music SET uses = ?, artist_id = ? WHERE id = ?")
        .bind(music.uses)
        .bind(music.artist_id)
        .bind(music.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn restore_layout(conn: &mut SqliteConnection, layout: &Layout) -> Result<()> {
    let submission = Submission::Layout(layout.entry.clone());
    insert_entry(conn, "layout", &submission, Some(layout.id), &layout.registration_date).await?;

    sqlx::query("UPDATE layout SET creator_id = ?, artist_id = ?, music_id = ? WHERE id = ?")
        .bind(layout.creator_id)
        .bind(layout.artist_id)
        .bind(layout.music_id)
        .bind(layout.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn restore_collab(conn: &mut SqliteConnection, collab: &Collab) -> Result<()> {
    let submission = Submission::Collab(collab.entry.clone());
    insert_entry(conn, "collab", &submission, Some(collab.id), &collab.registration_date).await?;

    sqlx::query("UPDATE collab SET host_id = ?, artist_id = ?, music_id = ? WHERE id = ?")
        .bind(collab.host_id)
        .bind(collab.artist_id)
        .bind(collab.music_id)
        .bind(collab.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_chronologically() {
        let earlier = chrono::NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_milli_opt(9, 5, 3, 7)
            .unwrap()
            .format(TIMESTAMP_FORMAT)
            .to_string();
        let later = chrono::NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_milli_opt(8, 0, 0, 0)
            .unwrap()
            .format(TIMESTAMP_FORMAT)
            .to_string();

        assert_eq!(earlier, "2024-09-01 09:05:03.007");
        assert!(earlier < later);
    }

    #[test]
    fn test_found_maps_empty_to_not_found() {
        let err = found(Vec::<i64>::new(), EntityKind::Music, "M1").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(found(vec![1], EntityKind::Music, "M1").unwrap(), vec![1]);
    }
}
