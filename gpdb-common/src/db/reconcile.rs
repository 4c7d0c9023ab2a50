//! Reconciliation
//!
//! Layouts, collabs and musics name the entities they depend on in free
//! text when inserted. This job resolves those names into back-reference
//! ids once the named rows exist, then recomputes every derived counter.
//!
//! Steps run in order, each in its own transaction:
//! 1. layout creator_id / artist_id / music_id
//! 2. collab host_id / artist_id / music_id
//! 3. music artist_id
//! 4. creator counters (layouts, tagged layouts, total time built)
//! 5. music uses (layouts only)
//! 6. artist counters (musics, layout + collab uses)
//!
//! Only unset back-references are filled, and counters are pure functions
//! of the current rows, so a second run with no writes in between changes
//! nothing.

use crate::db::store::Store;
use crate::duration::sum_durations;
use crate::Result;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};
use std::collections::HashMap;
use tracing::{debug, info};

/// What one reconciliation pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Layout rows that gained at least one back-reference
    pub layouts_linked: u64,
    /// Collab rows that gained at least one back-reference
    pub collabs_linked: u64,
    /// Music rows that gained their artist_id
    pub musics_linked: u64,
    /// Creators whose total_time_built changed
    pub creators_retimed: u64,
}

impl SyncReport {
    pub fn linked_total(&self) -> u64 {
        self.layouts_linked + self.collabs_linked + self.musics_linked
    }
}

/// Name -> id lookups for one pass.
///
/// Each distinct name costs one query against the table's name index, and
/// only names of rows that still have unset references are looked up. The
/// lowest id wins for duplicated names.
struct NameIndex {
    sql: &'static str,
    cache: HashMap<String, Option<i64>>,
}

impl NameIndex {
    /// `sql` must select the lowest `id` whose name equals `?`
    fn new(sql: &'static str) -> Self {
        Self {
            sql,
            cache: HashMap::new(),
        }
    }

    async fn resolve(&mut self, conn: &mut SqliteConnection, name: &str) -> Result<Option<i64>> {
        if let Some(id) = self.cache.get(name) {
            return Ok(*id);
        }

        let id: Option<i64> = sqlx::query_scalar(self.sql)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        self.cache.insert(name.to_string(), id);
        Ok(id)
    }
}

struct Indexes {
    creators: NameIndex,
    artists: NameIndex,
    musics: NameIndex,
}

impl Indexes {
    fn new() -> Self {
        Self {
            creators: NameIndex::new("SELECT id FROM creator WHERE username = ? ORDER BY id LIMIT 1"),
            artists: NameIndex::new("SELECT id FROM artist WHERE name = ? ORDER BY id LIMIT 1"),
            musics: NameIndex::new("SELECT id FROM music WHERE name = ? ORDER BY id LIMIT 1"),
        }
    }
}

type Links = (Option<i64>, Option<i64>, Option<i64>);

/// Unresolved layout or collab row; `owner` is the creator or host
#[derive(FromRow)]
struct PendingLinks {
    id: i64,
    owner_name: String,
    music_name: String,
    music_artist: String,
    owner_id: Option<i64>,
    artist_id: Option<i64>,
    music_id: Option<i64>,
}

impl PendingLinks {
    /// Look up the names behind unset references
    async fn lookup(&self, conn: &mut SqliteConnection, idx: &mut Indexes) -> Result<Links> {
        let owner = match self.owner_id {
            Some(_) => None,
            None => idx.creators.resolve(conn, &self.owner_name).await?,
        };
        let artist = match self.artist_id {
            Some(_) => None,
            None => idx.artists.resolve(conn, &self.music_artist).await?,
        };
        let music = match self.music_id {
            Some(_) => None,
            None => idx.musics.resolve(conn, &self.music_name).await?,
        };
        Ok((owner, artist, music))
    }

    /// Existing references completed with `found`; None when nothing new
    fn fill(&self, found: Links) -> Option<Links> {
        let owner = self.owner_id.or(found.0);
        let artist = self.artist_id.or(found.1);
        let music = self.music_id.or(found.2);

        let changed = owner != self.owner_id || artist != self.artist_id || music != self.music_id;
        changed.then_some((owner, artist, music))
    }
}

/// Run one full reconciliation pass
pub async fn synchronize(store: &Store) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    let mut indexes = Indexes::new();

    // 1. Layouts
    {
        let mut tx = store.pool().begin().await?;
        let rows: Vec<PendingLinks> = sqlx::query_as(
            r#"
            SELECT id, creator_name AS owner_name, music_name, music_artist,
                   creator_id AS owner_id, artist_id, music_id
            FROM layout
            WHERE creator_id IS NULL OR artist_id IS NULL OR music_id IS NULL
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for row in &rows {
            let found = row.lookup(&mut tx, &mut indexes).await?;
            if let Some((creator_id, artist_id, music_id)) = row.fill(found) {
                sqlx::query(
                    "UPDATE layout SET creator_id = ?, artist_id = ?, music_id = ? WHERE id = ?",
                )
                .bind(creator_id)
                .bind(artist_id)
                .bind(music_id)
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
                report.layouts_linked += 1;
            }
        }
        tx.commit().await?;
    }

    // 2. Collabs
    {
        let mut tx = store.pool().begin().await?;
        let rows: Vec<PendingLinks> = sqlx::query_as(
            r#"
            SELECT id, host_name AS owner_name, music_name, music_artist,
                   host_id AS owner_id, artist_id, music_id
            FROM collab
            WHERE host_id IS NULL OR artist_id IS NULL OR music_id IS NULL
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for row in &rows {
            let found = row.lookup(&mut tx, &mut indexes).await?;
            if let Some((host_id, artist_id, music_id)) = row.fill(found) {
                sqlx::query(
                    "UPDATE collab SET host_id = ?, artist_id = ?, music_id = ? WHERE id = ?",
                )
                .bind(host_id)
                .bind(artist_id)
                .bind(music_id)
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
                report.collabs_linked += 1;
            }
        }
        tx.commit().await?;
    }

    // 3. Musics
    {
        let mut tx = store.pool().begin().await?;
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, artist FROM music WHERE artist_id IS NULL")
                .fetch_all(&mut *tx)
                .await?;

        for (id, artist) in &rows {
            if let Some(artist_id) = indexes.artists.resolve(&mut tx, artist).await? {
                sqlx::query("UPDATE music SET artist_id = ? WHERE id = ?")
                    .bind(artist_id)
                    .bind(*id)
                    .execute(&mut *tx)
                    .await?;
                report.musics_linked += 1;
            }
        }
        tx.commit().await?;
    }

    // 4. Creator counters
    {
        let mut tx = store.pool().begin().await?;
        sqlx::query(
            r#"
            UPDATE creator SET
                layouts_registered = (
                    SELECT COUNT(*) FROM layout WHERE layout.creator_id = creator.id
                ),
                collab_participations = (
                    SELECT COUNT(*) FROM layout
                    WHERE layout.creator_id = creator.id AND layout.masterlevel IS NOT NULL
                )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let lengths: Vec<(i64, String)> =
            sqlx::query_as("SELECT creator_id, length FROM layout WHERE creator_id IS NOT NULL ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;
        let mut by_creator: HashMap<i64, Vec<String>> = HashMap::new();
        for (creator_id, length) in lengths {
            by_creator.entry(creator_id).or_default().push(length);
        }

        let creators: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, total_time_built FROM creator")
                .fetch_all(&mut *tx)
                .await?;
        for (id, current) in creators {
            let total = sum_durations(by_creator.get(&id).map(Vec::as_slice).unwrap_or_default());
            if total != current {
                sqlx::query("UPDATE creator SET total_time_built = ? WHERE id = ?")
                    .bind(&total)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                report.creators_retimed += 1;
            }
        }
        tx.commit().await?;
    }

    // 5. Music uses, layouts only
    sqlx::query(
        "UPDATE music SET uses = (SELECT COUNT(*) FROM layout WHERE layout.music_id = music.id)",
    )
    .execute(store.pool())
    .await?;

    // 6. Artist counters, layouts and collabs
    sqlx::query(
        r#"
        UPDATE artist SET
            songs_registered = (
                SELECT COUNT(*) FROM music WHERE music.artist_id = artist.id
            ),
            total_song_uses = (
                SELECT COUNT(*) FROM layout WHERE layout.artist_id = artist.id
            ) + (
                SELECT COUNT(*) FROM collab WHERE collab.artist_id = artist.id
            )
        "#,
    )
    .execute(store.pool())
    .await?;

    if report.linked_total() > 0 || report.creators_retimed > 0 {
        info!(
            layouts = report.layouts_linked,
            collabs = report.collabs_linked,
            musics = report.musics_linked,
            creators_retimed = report.creators_retimed,
            "Reconciliation linked new references"
        );
    } else {
        debug!("Reconciliation found nothing to link");
    }

    Ok(report)
}
