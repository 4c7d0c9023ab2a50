//! Database initialization
//!
//! Creates the database file on first run and the ten registry tables
//! (five entity tables and their request shadows). Every statement is
//! idempotent, so opening an existing database is the same code path.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Milliseconds a connection waits on a locked database before failing
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open (creating if needed) the database at `db_path` and ensure the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go through the connect options so every pooled connection
    // gets them, not only the first one
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Private in-memory database with the full schema.
///
/// Each SQLite in-memory connection is its own database, so the pool is
/// pinned to a single connection that never expires.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Referenced tables first
    create_creator_table(pool).await?;
    create_artist_table(pool).await?;
    create_music_table(pool).await?;
    create_layout_table(pool).await?;
    create_collab_table(pool).await?;

    create_request_tables(pool).await?;

    Ok(())
}

async fn create_creator_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS creator (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            nationality TEXT,
            discord TEXT UNIQUE,
            discord_uid INTEGER UNIQUE,
            yt TEXT,
            layouts_registered INTEGER NOT NULL DEFAULT 0,
            collab_participations INTEGER NOT NULL DEFAULT 0,
            total_time_built TEXT NOT NULL DEFAULT '0s',
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_creator_username ON creator(username)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_artist_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            yt TEXT,
            soundcloud TEXT,
            songs_registered INTEGER NOT NULL DEFAULT 0,
            total_song_uses INTEGER NOT NULL DEFAULT 0,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_music_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS music (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            artist TEXT NOT NULL,
            length TEXT NOT NULL,
            type TEXT,
            yt TEXT,
            soundcloud TEXT,
            uses INTEGER NOT NULL DEFAULT 0,
            ngid INTEGER,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT,
            artist_id INTEGER REFERENCES artist(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_music_name ON music(name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_music_artist_id ON music(artist_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_layout_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS layout (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creator_id INTEGER REFERENCES creator(id) ON DELETE SET NULL,
            creator_name TEXT NOT NULL,
            type TEXT,
            name TEXT NOT NULL,
            length TEXT NOT NULL,
            yt TEXT,
            music_id INTEGER REFERENCES music(id) ON DELETE SET NULL,
            music_ngid INTEGER,
            music_name TEXT NOT NULL,
            music_artist TEXT NOT NULL,
            igid INTEGER,
            masterlevel TEXT,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT,
            artist_id INTEGER REFERENCES artist(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_layout_name ON layout(name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_layout_creator_id ON layout(creator_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_layout_music_id ON layout(music_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_layout_artist_id ON layout(artist_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_collab_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collab (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host_id INTEGER REFERENCES creator(id) ON DELETE SET NULL,
            host_name TEXT NOT NULL,
            name TEXT NOT NULL,
            builders_number INTEGER NOT NULL,
            length TEXT NOT NULL,
            yt TEXT,
            music_id INTEGER REFERENCES music(id) ON DELETE SET NULL,
            music_ngid INTEGER,
            music_name TEXT NOT NULL,
            music_artist TEXT NOT NULL,
            igid INTEGER,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT,
            artist_id INTEGER REFERENCES artist(id) ON DELETE SET NULL,
            CHECK (builders_number >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_collab_name ON collab(name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_collab_artist_id ON collab(artist_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Request shadows: submitted columns only, no derived counters or
/// back-references
async fn create_request_tables(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS requestcreator (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            nationality TEXT,
            discord TEXT,
            discord_uid INTEGER,
            yt TEXT,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS requestlayout (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            creator_name TEXT NOT NULL,
            type TEXT,
            name TEXT NOT NULL,
            length TEXT NOT NULL,
            yt TEXT,
            music_ngid INTEGER,
            music_name TEXT NOT NULL,
            music_artist TEXT NOT NULL,
            igid INTEGER,
            masterlevel TEXT,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS requestcollab (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host_name TEXT NOT NULL,
            name TEXT NOT NULL,
            builders_number INTEGER NOT NULL,
            length TEXT NOT NULL,
            yt TEXT,
            music_ngid INTEGER,
            music_name TEXT NOT NULL,
            music_artist TEXT NOT NULL,
            igid INTEGER,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS requestmusic (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            artist TEXT NOT NULL,
            length TEXT NOT NULL,
            type TEXT,
            yt TEXT,
            soundcloud TEXT,
            ngid INTEGER,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS requestartist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            yt TEXT,
            soundcloud TEXT,
            registration_date TEXT NOT NULL,
            recorder_name TEXT NOT NULL,
            recorder_notes TEXT
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
