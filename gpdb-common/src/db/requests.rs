//! Pending request review
//!
//! Request rows are never edited: review ends with the row deleted,
//! either copied into the registry first (accept) or not (reject).

use crate::db::models::*;
use crate::db::store::{insert_entry, timestamp_now, Store};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqliteConnection};
use tracing::{debug, info};

impl Store {
    /// Globally oldest pending request across the five request tables.
    ///
    /// Ties on the timestamp are broken by kind name, then id, so repeated
    /// calls without intervening writes return the same row. Kind names sort
    /// artist, collab, creator, layout, music: an artist request submitted in
    /// the same millisecond as a music request is reviewed first.
    pub async fn oldest_pending_request(&self) -> Result<RequestRef> {
        let row = sqlx::query(
            r#"
            SELECT kind, id, registration_date FROM (
                SELECT 'artist' AS kind, id, registration_date FROM requestartist
                UNION ALL
                SELECT 'collab' AS kind, id, registration_date FROM requestcollab
                UNION ALL
                SELECT 'creator' AS kind, id, registration_date FROM requestcreator
                UNION ALL
                SELECT 'layout' AS kind, id, registration_date FROM requestlayout
                UNION ALL
                SELECT 'music' AS kind, id, registration_date FROM requestmusic
            )
            ORDER BY registration_date ASC, kind ASC, id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool())
        .await?;

        let row = row.ok_or_else(|| Error::NotFound("No pending requests".to_string()))?;
        let kind: String = row.try_get("kind")?;

        Ok(RequestRef {
            kind: kind.parse()?,
            id: row.try_get("id")?,
            submitted_at: row.try_get("registration_date")?,
        })
    }

    /// Full content of one pending request
    pub async fn request_details(&self, kind: EntityKind, id: i64) -> Result<PendingRequest> {
        let mut conn = self.pool().acquire().await?;
        fetch_request(&mut conn, kind, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No pending {} request with id {}", kind, id)))
    }

    /// Every pending request, oldest first
    pub async fn list_requests(&self) -> Result<Vec<PendingRequest>> {
        let mut conn = self.pool().acquire().await?;
        fetch_all_requests(&mut conn).await
    }

    /// Remove one pending request.
    ///
    /// Returns false when the row was already gone; accept and reject may
    /// race, so that is not an error.
    pub async fn delete_request(&self, kind: EntityKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.request_table());
        let result = sqlx::query(&sql).bind(id).execute(self.pool()).await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!(kind = %kind, id, "Pending request deleted");
        } else {
            debug!(kind = %kind, id, "Pending request already absent");
        }
        Ok(deleted)
    }

    /// Copy a pending request into the registry and delete it, in one
    /// transaction, recording `moderator` as the recorder.
    ///
    /// Returns the new registry id, or `None` if the request no longer
    /// exists (already accepted or rejected).
    pub async fn approve_request(
        &self,
        kind: EntityKind,
        id: i64,
        moderator: &str,
    ) -> Result<Option<i64>> {
        let mut tx = self.pool().begin().await?;

        let Some(request) = fetch_request(&mut tx, kind, id).await? else {
            tx.rollback().await?;
            debug!(kind = %kind, id, "Approval skipped, request already processed");
            return Ok(None);
        };

        let submission = request.submission.with_recorder(moderator);
        let stamp = timestamp_now();
        let new_id = insert_entry(&mut tx, kind.table(), &submission, None, &stamp).await?;

        let sql = format!("DELETE FROM {} WHERE id = ?", kind.request_table());
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;

        tx.commit().await?;

        info!(
            kind = %kind,
            request_id = id,
            registry_id = new_id,
            moderator,
            name = submission.name(),
            "Pending request approved"
        );
        Ok(Some(new_id))
    }
}

/// Pending requests of every kind, ordered like `oldest_pending_request`
pub(crate) async fn fetch_all_requests(conn: &mut SqliteConnection) -> Result<Vec<PendingRequest>> {
    let mut requests = Vec::new();

    for kind in EntityKind::ALL {
        let sql = format!("SELECT * FROM {} ORDER BY id", kind.request_table());
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
        for row in &rows {
            requests.push(pending_from_row(kind, row)?);
        }
    }

    requests.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.kind().cmp(&b.kind()))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(requests)
}

async fn fetch_request(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: i64,
) -> Result<Option<PendingRequest>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", kind.request_table());
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.map(|row| pending_from_row(kind, &row)).transpose()
}

fn pending_from_row(kind: EntityKind, row: &SqliteRow) -> Result<PendingRequest> {
    let submission = match kind {
        EntityKind::Creator => Submission::Creator(NewCreator::from_row(row)?),
        EntityKind::Layout => Submission::Layout(NewLayout::from_row(row)?),
        EntityKind::Collab => Submission::Collab(NewCollab::from_row(row)?),
        EntityKind::Music => Submission::Music(NewMusic::from_row(row)?),
        EntityKind::Artist => Submission::Artist(NewArtist::from_row(row)?),
    };

    Ok(PendingRequest {
        id: row.try_get("id")?,
        submitted_at: row.try_get("registration_date")?,
        submission,
    })
}
