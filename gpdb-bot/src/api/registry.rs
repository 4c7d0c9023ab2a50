//! Read-only registry listings

use axum::{
    extract::{Path, State},
    Json,
};
use gpdb_common::db::EntityKind;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub entity: String,
    pub count: usize,
    pub rows: Vec<Value>,
}

fn to_rows<T: Serialize>(items: Vec<T>) -> ApiResult<Vec<Value>> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(|e| ApiError::Internal(e.to_string())))
        .collect()
}

/// GET /registry/:entity
pub async fn list_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> ApiResult<Json<ListingResponse>> {
    let kind: EntityKind = entity.parse()?;

    let rows = match kind {
        EntityKind::Creator => to_rows(state.store.list_creators().await?)?,
        EntityKind::Layout => to_rows(state.store.list_layouts().await?)?,
        EntityKind::Collab => to_rows(state.store.list_collabs().await?)?,
        EntityKind::Music => to_rows(state.store.list_musics().await?)?,
        EntityKind::Artist => to_rows(state.store.list_artists().await?)?,
    };

    Ok(Json(ListingResponse {
        entity: kind.to_string(),
        count: rows.len(),
        rows,
    }))
}

/// GET /registry/requests
///
/// Pending requests of every kind, oldest first.
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<Json<ListingResponse>> {
    let rows = to_rows(state.store.list_requests().await?)?;

    Ok(Json(ListingResponse {
        entity: "request".to_string(),
        count: rows.len(),
        rows,
    }))
}
