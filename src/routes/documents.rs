//! Documents API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Document, NewDocument};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents).post(import_document))
        .route(
            "/:id",
            get(get_document).patch(rename_document).delete(delete_document),
        )
}

/// Document listing entry, without the body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSummary {
    id: Uuid,
    title: String,
    kind: &'static str,
    length: usize,
    highlight_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RenameRequest {
    title: String,
}

async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    let summaries = state
        .documents()
        .list()
        .into_iter()
        .map(|d| DocumentSummary {
            id: d.id,
            title: d.title.clone(),
            kind: d.content.kind(),
            length: d.content.utf16_len(),
            highlight_count: state.highlights().count(d.id),
            source_url: d.source_url.clone(),
            created_at: d.created_at,
            modified_at: d.modified_at,
        })
        .collect();
    Json(summaries)
}

async fn import_document(
    State(state): State<AppState>,
    Json(data): Json<NewDocument>,
) -> Result<(StatusCode, Json<Document>)> {
    let document = state.documents().import(data).await?;
    Ok((StatusCode::CREATED, Json(document.as_ref().clone())))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>> {
    let document = state
        .documents()
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Document not found: {}", id)))?;
    Ok(Json(document.as_ref().clone()))
}

async fn rename_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<RenameRequest>,
) -> Result<Json<Document>> {
    let document = state.documents().rename(id, &data.title).await?;
    Ok(Json(document.as_ref().clone()))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.delete_document(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Document not found: {}", id)))
    }
}
