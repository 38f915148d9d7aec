//! Highlights API routes
//!
//! Adds go through [`HighlightEditor`] so a selection is trimmed the same
//! way an interactive view would trim it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::compose::{compose, HtmlConfig, StyledText};
use crate::document::Document;
use crate::error::{AppError, Result};
use crate::highlights::{DocumentHighlight, HighlightEditor, TapOutcome};
use crate::range::TextRange;
use crate::spans::{Color, Highlight};
use crate::state::AppState;

/// Create the highlights router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_highlights).delete(clear_all_highlights))
        .route(
            "/document/:document_id",
            get(list_document_highlights)
                .post(add_highlight)
                .put(replace_highlights)
                .delete(clear_document_highlights),
        )
        .route("/document/:document_id/:highlight_id", delete(delete_highlight))
        .route("/document/:document_id/remove-intersecting", post(remove_intersecting))
        .route("/document/:document_id/render", get(render_document))
        .route("/document/:document_id/render.html", get(render_document_html))
        .route("/document/:document_id/hit", get(hit_test))
}

/// Raw range from a client; negative values are rejected
#[derive(Deserialize)]
struct RangeRequest {
    start: i64,
    length: i64,
}

impl RangeRequest {
    fn to_range(&self) -> Result<TextRange> {
        TextRange::from_raw(self.start, self.length).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid range: {}+{}", self.start, self.length))
        })
    }
}

#[derive(Deserialize)]
struct AddHighlightRequest {
    #[serde(flatten)]
    range: RangeRequest,
    color: Color,
}

#[derive(Deserialize)]
struct ColorQuery {
    color: Option<String>,
}

#[derive(Deserialize)]
struct HitQuery {
    offset: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemovedResponse {
    removed: Vec<Uuid>,
}

#[derive(Serialize)]
struct ClearedResponse {
    cleared: u64,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum HitResponse {
    #[serde(rename_all = "camelCase")]
    Link { destination: String },
    #[serde(rename_all = "camelCase")]
    Highlight { highlight_id: Uuid },
    None,
}

fn document(state: &AppState, id: Uuid) -> Result<Arc<Document>> {
    state
        .documents()
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Document not found: {}", id)))
}

fn editor(state: &AppState, document_id: Uuid) -> Result<HighlightEditor> {
    Ok(HighlightEditor::new(
        document(state, document_id)?,
        state.highlights().clone(),
        state.rules(),
        state.style(),
    ))
}

/// List every highlight, optionally only those of one color
async fn list_all_highlights(
    State(state): State<AppState>,
    Query(query): Query<ColorQuery>,
) -> Json<Vec<DocumentHighlight>> {
    let highlights = match query.color {
        Some(hex) => state.highlights().highlights_with_color(&hex),
        None => state.highlights().all_highlights(),
    };
    Json(highlights)
}

async fn clear_all_highlights(State(state): State<AppState>) -> Result<Json<ClearedResponse>> {
    let cleared = state.clear_highlights().await?;
    Ok(Json(ClearedResponse { cleared }))
}

async fn list_document_highlights(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<Highlight>>> {
    document(&state, document_id)?;
    Ok(Json(state.highlights().highlights(document_id)))
}

/// Highlight a selection; a selection that trims to nothing creates nothing
async fn add_highlight(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(data): Json<AddHighlightRequest>,
) -> Result<(StatusCode, Json<Option<Highlight>>)> {
    let mut editor = editor(&state, document_id)?;
    editor.select(data.range.to_range()?);

    match editor.add_highlight(data.color).await? {
        Some(highlight) => Ok((StatusCode::CREATED, Json(Some(highlight)))),
        None => Ok((StatusCode::OK, Json(None))),
    }
}

async fn replace_highlights(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(highlights): Json<Vec<Highlight>>,
) -> Result<Json<Vec<Highlight>>> {
    state
        .highlights()
        .replace_all(&highlights, document_id)
        .await?;
    Ok(Json(state.highlights().highlights(document_id)))
}

async fn clear_document_highlights(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<ClearedResponse>> {
    document(&state, document_id)?;
    let cleared = state.clear_document_highlights(document_id).await?;
    Ok(Json(ClearedResponse { cleared }))
}

async fn delete_highlight(
    State(state): State<AppState>,
    Path((document_id, highlight_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    if state.highlights().remove(highlight_id, document_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Highlight not found: {}", highlight_id)))
    }
}

async fn remove_intersecting(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(data): Json<RangeRequest>,
) -> Result<Json<RemovedResponse>> {
    let mut editor = editor(&state, document_id)?;
    editor.select(data.to_range()?);
    let removed = editor.remove_in_selection().await?;
    Ok(Json(RemovedResponse { removed }))
}

fn composed(state: &AppState, document_id: Uuid) -> Result<StyledText> {
    let document = document(state, document_id)?;
    let text = document.content.text();
    let rules = state.rules();
    Ok(compose(
        &document.content,
        &rules.detect_links(text),
        &rules.compute_indents(text),
        &state.highlights().highlights(document_id),
        &state.style(),
    ))
}

/// Composed attribute runs as JSON
async fn render_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<StyledText>> {
    Ok(Json(composed(&state, document_id)?))
}

async fn render_document_html(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Html<String>> {
    Ok(Html(composed(&state, document_id)?.to_html(&HtmlConfig::default())))
}

/// Resolve a tap at a UTF-16 offset
async fn hit_test(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(query): Query<HitQuery>,
) -> Result<Json<HitResponse>> {
    let mut editor = editor(&state, document_id)?;
    let response = match editor.tap(query.offset) {
        TapOutcome::Link(destination) => HitResponse::Link { destination },
        TapOutcome::ConfirmRemoval(highlight_id) => HitResponse::Highlight { highlight_id },
        TapOutcome::Nothing => HitResponse::None,
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::routes::{app, test_support::{send, send_raw}};
    use crate::state::test_state;

    async fn setup(text: &str) -> (axum::Router, String) {
        let app = app(test_state().await);
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({ "title": "Doc", "content": { "type": "plain", "text": text } })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        (app, format!("/api/v1/highlights/document/{}", id))
    }

    #[tokio::test]
    async fn test_add_trims_and_lists() {
        let (app, base) = setup("  padded words  ").await;

        let (status, added) = send(
            &app,
            Method::POST,
            &base,
            Some(json!({ "start": 0, "length": 16, "color": "#FEF3B5" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(added["range"], json!({ "start": 2, "length": 12 }));

        let (status, list) = send(&app, Method::GET, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, all) = send(&app, Method::GET, "/api/v1/highlights?color=fef3b5", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
        let (_, none) = send(&app, Method::GET, "/api/v1/highlights?color=%23000000", None).await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_whitespace_only_creates_nothing() {
        let (app, base) = setup("a     b").await;
        let (status, body) = send(
            &app,
            Method::POST,
            &base,
            Some(json!({ "start": 1, "length": 5, "color": "#FEF3B5" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_negative_range_rejected() {
        let (app, base) = setup("text").await;
        let (status, _) = send(
            &app,
            Method::POST,
            &base,
            Some(json!({ "start": -1, "length": 2, "color": "#FEF3B5" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let app = app(test_state().await);
        let uri = format!("/api/v1/highlights/document/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_hit_render_and_delete() {
        let (app, base) = setup("See Article 2 and this note.").await;
        let (_, added) = send(
            &app,
            Method::POST,
            &base,
            Some(json!({ "start": 18, "length": 9, "color": "#C8E6C9" })),
        )
        .await;
        let id = added["id"].as_str().unwrap().to_string();

        let (_, hit) = send(&app, Method::GET, &format!("{}/hit?offset=6", base), None).await;
        assert_eq!(hit, json!({ "kind": "link", "destination": "folio://article/2" }));
        let (_, hit) = send(&app, Method::GET, &format!("{}/hit?offset=20", base), None).await;
        assert_eq!(hit, json!({ "kind": "highlight", "highlightId": id }));
        let (_, hit) = send(&app, Method::GET, &format!("{}/hit?offset=0", base), None).await;
        assert_eq!(hit, json!({ "kind": "none" }));

        let (status, rendered) = send(&app, Method::GET, &format!("{}/render", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rendered["text"], "See Article 2 and this note.");

        let (status, html) =
            send_raw(&app, Method::GET, &format!("{}/render.html", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(&id));

        let uri = format!("{}/{}", base, id);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_replace_and_remove_intersecting() {
        let (app, base) = setup("one two three").await;
        let first = uuid::Uuid::new_v4();
        let (status, replaced) = send(
            &app,
            Method::PUT,
            &base,
            Some(json!([
                { "id": first, "range": { "start": 0, "length": 3 }, "color": "#FEF3B5", "createdAt": "2025-01-01T00:00:00Z" },
                { "id": uuid::Uuid::new_v4(), "range": { "start": 8, "length": 5 }, "color": "#BBDEFB", "createdAt": "2025-01-01T00:00:01Z" }
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced.as_array().unwrap().len(), 2);

        let (status, removed) = send(
            &app,
            Method::POST,
            &format!("{}/remove-intersecting", base),
            Some(json!({ "start": 1, "length": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removed["removed"], json!([first]));
    }

    #[tokio::test]
    async fn test_clear_document_and_all() {
        let (app, base) = setup("clear these words").await;
        for (start, length) in [(0, 5), (6, 5)] {
            send(
                &app,
                Method::POST,
                &base,
                Some(json!({ "start": start, "length": length, "color": "#FEF3B5" })),
            )
            .await;
        }

        let (status, cleared) = send(&app, Method::DELETE, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared, json!({ "cleared": 2 }));
        let (_, list) = send(&app, Method::GET, &base, None).await;
        assert!(list.as_array().unwrap().is_empty());

        send(
            &app,
            Method::POST,
            &base,
            Some(json!({ "start": 12, "length": 5, "color": "#FEF3B5" })),
        )
        .await;
        let (status, cleared) = send(&app, Method::DELETE, "/api/v1/highlights", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared, json!({ "cleared": 1 }));

        let missing = format!("/api/v1/highlights/document/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::DELETE, &missing, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
