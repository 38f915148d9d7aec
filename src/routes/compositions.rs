//! Compositions API routes

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compositions::{export, Composition, ExportFormat, SortMode};
use crate::error::{AppError, Result};
use crate::state::AppState;

const PREVIEW_FRAGMENTS: usize = 3;
const PREVIEW_LEN: usize = 60;

/// Create the compositions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_compositions).post(create_composition))
        .route(
            "/:id",
            get(get_composition)
                .patch(update_composition)
                .delete(delete_composition),
        )
        .route("/:id/fragments", post(add_fragments))
        .route("/:id/fragments/:fragment_id", delete(remove_fragment))
        .route("/:id/fragments/:fragment_id/move", post(move_fragment))
        .route("/:id/reorder", post(reorder_fragments))
        .route("/:id/export", get(export_composition))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompositionSummary {
    id: Uuid,
    title: String,
    sort_mode: SortMode,
    fragment_count: usize,
    preview: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CreateRequest {
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    title: Option<String>,
    sort_mode: Option<SortMode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFragmentsRequest {
    highlight_ids: Vec<Uuid>,
}

#[derive(Serialize)]
struct AddFragmentsResponse {
    added: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderRequest {
    from_offsets: Vec<usize>,
    to_offset: usize,
}

#[derive(Deserialize)]
struct MoveRequest {
    index: usize,
}

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(default = "default_format")]
    format: ExportFormat,
}

fn default_format() -> ExportFormat {
    ExportFormat::Markdown
}

fn composition(state: &AppState, id: Uuid) -> Result<Composition> {
    state
        .compositions()
        .composition(id)
        .ok_or_else(|| AppError::NotFound(format!("Composition not found: {}", id)))
}

/// A composition with its fragments in display order
fn sorted(mut composition: Composition) -> Composition {
    composition.fragments = composition.sorted_fragments();
    composition
}

async fn list_compositions(State(state): State<AppState>) -> Json<Vec<CompositionSummary>> {
    let summaries = state
        .compositions()
        .compositions()
        .into_iter()
        .map(|c| CompositionSummary {
            id: c.id,
            fragment_count: c.fragment_count(),
            preview: c.preview_text(PREVIEW_FRAGMENTS, PREVIEW_LEN),
            title: c.title,
            sort_mode: c.sort_mode,
            created_at: c.created_at,
            modified_at: c.modified_at,
        })
        .collect();
    Json(summaries)
}

async fn create_composition(
    State(state): State<AppState>,
    Json(data): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Composition>)> {
    let id = state.compositions().create_composition(&data.title).await?;
    Ok((StatusCode::CREATED, Json(composition(&state, id)?)))
}

async fn get_composition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Composition>> {
    Ok(Json(sorted(composition(&state, id)?)))
}

async fn update_composition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateRequest>,
) -> Result<Json<Composition>> {
    state
        .compositions()
        .update(id, data.title.as_deref(), data.sort_mode)
        .await?;
    Ok(Json(sorted(composition(&state, id)?)))
}

async fn delete_composition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.compositions().delete_composition(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Composition not found: {}", id)))
    }
}

async fn add_fragments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<AddFragmentsRequest>,
) -> Result<Json<AddFragmentsResponse>> {
    let added = state
        .compositions()
        .add_highlights(&data.highlight_ids, id)
        .await?;
    Ok(Json(AddFragmentsResponse { added }))
}

async fn remove_fragment(
    State(state): State<AppState>,
    Path((id, fragment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    if state.compositions().remove_fragment(fragment_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Fragment not found: {}", fragment_id)))
    }
}

async fn reorder_fragments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<ReorderRequest>,
) -> Result<Json<Composition>> {
    state
        .compositions()
        .reorder_fragments(id, &data.from_offsets, data.to_offset)
        .await?;
    Ok(Json(sorted(composition(&state, id)?)))
}

async fn move_fragment(
    State(state): State<AppState>,
    Path((id, fragment_id)): Path<(Uuid, Uuid)>,
    Json(data): Json<MoveRequest>,
) -> Result<Json<Composition>> {
    state
        .compositions()
        .move_fragment(fragment_id, id, data.index)
        .await?;
    Ok(Json(sorted(composition(&state, id)?)))
}

async fn export_composition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let composition = composition(&state, id)?;
    let body = export(&composition, query.format, &state.style());
    let disposition = format!(
        "inline; filename=\"{}.{}\"",
        filename_stem(&composition.title),
        query.format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, query.format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Title made safe for a quoted header parameter
fn filename_stem(title: &str) -> String {
    title
        .chars()
        .filter(|c| *c != '"' && *c != '\\')
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use super::filename_stem;
    use crate::routes::{app, test_support::{send, send_raw}};
    use crate::state::test_state;

    struct Setup {
        app: axum::Router,
        highlights: Vec<String>,
        composition: String,
    }

    async fn setup() -> Setup {
        let app = app(test_state().await);
        let (_, doc) = send(
            &app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({ "title": "Source", "content": { "type": "plain", "text": "alpha beta gamma" } })),
        )
        .await;
        let base = format!("/api/v1/highlights/document/{}", doc["id"].as_str().unwrap());

        let mut highlights = Vec::new();
        for (start, length) in [(0, 5), (6, 4), (11, 5)] {
            let (_, h) = send(
                &app,
                Method::POST,
                &base,
                Some(json!({ "start": start, "length": length, "color": "#FEF3B5" })),
            )
            .await;
            highlights.push(h["id"].as_str().unwrap().to_string());
        }

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/compositions",
            Some(json!({ "title": "Excerpts" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let composition = format!("/api/v1/compositions/{}", created["id"].as_str().unwrap());

        Setup {
            app,
            highlights,
            composition,
        }
    }

    fn snippets(composition: &Value) -> Vec<String> {
        composition["fragments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["textSnippet"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_add_reorder_and_export() {
        let s = setup().await;
        let uri = format!("{}/fragments", s.composition);

        let (_, added) = send(&s.app, Method::POST, &uri, Some(json!({ "highlightIds": s.highlights }))).await;
        assert_eq!(added["added"], 3);
        let (_, added) = send(&s.app, Method::POST, &uri, Some(json!({ "highlightIds": [s.highlights[0]] }))).await;
        assert_eq!(added["added"], 0);

        let (status, reordered) = send(
            &s.app,
            Method::POST,
            &format!("{}/reorder", s.composition),
            Some(json!({ "fromOffsets": [2], "toOffset": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snippets(&reordered), vec!["gamma", "alpha", "beta"]);

        let (status, text) = send_raw(
            &s.app,
            Method::GET,
            &format!("{}/export?format=text", s.composition),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "gamma\n\n---\n\nalpha\n\n---\n\nbeta");

        let (_, markdown) = send_raw(&s.app, Method::GET, &format!("{}/export", s.composition), None).await;
        assert!(markdown.starts_with("# Excerpts\n\n> gamma\n"));
        assert!(markdown.contains("> — *Source*"));
    }

    #[tokio::test]
    async fn test_move_and_remove_fragment() {
        let s = setup().await;
        send(
            &s.app,
            Method::POST,
            &format!("{}/fragments", s.composition),
            Some(json!({ "highlightIds": s.highlights })),
        )
        .await;

        let (_, current) = send(&s.app, Method::GET, &s.composition, None).await;
        let first = current["fragments"][0]["id"].as_str().unwrap().to_string();

        let (status, moved) = send(
            &s.app,
            Method::POST,
            &format!("{}/fragments/{}/move", s.composition, first),
            Some(json!({ "index": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snippets(&moved), vec!["beta", "gamma", "alpha"]);

        let uri = format!("{}/fragments/{}", s.composition, first);
        let (status, _) = send(&s.app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&s.app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_list_and_delete() {
        let s = setup().await;
        let (status, updated) = send(
            &s.app,
            Method::PATCH,
            &s.composition,
            Some(json!({ "title": "Renamed", "sortMode": "source" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Renamed");
        assert_eq!(updated["sortMode"], "source");

        let (_, list) = send(&s.app, Method::GET, "/api/v1/compositions", None).await;
        assert_eq!(list[0]["title"], "Renamed");
        assert_eq!(list[0]["fragmentCount"], 0);

        let (status, _) = send(&s.app, Method::DELETE, &s.composition, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&s.app, Method::GET, &s.composition, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_blank_title_rejected() {
        let s = setup().await;
        let (status, _) = send(&s.app, Method::POST, "/api/v1/compositions", Some(json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_filename_stem() {
        assert_eq!(filename_stem("Notes"), "Notes");
        assert_eq!(filename_stem("Say \"hi\"\\now"), "Say hinow");
        assert_eq!(filename_stem("Two\nlines\tand\u{7f}"), "Two lines and ");
        assert_eq!(filename_stem("Résumé"), "Résumé");
    }

    #[tokio::test]
    async fn test_export_with_control_characters_in_title() {
        let s = setup().await;
        let (status, _) = send(
            &s.app,
            Method::PATCH,
            &s.composition,
            Some(json!({ "title": "First line\nsecond\rline" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, text) = send_raw(
            &s.app,
            Method::GET,
            &format!("{}/export?format=text", s.composition),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_patch_with_blank_title_changes_nothing() {
        let s = setup().await;
        let (status, _) = send(
            &s.app,
            Method::PATCH,
            &s.composition,
            Some(json!({ "title": "   ", "sortMode": "color" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, current) = send(&s.app, Method::GET, &s.composition, None).await;
        assert_eq!(current["title"], "Excerpts");
        assert_eq!(current["sortMode"], "manual");
    }
}
