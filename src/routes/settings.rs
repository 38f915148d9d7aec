//! Reader settings API routes

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::compose::StyleConfig;
use crate::error::Result;
use crate::settings::{ReaderSettings, Theme};
use crate::state::AppState;

/// Create the settings router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings).put(update_settings))
        .route("/themes", get(list_themes))
        .route("/reset", post(reset_settings))
        .route("/flush", post(flush_settings))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsResponse {
    settings: ReaderSettings,
    available_themes: Vec<&'static str>,
    style: StyleConfig,
}

#[derive(Serialize)]
struct ThemeEntry {
    name: &'static str,
    theme: Theme,
}

fn response(state: &AppState) -> SettingsResponse {
    SettingsResponse {
        settings: state.settings().current(),
        available_themes: ReaderSettings::available_themes(),
        style: state.style(),
    }
}

async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(response(&state))
}

/// Apply now; the write to disk is debounced
async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<ReaderSettings>,
) -> Result<Json<SettingsResponse>> {
    state.settings().update(settings).await?;
    Ok(Json(response(&state)))
}

async fn reset_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>> {
    state.settings().reset().await?;
    Ok(Json(response(&state)))
}

async fn flush_settings(State(state): State<AppState>) -> Result<StatusCode> {
    state.settings().flush_now().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_themes() -> Json<Vec<ThemeEntry>> {
    Json(
        Theme::presets()
            .into_iter()
            .map(|(name, theme)| ThemeEntry { name, theme })
            .collect(),
    )
}
