//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::app::mistakes::{upload_mistake, UploadError};
use crate::web::{
    auth::{LoginRequest, UserResponse},
    protocol::{LanguageCode, ModeName, SectionName},
    state::{lock, AppState},
    views::{
        Chrome, LearningScreen, MistakeCard, MistakeDetail, NavItem, NotePanel, Screen, SlideCard,
        UnitCard, View,
    },
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use study_aid_core::{domain::WrongAnswer, locale::strings};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        view_handler,
        list_mistakes_handler,
        get_mistake_handler,
        upload_mistake_handler,
        podcast_audio_handler,
        sketch_handler,
    ),
    components(
        schemas(
            LoginRequest, UserResponse, MistakeResponse, View, Chrome, NavItem, Screen,
            UnitCard, LearningScreen, SlideCard, NotePanel, MistakeCard, MistakeDetail,
            LanguageCode, SectionName, ModeName
        )
    ),
    tags(
        (name = "AI Study Mate API", description = "API endpoints for the textbook study companion.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A stored mistake record.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MistakeResponse {
    pub id: String,
    pub image_url: String,
    pub analysis: String,
    pub correction: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl From<&WrongAnswer> for MistakeResponse {
    fn from(item: &WrongAnswer) -> Self {
        Self {
            id: item.id.clone(),
            image_url: item.image_url.clone(),
            analysis: item.analysis.clone(),
            correction: item.correction.clone(),
            timestamp: item.timestamp,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Returns the screen the client should currently render.
#[utoipa::path(
    get,
    path = "/view",
    responses((status = 200, description = "The current view", body = View))
)]
pub async fn view_handler(State(app_state): State<Arc<AppState>>) -> Json<View> {
    Json(app_state.current_view())
}

/// Lists the mistake log, newest first.
#[utoipa::path(
    get,
    path = "/mistakes",
    responses(
        (status = 200, description = "The mistake log", body = [MistakeResponse]),
        (status = 401, description = "No user is logged in")
    )
)]
pub async fn list_mistakes_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<MistakeResponse>> {
    let mistakes = lock(&app_state.mistakes);
    Json(mistakes.items().iter().map(MistakeResponse::from).collect())
}

#[utoipa::path(
    get,
    path = "/mistakes/{id}",
    params(("id" = String, Path, description = "The mistake record id")),
    responses(
        (status = 200, description = "The mistake record", body = MistakeResponse),
        (status = 401, description = "No user is logged in"),
        (status = 404, description = "No such record")
    )
)]
pub async fn get_mistake_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MistakeResponse>, (StatusCode, String)> {
    let mistakes = lock(&app_state.mistakes);
    mistakes
        .get(&id)
        .map(|item| Json(MistakeResponse::from(item)))
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Mistake {} not found", id)))
}

/// Uploads a photographed wrong answer for analysis.
///
/// Accepts a multipart/form-data request with a single image part. On success the
/// record is prepended to the log and opened in the detail view.
#[utoipa::path(
    post,
    path = "/mistakes",
    request_body(content_type = "multipart/form-data", description = "The image to analyze."),
    responses(
        (status = 201, description = "Mistake analyzed and recorded", body = MistakeResponse),
        (status = 400, description = "Bad request (e.g., missing file)"),
        (status = 401, description = "No user is logged in"),
        (status = 409, description = "Another analysis is still running"),
        (status = 502, description = "The analysis failed; the log is unchanged")
    )
)]
pub async fn upload_mistake_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (content_type, data) = if let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        (content_type, data)
    } else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        ));
    };

    let language = app_state.shell.snapshot().language;
    info!(bytes = data.len(), "Mistake upload received");

    let result = upload_mistake(
        &app_state.mistakes,
        app_state.services.content.as_ref(),
        &app_state.services.storage,
        (content_type.as_deref(), &data),
        language,
        || app_state.publish_view(),
    )
    .await;

    match result {
        Ok(record) => {
            app_state.publish_view();
            Ok((StatusCode::CREATED, Json(MistakeResponse::from(&record))))
        }
        Err(UploadError::Busy) => Err((
            StatusCode::CONFLICT,
            "Another analysis is still running".to_string(),
        )),
        Err(UploadError::Analysis(err)) => {
            error!("Mistake analysis failed: {:?}", err);
            let message = strings(language).analysis_failed;
            app_state.alert(message);
            app_state.publish_view();
            Err((StatusCode::BAD_GATEWAY, message.to_string()))
        }
    }
}

/// Returns the cached podcast narration of the open unit.
#[utoipa::path(
    get,
    path = "/learning/audio",
    responses(
        (status = 200, description = "WAV audio", content_type = "audio/wav"),
        (status = 401, description = "No user is logged in"),
        (status = 404, description = "No narration has been generated")
    )
)]
pub async fn podcast_audio_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let learning = lock(&app_state.learning);
    let wav = learning
        .as_ref()
        .and_then(|viewer| viewer.audio())
        .map(|audio| audio.wav.clone())
        .ok_or_else(|| (StatusCode::NOT_FOUND, "No narration available".to_string()))?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], wav))
}

/// Returns the current sketch as a PNG.
#[utoipa::path(
    get,
    path = "/sketch",
    responses(
        (status = 200, description = "PNG image", content_type = "image/png"),
        (status = 401, description = "No user is logged in"),
        (status = 500, description = "Encoding failed")
    )
)]
pub async fn sketch_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let png = lock(&app_state.sketch).export_png().map_err(|e| {
        error!("Failed to export sketch: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to export sketch".to_string())
    })?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
