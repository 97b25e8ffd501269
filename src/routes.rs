use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use include_dir::{include_dir, Dir};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    client::{AnalysisBackend, Selection},
    error::GlamoError,
    models::UploadableImage,
    preprocess::{self, PreprocessOptions},
    render::{render, render_suggestion, RenderedSections},
    submission::{SubmissionError, SubmissionRegistry},
};

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

pub const SESSION_HEADER: &str = "x-glamo-session";
const IN_FLIGHT_MESSAGE: &str = "A submission is already in progress. Please wait for it to finish.";
const NO_IMAGE_MESSAGE: &str = "No image uploaded.";
/// Camera originals are routinely larger than axum's 2 MB default.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn AnalysisBackend>,
    pub submissions: Arc<SubmissionRegistry>,
    pub preprocess: PreprocessOptions,
}

impl AppState {
    pub fn new(backend: Arc<dyn AnalysisBackend>, preprocess: PreprocessOptions) -> Self {
        Self { backend, submissions: SubmissionRegistry::new(), preprocess }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/*path", get(static_asset))
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/suggest", post(suggest))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    tracing::info!("➡️ {} {}", method, uri);
    let response = next.run(request).await;
    tracing::info!("⬅️ {} {} - {}", method, uri, response.status());
    response
}

#[derive(Debug)]
pub enum ApiError {
    Glamo(GlamoError),
    Submission(SubmissionError),
}

impl From<GlamoError> for ApiError {
    fn from(e: GlamoError) -> Self { ApiError::Glamo(e) }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self { ApiError::Submission(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Submission(SubmissionError::InFlight { .. }) => (StatusCode::CONFLICT, IN_FLIGHT_MESSAGE.to_string()),
            ApiError::Glamo(e) => {
                let status = match e {
                    GlamoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    GlamoError::Server { status, .. } if status.is_client_error() => StatusCode::BAD_REQUEST,
                    GlamoError::Server { .. } | GlamoError::Transport(_) => StatusCode::BAD_GATEWAY,
                    GlamoError::Decode(_) | GlamoError::Encode(_) | GlamoError::Clipboard => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.user_message())
            }
        };
        tracing::warn!("❌ Request failed ({}): {:?}", status, self);
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub sections: RenderedSections,
    pub html: String,
    /// Whether the uploaded payload was the re-encoded image.
    pub compressed: bool,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub result: String,
    pub html: String,
}

struct Upload {
    image: UploadableImage,
    selection: Selection,
}

fn invalid(e: impl std::fmt::Display) -> GlamoError { GlamoError::InvalidRequest(e.to_string()) }

fn non_blank(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, GlamoError> {
    let mut image = None;
    let mut selection = Selection::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let media_type = field
                    .content_type()
                    .filter(|ct| ct.contains('/'))
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(invalid)?;
                image = Some(UploadableImage { bytes, media_type, file_name });
            }
            "selected_app" => selection.selected_app = non_blank(field.text().await.map_err(invalid)?),
            "style" => selection.style = non_blank(field.text().await.map_err(invalid)?),
            _ => {}
        }
    }

    match image {
        Some(image) if !image.bytes.is_empty() => Ok(Upload { image, selection }),
        _ => Err(GlamoError::InvalidRequest(NO_IMAGE_MESSAGE.to_string())),
    }
}

/// Session from the request header; requests without one never collide.
fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let session = session_id(&headers);
    let submission = state.submissions.begin(&session)?;
    tracing::info!("🚀 Submission {} started for session {}", submission.id(), session);

    let upload = read_upload(multipart).await?;
    let photo = preprocess::process(upload.image, state.preprocess).await;
    let result = state.backend.analyze(&photo, &upload.selection).await?;

    let sections = render(&result);
    let html = sections.to_html();
    submission.succeed();
    Ok(Json(AnalyzeResponse { sections, html, compressed: photo.is_compressed() }))
}

pub async fn suggest(State(state): State<AppState>, multipart: Multipart) -> Result<Json<SuggestResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let photo = preprocess::process(upload.image, state.preprocess).await;
    let suggestion = state.backend.suggest_style(&photo).await?;
    let html = render_suggestion(&suggestion);
    Ok(Json(SuggestResponse { result: suggestion.result, html }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn index() -> Response {
    match STATIC_DIR.get_file("index.html").and_then(|f| f.contents_utf8()) {
        Some(page) => Html(page).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    match STATIC_DIR.get_file(&path) {
        Some(file) => ([(header::CONTENT_TYPE, content_type(&path))], file.contents()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
