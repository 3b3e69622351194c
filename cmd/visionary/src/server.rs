//! HTTP server.
//!
//! API endpoints:
//! - GET    /                           - Liveness message
//! - POST   /generate-image             - Text-to-image
//! - POST   /enhance-prompt             - Prompt enhancement
//! - POST   /product/packshot           - Packshot
//! - POST   /product/shadow             - Shadow
//! - POST   /product/lifestyle-text     - Lifestyle scene from text
//! - POST   /product/lifestyle-image    - Lifestyle scene from a reference image
//! - POST   /edit/generative-fill       - Generative fill
//! - POST   /edit/erase                 - Erase masked object
//! - POST   /pending/{feature}/poll     - Poll an async batch (`?wait=true` for bounded wait)
//! - DELETE /pending/{feature}          - Abandon an async batch
//!
//! Feature routes take multipart forms. The `x-session-id` header scopes
//! async batches; it defaults to `default`. Batches idle longer than the
//! configured TTL are swept.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use visionary_studio::{
    EnhanceInput, EraseInput, FillInput, GenerateInput, LifestyleImageInput, LifestyleTextInput,
    OperationKind, Outcome, PackshotInput, PollOutcome, ShadowInput, Studio,
};

use crate::config::parse_addr;
use crate::form::Form;

/// Header carrying the caller's session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Session used when the header is absent.
pub const DEFAULT_SESSION: &str = "default";

/// Upload limit for a whole form.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Longest gap between two sweeps of idle batches.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

type AppState = Arc<Studio>;

// ==================== Errors ====================

/// Error response: `{"detail": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<visionary_studio::Error> for ApiError {
    fn from(err: visionary_studio::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), detail = %self.detail, "request failed");
        } else {
            warn!(status = self.status.as_u16(), detail = %self.detail, "request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult = std::result::Result<Response, ApiError>;

// ==================== Router ====================

/// Builds the router.
pub fn router(studio: Arc<Studio>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate-image", post(generate_image))
        .route("/enhance-prompt", post(enhance_prompt))
        .route("/product/packshot", post(packshot))
        .route("/product/shadow", post(shadow))
        .route("/product/lifestyle-text", post(lifestyle_text))
        .route("/product/lifestyle-image", post(lifestyle_image))
        .route("/edit/generative-fill", post(generative_fill))
        .route("/edit/erase", post(erase))
        .route("/pending/{feature}/poll", post(poll_pending))
        .route("/pending/{feature}", delete(abandon_pending))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(studio)
}

/// Start the HTTP server. With `pending_ttl` set, idle batches are swept.
pub async fn serve(addr: &str, studio: Studio, pending_ttl: Option<Duration>) -> Result<()> {
    let addr = parse_addr(addr)?;
    let studio = Arc::new(studio);
    let sweeper = pending_ttl.map(|ttl| spawn_sweeper(studio.clone(), ttl));
    let app = router(studio);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server started");
    let served = axum::serve(listener, app).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    served?;
    Ok(())
}

/// Drops pending batches not stored or polled within `ttl`.
///
/// `ttl` must be non-zero.
pub fn spawn_sweeper(studio: Arc<Studio>, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ttl.min(MAX_SWEEP_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = studio.pending().evict_idle(ttl).await;
            if evicted > 0 {
                info!(evicted, ttl_secs = ttl.as_secs(), "evicted idle pending batches");
            }
        }
    })
}

fn session(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Ready(set) => Json(json!({
            "result_url": set.first(),
            "result_urls": set.urls,
        }))
        .into_response(),
        Outcome::Accepted { urls } => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "accepted", "urls": urls })),
        )
            .into_response(),
        Outcome::Enhanced(prompt) => Json(json!({ "enhanced_prompt": prompt })).into_response(),
    }
}

// ==================== Handlers ====================

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Visionary API is running" }))
}

async fn generate_image(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let form = Form::read(multipart).await?;
    let input = GenerateInput {
        api_key: form.text("api_key"),
        prompt: form.text("prompt"),
        negative_prompt: form.text("negative_prompt"),
        num_results: form.parse("num_results")?,
        aspect_ratio: form.text("aspect_ratio"),
        style: form.text("style"),
        enhance_image: form.flag("enhance_image")?,
        seed: form.parse("seed")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.generate(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn enhance_prompt(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let form = Form::read(multipart).await?;
    let input = EnhanceInput {
        api_key: form.text("api_key"),
        prompt: form.text("prompt"),
    };
    let outcome = studio.enhance(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn packshot(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut form = Form::read(multipart).await?;
    let input = PackshotInput {
        api_key: form.text("api_key"),
        image: form.take_file("file"),
        background_color: form.text("background_color"),
        sku: form.text("sku"),
        force_rmbg: form.flag("force_rmbg")?,
        content_moderation: form.flag("content_moderation")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.packshot(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn shadow(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut form = Form::read(multipart).await?;
    let input = ShadowInput {
        api_key: form.text("api_key"),
        image: form.take_file("file"),
        shadow_type: form.text("shadow_type"),
        background_color: form.text("background_color"),
        shadow_color: form.text("shadow_color"),
        offset_x: form.parse("x_offset")?,
        offset_y: form.parse("y_offset")?,
        intensity: form.parse("shadow_intensity")?,
        blur: form.parse("shadow_blur")?,
        width: form.parse("width_scale")?,
        height: form.parse("height_scale")?,
        force_rmbg: form.flag("force_rmbg")?,
        content_moderation: form.flag("content_moderation")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.shadow(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn lifestyle_text(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut form = Form::read(multipart).await?;
    let input = LifestyleTextInput {
        api_key: form.text("api_key"),
        image: form.take_file("file"),
        scene_description: form.text("scene_description"),
        placement_type: form.text("placement_type"),
        positions: form.text("manual_positions"),
        num_results: form.parse("num_results")?,
        content_moderation: form.flag("content_moderation")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.lifestyle_by_text(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn lifestyle_image(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut form = Form::read(multipart).await?;
    let input = LifestyleImageInput {
        api_key: form.text("api_key"),
        image: form.take_file("product_file"),
        reference_image: form.take_file("ref_file"),
        placement_type: form.text("placement_type"),
        positions: form.text("manual_positions"),
        num_results: form.parse("num_results")?,
        ref_image_influence: form.parse("ref_image_influence")?,
        content_moderation: form.flag("content_moderation")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.lifestyle_by_image(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn generative_fill(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut form = Form::read(multipart).await?;
    let input = FillInput {
        api_key: form.text("api_key"),
        image: form.take_file("file"),
        mask: form.take_file("mask_file"),
        prompt: form.text("prompt"),
        negative_prompt: form.text("negative_prompt"),
        num_results: form.parse("num_results")?,
        seed: form.parse("seed")?,
        content_moderation: form.flag("content_moderation")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.fill(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

async fn erase(
    State(studio): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut form = Form::read(multipart).await?;
    let input = EraseInput {
        api_key: form.text("api_key"),
        image: form.take_file("file"),
        mask: form.take_file("mask_file"),
        content_moderation: form.flag("content_moderation")?,
        sync: form.flag("sync")?,
    };
    let outcome = studio.erase(&session(&headers), input).await?;
    Ok(outcome_response(outcome))
}

// ==================== Pending Batches ====================

#[derive(Debug, Default, Deserialize)]
struct PollQuery {
    #[serde(default)]
    wait: bool,
}

fn feature(name: &str) -> std::result::Result<OperationKind, ApiError> {
    OperationKind::from_name(name)
        .filter(OperationKind::produces_images)
        .ok_or_else(|| ApiError::bad_request(format!("unknown feature {name:?}")))
}

fn poll_response(outcome: PollOutcome) -> Response {
    let batch = &outcome.batch;
    Json(json!({
        "state": batch.state().as_str(),
        "passes": outcome.report.passes,
        "newly_ready": outcome.report.newly_ready,
        "ready": batch.ready(),
        "pending": batch.pending(),
        "result_url": batch.result(),
        "result_urls": batch.overflow(),
    }))
    .into_response()
}

async fn poll_pending(
    State(studio): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<PollQuery>,
) -> ApiResult {
    let feature = feature(&name)?;
    let outcome = studio.poll(&session(&headers), feature, query.wait).await?;
    Ok(poll_response(outcome))
}

async fn abandon_pending(
    State(studio): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> ApiResult {
    let feature = feature(&name)?;
    let batch = studio.abandon(&session(&headers), feature).await?;
    Ok(Json(json!({
        "status": "abandoned",
        "ready": batch.ready(),
        "pending": batch.pending(),
    }))
    .into_response())
}
