//! Upload wizard endpoints
//!
//! upload → (geocode) → preview → update. Step flags, the attempt counter
//! and retained rows live on the caller's `UploadSession`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rmap_common::db::{fetch_listings, fetch_unmapped, set_coordinates, ListingTable};
use rmap_common::schema::{ListingSchema, ValidationMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::session::{acting_user, load_session, store_session, with_session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::ingest::{IngestError, UploadedFile};
use crate::services::{EmailMessage, GeocodeError};
use crate::AppState;

/// Multipart body limit for listing uploads
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// GET /listings/upload
///
/// Starts (or restarts) the wizard: step flags are cleared.
pub async fn start_upload(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (mut session, is_new) = load_session(&state, &headers).await;
    session.restart();
    let status = session.status();
    let id = session.session_id;
    store_session(&state, session).await;

    with_session_cookie(Json(json!({ "session": status })), id, is_new)
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes")
}

/// POST /listings/upload
///
/// Multipart fields: `listings` (file, optional on retry) and
/// `disableStrict` (escape hatch checkbox).
pub async fn post_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut upload = None;
    let mut relaxed_requested = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("listings") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
                if !bytes.is_empty() {
                    upload = Some(UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some("disableStrict") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
                relaxed_requested = is_checked(&text);
            }
            _ => {}
        }
    }

    let (mut session, is_new) = load_session(&state, &headers).await;
    let result = state.staging.run(&mut session, upload, relaxed_requested).await;
    let status = session.status();
    let id = session.session_id;
    store_session(&state, session).await;

    let response = match result {
        Ok(report) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "staged",
                "report": report,
                "session": status,
            })),
        ),
        Err(IngestError::Parse(reason)) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({
                "error": {
                    "code": "FILE_UNREADABLE",
                    "message": format!("The uploaded file could not be read: {}", reason),
                },
                "session": status,
            })),
        ),
        Err(IngestError::Validation(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": {
                    "code": "VALIDATION_FAILED",
                    "message": format!("{} problem(s) found in the uploaded listings", errors.len()),
                },
                "errors": errors,
                "show_escape_hatch": status.show_escape_hatch,
                "session": status,
            })),
        ),
        Err(IngestError::Persistence(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": {
                    "code": "STAGING_FAILED",
                    "message": "The listings could not be staged. Please try again.",
                },
                "session": status,
            })),
        ),
        Err(IngestError::Timeout(limit)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": {
                    "code": "STAGING_TIMEOUT",
                    "message": format!(
                        "Staging did not finish within {} seconds. Please try again.",
                        limit.as_secs()
                    ),
                },
                "session": status,
            })),
        ),
    };

    Ok(with_session_cookie(response, id, is_new))
}

#[derive(Debug, Default, Serialize)]
pub struct GeocodeSummary {
    pub attempted: usize,
    pub geocoded: usize,
    /// Rows the geocoder could not place inside the region
    pub not_found: Vec<i64>,
    /// Rows skipped because the geocoder was unavailable
    pub failed: Vec<i64>,
}

/// POST /listings/geocode
///
/// Geocodes staged rows that have an address but no coordinates. External
/// failures leave the row unmapped and never fail the request.
pub async fn geocode_missing(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let (mut session, is_new) = load_session(&state, &headers).await;

    let summary = {
        let _guard = state.pipeline_lock.lock().await;
        let pending = fetch_unmapped(&state.db, ListingTable::Staging).await?;
        let mut summary = GeocodeSummary {
            attempted: pending.len(),
            ..Default::default()
        };

        for (guid, address) in pending {
            match state.geocoder.geocode(&address).await {
                Ok((lat, long)) => {
                    set_coordinates(&state.db, ListingTable::Staging, guid, lat, long).await?;
                    summary.geocoded += 1;
                }
                Err(GeocodeError::NotFound) => summary.not_found.push(guid),
                Err(e) => {
                    warn!(guid, "Geocoding failed: {}", e);
                    summary.failed.push(guid);
                }
            }
        }
        summary
    };

    info!(
        attempted = summary.attempted,
        geocoded = summary.geocoded,
        "Geocode-missing step finished"
    );

    session.mark_geocoded();
    let status = session.status();
    let id = session.session_id;
    store_session(&state, session).await;

    Ok(with_session_cookie(
        Json(json!({ "summary": summary, "session": status })),
        id,
        is_new,
    ))
}

/// GET /listings/preview
///
/// Returns the staged listings and resets the attempt counter.
pub async fn preview(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let (mut session, is_new) = load_session(&state, &headers).await;
    session.enter_preview();
    let status = session.status();
    let id = session.session_id;
    store_session(&state, session).await;

    let listings = fetch_listings(&state.db, ListingTable::Staging).await?;
    Ok(with_session_cookie(
        Json(json!({ "session": status, "listings": listings })),
        id,
        is_new,
    ))
}

/// GET /listings/update
///
/// The admin has reviewed the preview.
pub async fn confirm_preview(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let (mut session, is_new) = load_session(&state, &headers).await;
    if !session.is_staged() {
        return Err(ApiError::Conflict("No staged upload to review".to_string()));
    }
    session.mark_previewed();
    let status = session.status();
    let id = session.session_id;
    store_session(&state, session).await;

    Ok(with_session_cookie(Json(json!({ "session": status })), id, is_new))
}

/// POST /listings/update
///
/// Promotes staging to production. After a failure that left production
/// replaced, the next call resumes at the failed step.
pub async fn promote(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let (mut session, is_new) = load_session(&state, &headers).await;
    if !session.is_staged() {
        return Err(ApiError::Conflict("No staged upload to promote".to_string()));
    }
    let email = acting_user(&headers, &state);
    let filename = session.filename.clone();
    let resume = session.promotion_resume.clone();

    let response = match state.promotion.promote(&email, filename.as_deref(), resume).await {
        Ok(report) => {
            session.mark_updated();
            let to = state
                .config
                .email
                .notify_address
                .clone()
                .unwrap_or_else(|| email.clone());
            state.mailer.send_detached(EmailMessage {
                to,
                subject: "Map listings updated".to_string(),
                html: format!(
                    "<p>{} published {} listings{}.</p>",
                    email,
                    report.progress.production_rows,
                    filename
                        .as_deref()
                        .map(|f| format!(" from {}", f))
                        .unwrap_or_default()
                ),
            });
            (
                StatusCode::OK,
                Json(json!({ "status": "updated", "report": report, "session": session.status() })),
            )
        }
        Err(e) => {
            session.record_promotion_failure(&e.progress);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": {
                        "code": "PROMOTION_FAILED",
                        "message": "The listings could not be updated. Please try again.",
                    },
                    "failed_step": e.step,
                    "completed_steps": e.progress.completed,
                    "production_replaced": e.production_replaced(),
                    "detail": e.summary(),
                    "session": session.status(),
                })),
            )
        }
    };

    let id = session.session_id;
    store_session(&state, session).await;
    Ok(with_session_cookie(response, id, is_new))
}

/// GET /listings/status
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session, is_new) = load_session(&state, &headers).await;
    let status = session.status();
    let id = session.session_id;
    if is_new {
        store_session(&state, session).await;
    }
    with_session_cookie(Json(json!({ "session": status })), id, is_new)
}

#[derive(Debug, Deserialize)]
pub struct SchemaQuery {
    pub mode: Option<ValidationMode>,
}

/// GET /listings/schema?mode=strict|relaxed
pub async fn schema_document(Query(query): Query<SchemaQuery>) -> Json<Value> {
    let mode = query.mode.unwrap_or(ValidationMode::Strict);
    Json(ListingSchema::for_mode(mode).to_document())
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/listings/upload",
            get(start_upload)
                .post(post_upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/listings/geocode", post(geocode_missing))
        .route("/listings/preview", get(preview))
        .route("/listings/update", get(confirm_preview).post(promote))
        .route("/listings/status", get(status))
        .route("/listings/schema", get(schema_document))
}
