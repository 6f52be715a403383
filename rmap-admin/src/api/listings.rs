//! Manual listing management against the production table

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rmap_common::db::{delete_listing, fetch_listing, insert_record, update_record, ListingTable};
use rmap_common::geo::RegionDecision;
use rmap_common::listing::Listing;
use rmap_common::schema::{field_spec, ListingSchema};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::session::org_user_id;
use crate::error::{ApiError, ApiResult};
use crate::ingest::{apply_region_filter, validate_batch, RowTransformer, Violation};
use crate::services::{ObjectStoreError, MAX_IMAGE_BYTES};
use crate::AppState;

/// JSON body for create and edit
#[derive(Debug, Deserialize)]
pub struct ListingInput {
    /// Geocode `full_address` before saving
    #[serde(default)]
    pub re_geocode: bool,
    #[serde(flatten)]
    pub record: Map<String, Value>,
}

/// Keep known, non-derived, non-null fields
fn sanitize(record: Map<String, Value>) -> Map<String, Value> {
    record
        .into_iter()
        .filter(|(key, value)| {
            !value.is_null() && field_spec(key).map(|spec| !spec.derived).unwrap_or(false)
        })
        .collect()
}

fn validation_failed(errors: Vec<Violation>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "error": {
                "code": "VALIDATION_FAILED",
                "message": format!("{} problem(s) found in the listing", errors.len()),
            },
            "errors": errors,
        })),
    )
        .into_response()
}

/// Organisational users may only act on listings they manage
fn ensure_can_manage(headers: &HeaderMap, listing: &Listing) -> ApiResult<()> {
    match org_user_id(headers) {
        Some(user) if listing.managed_by != Some(user) => Err(ApiError::Forbidden(format!(
            "Listing {} is not managed by this user",
            listing.guid
        ))),
        _ => Ok(()),
    }
}

/// Geocode, derive, validate and region-check a record
///
/// `fallback` supplies coordinates when geocoding fails. Returns the
/// finished record, or the response to send when it is rejected.
async fn prepare_record(
    state: &AppState,
    mut record: Map<String, Value>,
    re_geocode: bool,
    fallback: Option<(f64, f64)>,
) -> Result<Map<String, Value>, Response> {
    if re_geocode {
        let address = record
            .get("full_address")
            .and_then(Value::as_str)
            .map(str::to_string);
        let geocoded = match address {
            Some(address) => match state.geocoder.geocode(&address).await {
                Ok(coords) => Some(coords),
                Err(e) => {
                    warn!(address = %address, "Geocoding failed; keeping previous coordinates: {}", e);
                    None
                }
            },
            None => None,
        };
        if let Some((lat, long)) = geocoded.or(fallback) {
            record.insert("latitude".into(), json!(lat));
            record.insert("longitude".into(), json!(long));
        }
    }

    let transformer = RowTransformer::new(&state.config.gazetteer, &state.config.cost_vocabulary);
    transformer.derive_fields(&mut record);

    let outcome = validate_batch(std::slice::from_ref(&record), &ListingSchema::strict());
    if !outcome.is_success() {
        return Err(validation_failed(outcome.errors));
    }
    for warning in &outcome.coordinate_warnings {
        record.remove(warning.field);
    }

    if apply_region_filter(&mut record, &state.config.region, &state.config.gazetteer)
        == RegionDecision::Outside
    {
        return Err(ApiError::Unprocessable(
            "Coordinates are outside the service region".to_string(),
        )
        .into_response());
    }

    Ok(record)
}

async fn load_production(state: &AppState, guid: i64) -> ApiResult<Listing> {
    fetch_listing(&state.db, ListingTable::Production, guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Listing {}", guid)))
}

/// GET /listings/:guid
pub async fn get_listing(State(state): State<AppState>, Path(guid): Path<i64>) -> ApiResult<Json<Listing>> {
    Ok(Json(load_production(&state, guid).await?))
}

/// POST /listings
pub async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ListingInput>,
) -> ApiResult<Response> {
    let mut record = sanitize(input.record);
    if let Some(user) = org_user_id(&headers) {
        record.insert("managed_by".into(), json!(user));
    }

    let record = match prepare_record(&state, record, input.re_geocode, None).await {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };
    let guid = record
        .get("guid")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::BadRequest("guid is required".to_string()))?;

    {
        let _guard = state.pipeline_lock.lock().await;
        if fetch_listing(&state.db, ListingTable::Production, guid).await?.is_some() {
            return Err(ApiError::Conflict(format!("Listing {} already exists", guid)));
        }
        let mut conn = state.db.acquire().await.map_err(rmap_common::Error::from)?;
        insert_record(&mut conn, ListingTable::Production.name(), &record).await?;
    }

    info!(guid, "Listing created");
    let listing = load_production(&state, guid).await?;
    Ok((StatusCode::CREATED, Json(listing)).into_response())
}

/// PUT /listings/:guid
///
/// Replaces the listing. `image_url` and `managed_by` survive when the body
/// omits them; organisational users cannot reassign `managed_by`.
pub async fn update_listing(
    State(state): State<AppState>,
    Path(guid): Path<i64>,
    headers: HeaderMap,
    Json(input): Json<ListingInput>,
) -> ApiResult<Response> {
    let existing = load_production(&state, guid).await?;
    ensure_can_manage(&headers, &existing)?;

    let mut record = sanitize(input.record);
    record.insert("guid".into(), json!(guid));
    if !record.contains_key("image_url") {
        if let Some(image) = &existing.image_url {
            record.insert("image_url".into(), json!(image));
        }
    }
    if org_user_id(&headers).is_some() || !record.contains_key("managed_by") {
        match existing.managed_by {
            Some(owner) => record.insert("managed_by".into(), json!(owner)),
            None => record.remove("managed_by"),
        };
    }

    let record = match prepare_record(&state, record, input.re_geocode, existing.coordinates()).await {
        Ok(record) => record,
        Err(response) => return Ok(response),
    };

    let updated = {
        let _guard = state.pipeline_lock.lock().await;
        let mut conn = state.db.acquire().await.map_err(rmap_common::Error::from)?;
        update_record(&mut conn, ListingTable::Production.name(), guid, &record).await?
    };
    if !updated {
        return Err(ApiError::NotFound(format!("Listing {}", guid)));
    }

    info!(guid, "Listing updated");
    Ok(Json(load_production(&state, guid).await?).into_response())
}

/// DELETE /listings/:guid
pub async fn remove_listing(
    State(state): State<AppState>,
    Path(guid): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let existing = load_production(&state, guid).await?;
    ensure_can_manage(&headers, &existing)?;

    let deleted = {
        let _guard = state.pipeline_lock.lock().await;
        delete_listing(&state.db, ListingTable::Production, guid).await?
    };
    if !deleted {
        return Err(ApiError::NotFound(format!("Listing {}", guid)));
    }

    if let Some(image) = &existing.image_url {
        if let Err(e) = state.images.delete(image).await {
            warn!(guid, image = %image, "Failed to delete listing image: {}", e);
        }
    }

    info!(guid, "Listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /listings/:guid/image
///
/// Raw image body; the stored relative path becomes `image_url`.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(guid): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Listing>> {
    let existing = load_production(&state, guid).await?;
    ensure_can_manage(&headers, &existing)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .ok_or_else(|| ApiError::UnsupportedMediaType("Content-Type is required".to_string()))?;

    let path = match state.images.put_image(guid, &content_type, &body).await {
        Ok(path) => path,
        Err(ObjectStoreError::UnsupportedType(t)) => {
            return Err(ApiError::UnsupportedMediaType(format!(
                "{} is not a supported image type",
                t
            )))
        }
        Err(ObjectStoreError::TooLarge(size)) => {
            return Err(ApiError::PayloadTooLarge(format!(
                "Image is {} bytes; the limit is {}",
                size, MAX_IMAGE_BYTES
            )))
        }
        Err(e) => {
            warn!(guid, "Image storage failed: {}", e);
            return Err(ApiError::Internal("The image could not be stored".to_string()));
        }
    };

    let mut listing = existing.clone();
    listing.image_url = Some(path);
    let record = listing.to_record()?;
    {
        let _guard = state.pipeline_lock.lock().await;
        let mut conn = state.db.acquire().await.map_err(rmap_common::Error::from)?;
        update_record(&mut conn, ListingTable::Production.name(), guid, &record).await?;
    }

    if let Some(old) = &existing.image_url {
        if let Err(e) = state.images.delete(old).await {
            warn!(guid, image = %old, "Failed to delete previous image: {}", e);
        }
    }

    info!(guid, "Listing image replaced");
    Ok(Json(listing))
}

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listings", post(create_listing))
        .route(
            "/listings/:guid",
            get(get_listing).put(update_listing).delete(remove_listing),
        )
        .route(
            "/listings/:guid/image",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
}
