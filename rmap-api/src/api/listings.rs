//! Listing dumps for the map: production under `/api`, staging under
//! `/api-preview`

use axum::{extract::State, routing::get, Json, Router};
use rmap_common::db::{fetch_listings, ListingTable};
use rmap_common::Listing;
use tracing::warn;

use crate::AppState;

/// Read a listing table, degrading to an empty list
///
/// The public map keeps rendering when storage is unavailable.
pub async fn listings_or_empty(state: &AppState, table: ListingTable) -> Vec<Listing> {
    match fetch_listings(&state.db, table).await {
        Ok(listings) => listings,
        Err(e) => {
            warn!(table = table.name(), "Failed to read listings: {}", e);
            Vec::new()
        }
    }
}

/// GET /api/listings
pub async fn production_listings(State(state): State<AppState>) -> Json<Vec<Listing>> {
    Json(listings_or_empty(&state, ListingTable::Production).await)
}

/// GET /api-preview/listings
pub async fn preview_listings(State(state): State<AppState>) -> Json<Vec<Listing>> {
    Json(listings_or_empty(&state, ListingTable::Staging).await)
}

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/api/listings", get(production_listings))
        .route("/api-preview/listings", get(preview_listings))
}
