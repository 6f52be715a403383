//! Facet metadata for the map's dropdowns

use axum::{extract::State, routing::get, Json, Router};
use rmap_common::aggregate::{CategoryCounts, CountMap, FacetCounts};
use rmap_common::config::ResourceLink;
use rmap_common::db::{fetch_listings, ListingTable};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub listing_category_icons: BTreeMap<String, String>,
    pub listing_categories: CategoryCounts,
    pub listing_cities: CountMap,
    pub listing_keywords: CountMap,
    pub listing_costs: CountMap,
    pub resources: Vec<ResourceLink>,
}

async fn build_meta(state: &AppState, table: ListingTable) -> ApiResult<MetaResponse> {
    let listings = fetch_listings(&state.db, table).await?;
    let refs: Vec<_> = listings.iter().collect();
    let facets = FacetCounts::compute(&refs, &state.config.gazetteer);

    Ok(MetaResponse {
        listing_category_icons: state.config.category_icons.clone(),
        listing_categories: facets.categories,
        listing_cities: facets.cities,
        listing_keywords: facets.keywords,
        listing_costs: facets.costs,
        resources: state.config.resources.clone(),
    })
}

/// GET /api/meta
pub async fn production_meta(State(state): State<AppState>) -> ApiResult<Json<MetaResponse>> {
    Ok(Json(build_meta(&state, ListingTable::Production).await?))
}

/// GET /api-preview/meta
pub async fn preview_meta(State(state): State<AppState>) -> ApiResult<Json<MetaResponse>> {
    Ok(Json(build_meta(&state, ListingTable::Staging).await?))
}

pub fn meta_routes() -> Router<AppState> {
    Router::new()
        .route("/api/meta", get(production_meta))
        .route("/api-preview/meta", get(preview_meta))
}
