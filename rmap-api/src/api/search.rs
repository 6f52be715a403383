//! Server-side filtered search
//!
//! Same semantics as the embedded map: the visible set honours every
//! filter, while the dropdown counts only honour the dropdown facets.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rmap_common::aggregate::FacetCounts;
use rmap_common::db::ListingTable;
use rmap_common::{filter_listings, AgeGroup, Listing, ListingFilter};
use serde::{Deserialize, Serialize};

use super::listings::listings_or_empty;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub cost: Option<String>,
    pub city: Option<String>,
    pub age_group: Option<String>,
    /// `1` hides faith-based listings
    pub hide_faith: Option<String>,
}

impl SearchQuery {
    pub fn to_filter(&self) -> ListingFilter {
        ListingFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            tag: self.tag.clone(),
            cost: self.cost.clone(),
            city: self.city.clone(),
            age_group: self
                .age_group
                .as_deref()
                .map(AgeGroup::parse)
                .unwrap_or(AgeGroup::All),
            include_faith_based: !matches!(self.hide_faith.as_deref(), Some("1") | Some("true")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub listings: Vec<Listing>,
    pub facets: FacetCounts,
}

/// GET /api/listings/search
pub async fn search_listings(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let all = listings_or_empty(&state, ListingTable::Production).await;
    let filter = query.to_filter();
    let bands = &state.config.age_bands;

    let visible: Vec<Listing> = filter_listings(&all, std::slice::from_ref(&filter), bands)
        .into_iter()
        .cloned()
        .collect();
    let dropdown_subset = filter_listings(&all, &[filter.dropdown_facets()], bands);
    let facets = FacetCounts::compute(&dropdown_subset, &state.config.gazetteer);

    Json(SearchResponse {
        count: visible.len(),
        listings: visible,
        facets,
    })
}

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/api/listings/search", get(search_listings))
}
