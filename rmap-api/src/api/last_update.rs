//! Most recent promotion

use axum::{extract::State, routing::get, Json, Router};
use rmap_common::db::{latest_promotion, PromotionRecord};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LastUpdateResponse {
    pub last_update: Option<PromotionRecord>,
}

/// GET /api/last-update
pub async fn last_update(State(state): State<AppState>) -> ApiResult<Json<LastUpdateResponse>> {
    Ok(Json(LastUpdateResponse {
        last_update: latest_promotion(&state.db).await?,
    }))
}

pub fn last_update_routes() -> Router<AppState> {
    Router::new().route("/api/last-update", get(last_update))
}
