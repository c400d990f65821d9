use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::sink::CycleCache;
use crate::types::PredictionRow;

/// Read-only view over the latest completed cycle, for dashboards polling
/// on their own refresh cadence.
#[derive(Clone)]
pub struct ApiState {
    pub cache: Arc<CycleCache>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/predictions", get(predictions))
        .with_state(state)
}

async fn predictions(State(st): State<ApiState>) -> Json<Vec<PredictionRow>> {
    Json(st.cache.latest())
}
