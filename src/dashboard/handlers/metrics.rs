use axum::extract::{Path, State};
use uuid::Uuid;

use crate::core::metrics::{MetricsSnapshot, SellerStats};
use crate::dashboard::actor::CurrentActor;
use crate::dashboard::api_response::{ok, ApiResult};
use crate::dashboard::app_state::AppState;

pub async fn metrics_snapshot(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<MetricsSnapshot> {
    ok(state.metrics.snapshot(&actor).await?)
}

pub async fn seller_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<SellerStats> {
    ok(state.metrics.seller_stats(&actor, profile_id).await?)
}
