use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::core::marketplace::Review;
use crate::core::moderation::{PendingReview, ReviewDraft};
use crate::dashboard::actor::CurrentActor;
use crate::dashboard::api_response::{ok, ApiResult};
use crate::dashboard::app_state::AppState;

pub async fn submit_review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(draft): Json<ReviewDraft>,
) -> ApiResult<Review> {
    ok(state.reviews.submit_review(&actor, draft).await?)
}

pub async fn pending_reviews(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Vec<PendingReview>> {
    ok(state.reviews.pending_reviews(&actor).await?)
}

pub async fn approve_review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Review> {
    ok(state.reviews.approve_review(&actor, review_id).await?)
}

pub async fn reject_review(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(review_id): Path<Uuid>,
) -> ApiResult<Review> {
    ok(state.reviews.reject_review(&actor, review_id).await?)
}
