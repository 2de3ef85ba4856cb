use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::marketplace::{Dispute, DisputeMessage};
use crate::core::moderation::{DisputeDraft, DisputeThread};
use crate::dashboard::actor::CurrentActor;
use crate::dashboard::api_response::{ok, ApiResult};
use crate::dashboard::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    pub notes: Option<String>,
}

pub async fn open_dispute(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(draft): Json<DisputeDraft>,
) -> ApiResult<Dispute> {
    ok(state.disputes.open_dispute(&actor, draft).await?)
}

/// Admins see every case; everyone else sees the cases they are part of.
pub async fn list_disputes(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Vec<Dispute>> {
    ok(state.disputes.list_disputes(&actor).await?)
}

pub async fn dispute_thread(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(dispute_id): Path<Uuid>,
) -> ApiResult<DisputeThread> {
    ok(state.disputes.dispute_thread(&actor, dispute_id).await?)
}

pub async fn post_message(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(dispute_id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> ApiResult<DisputeMessage> {
    ok(state
        .disputes
        .post_message(&actor, dispute_id, &request.body)
        .await?)
}

pub async fn resolve_dispute(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(dispute_id): Path<Uuid>,
    body: Option<Json<ResolveRequest>>,
) -> ApiResult<Dispute> {
    let notes = body.and_then(|Json(r)| r.notes);
    ok(state
        .disputes
        .resolve_dispute(&actor, dispute_id, notes.as_deref())
        .await?)
}
