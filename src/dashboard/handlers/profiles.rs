use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::marketplace::{AccountStatus, Profile, Role};
use crate::core::moderation::ProfileFilter;
use crate::dashboard::actor::{CurrentActor, SessionSubject};
use crate::dashboard::api_response::{ok, ApiResult};
use crate::dashboard::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AccountStatus,
}

/// First call after sign-up. The profile id is the session's subject.
pub async fn register_profile(
    State(state): State<AppState>,
    SessionSubject(subject): SessionSubject,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<Profile> {
    ok(state
        .profiles
        .register_profile(subject, &request.name, request.contact.as_deref())
        .await?)
}

pub async fn my_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Profile> {
    ok(state.profiles.get_profile(actor.id).await?)
}

pub async fn list_profiles(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<ProfileFilter>,
) -> ApiResult<Vec<Profile>> {
    ok(state.profiles.list_profiles(&actor, &filter).await?)
}

pub async fn approve_profile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<Profile> {
    ok(state.profiles.approve_profile(&actor, profile_id).await?)
}

pub async fn set_role(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(profile_id): Path<Uuid>,
    Json(request): Json<RoleRequest>,
) -> ApiResult<Profile> {
    ok(state.profiles.set_role(&actor, profile_id, request.role).await?)
}

pub async fn set_account_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(profile_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Profile> {
    ok(state
        .profiles
        .set_account_status(&actor, profile_id, request.status)
        .await?)
}
