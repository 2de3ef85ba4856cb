use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::marketplace::{Category, ContactLog, Money, Offer};
use crate::core::moderation::{OfferDraft, OfferListing, OfferReviews, OfferSearch};
use crate::dashboard::actor::CurrentActor;
use crate::dashboard::api_response::{ok, ApiError, ApiResult};
use crate::dashboard::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub title: String,
    pub description: String,
    /// Blank or missing means "price on request".
    pub price: Option<String>,
    pub category: Category,
    pub neighborhood: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl TryFrom<OfferRequest> for OfferDraft {
    type Error = ApiError;

    fn try_from(request: OfferRequest) -> Result<Self, Self::Error> {
        let price = match request.price.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(
                text.parse::<Money>()
                    .map_err(|e| ApiError::invalid_money("price", e))?,
            ),
        };

        Ok(OfferDraft {
            title: request.title,
            description: request.description,
            price,
            category: request.category,
            neighborhood: request.neighborhood,
            images: request.images,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OfferListQuery {
    #[serde(default)]
    pub pending: bool,
}

pub async fn search_offers(
    State(state): State<AppState>,
    Query(search): Query<OfferSearch>,
) -> ApiResult<Vec<Offer>> {
    ok(state.offers.search_offers(&search).await?)
}

pub async fn submit_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<OfferRequest>,
) -> ApiResult<Offer> {
    let draft = OfferDraft::try_from(request)?;
    ok(state.offers.submit_offer(&actor, draft).await?)
}

pub async fn list_offers(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<OfferListQuery>,
) -> ApiResult<Vec<OfferListing>> {
    ok(state.offers.list_offers(&actor, query.pending).await?)
}

pub async fn update_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<OfferRequest>,
) -> ApiResult<Offer> {
    let draft = OfferDraft::try_from(request)?;
    ok(state.offers.update_offer(&actor, offer_id, draft).await?)
}

pub async fn delete_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<()> {
    ok(state.offers.delete_offer(&actor, offer_id).await?)
}

pub async fn approve_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<Offer> {
    ok(state.offers.approve_offer(&actor, offer_id).await?)
}

pub async fn reject_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<()> {
    ok(state.offers.reject_offer(&actor, offer_id).await?)
}

pub async fn pause_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<Offer> {
    ok(state.offers.pause_offer(&actor, offer_id).await?)
}

pub async fn toggle_offer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<Offer> {
    ok(state.offers.toggle_active(&actor, offer_id).await?)
}

/// "Contact seller": logged, and the owner hears about it.
pub async fn register_interest(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<ContactLog> {
    ok(state.offers.register_interest(&actor, offer_id).await?)
}

pub async fn offer_reviews(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> ApiResult<OfferReviews> {
    ok(state.reviews.offer_reviews(offer_id).await?)
}
