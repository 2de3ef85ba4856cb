use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::marketplace::{ModerationStatus, Money, SaleType, SalesReport};
use crate::core::moderation::{SaleReportDraft, SaleReportView};
use crate::dashboard::actor::CurrentActor;
use crate::dashboard::api_response::{ok, ApiError, ApiResult};
use crate::dashboard::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaleReportRequest {
    pub offer_id: Uuid,
    pub sale_type: SaleType,
    pub amount: String,
    pub proof_image: String,
    pub description: Option<String>,
}

impl TryFrom<SaleReportRequest> for SaleReportDraft {
    type Error = ApiError;

    fn try_from(request: SaleReportRequest) -> Result<Self, Self::Error> {
        let amount = request
            .amount
            .parse::<Money>()
            .map_err(|e| ApiError::invalid_money("amount", e))?;

        Ok(SaleReportDraft {
            offer_id: request.offer_id,
            sale_type: request.sale_type,
            amount,
            proof_image: request.proof_image,
            description: request.description,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SaleReportQuery {
    pub status: Option<ModerationStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

pub async fn submit_sale_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<SaleReportRequest>,
) -> ApiResult<SalesReport> {
    let draft = SaleReportDraft::try_from(request)?;
    ok(state.sales.submit_sale_report(&actor, draft).await?)
}

pub async fn list_sale_reports(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<SaleReportQuery>,
) -> ApiResult<Vec<SaleReportView>> {
    ok(state.sales.list_sale_reports(&actor, query.status).await?)
}

pub async fn approve_sale_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(report_id): Path<Uuid>,
) -> ApiResult<SalesReport> {
    ok(state.sales.approve_sale_report(&actor, report_id).await?)
}

/// The body is optional; without a reason the default rejection note is used.
pub async fn reject_sale_report(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(report_id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> ApiResult<SalesReport> {
    let reason = body.and_then(|Json(r)| r.reason);
    ok(state
        .sales
        .reject_sale_report(&actor, report_id, reason.as_deref())
        .await?)
}
