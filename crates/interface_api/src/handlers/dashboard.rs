//! Dashboard handlers
//!
//! Cards fail independently: a failed card is reported inside a 200
//! response, never as an error status.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use domain_dashboard::{MetricKind, StatusCount};

use crate::auth::{permissions, require_role, TokenClaims};
use crate::dto::dashboard::{CardResponse, DashboardQuery, DashboardResponse};
use crate::{error::ApiError, AppState};

/// Every card for the filter
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    require_role(&claims, permissions::CLAIM_READ)?;
    let request = query.into_request(Utc::now())?;
    let board = state.service.load(request.clone()).await;
    Ok(Json(DashboardResponse::new(&request, board)))
}

async fn single_card(
    state: AppState,
    claims: TokenClaims,
    query: DashboardQuery,
    kind: MetricKind,
) -> Result<Json<CardResponse>, ApiError> {
    require_role(&claims, permissions::CLAIM_READ)?;
    let request = query.into_request(Utc::now())?;
    let result = state.service.metric(kind, &request).await;
    Ok(Json(CardResponse::new(kind, result)))
}

pub async fn top_accounts(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<CardResponse>, ApiError> {
    single_card(state, claims, query, MetricKind::TopAccountCodes).await
}

pub async fn supplier_distribution(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<CardResponse>, ApiError> {
    single_card(state, claims, query, MetricKind::SupplierDistribution).await
}

pub async fn root_causes(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<CardResponse>, ApiError> {
    single_card(state, claims, query, MetricKind::RootCauses).await
}

#[derive(Debug, Serialize)]
pub struct NetCostResponse {
    pub net_cost: Decimal,
}

/// Cost minus credits over the filter
pub async fn net_cost(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<NetCostResponse>, ApiError> {
    require_role(&claims, permissions::CLAIM_READ)?;
    let request = query.into_request(Utc::now())?;
    let net_cost = state.service.net_cost(&request.filter).await?;
    Ok(Json(NetCostResponse { net_cost }))
}

/// Claim count per status, every status included
pub async fn status_breakdown(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<StatusCount>>, ApiError> {
    require_role(&claims, permissions::CLAIM_READ)?;
    let request = query.into_request(Utc::now())?;
    Ok(Json(state.service.status_breakdown(&request.filter).await?))
}
