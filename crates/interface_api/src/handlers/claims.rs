//! Claims handlers
//!
//! Every mutation goes through the dashboard service so the query cache is
//! invalidated for the tables it touched.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;

use crate::auth::{permissions, require_role, TokenClaims};
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Registers a new claim
pub async fn create_claim(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(request): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    require_role(&claims, permissions::CLAIM_WRITE)?;
    request.validate()?;
    let claim = state.service.create_claim(request.into()).await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&claims, permissions::CLAIM_WRITE)?;
    let claim = state
        .service
        .update_claim_status(ClaimId::from_uuid(id), request.status)
        .await?;
    Ok(Json(claim.into()))
}

/// Soft-deletes a claim
pub async fn delete_claim(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_role(&claims, permissions::CLAIM_WRITE)?;
    state.service.soft_delete_claim(ClaimId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_cost_line(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<LineResponse>), ApiError> {
    require_role(&claims, permissions::CLAIM_WRITE)?;
    request.validate()?;
    let today = state.service.timezone().local_date(Utc::now());
    let line = state
        .service
        .add_cost_line(request.into_line(ClaimId::from_uuid(id), today))
        .await?;
    Ok((StatusCode::CREATED, Json(line.into())))
}

pub async fn add_credit_note(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<LineResponse>), ApiError> {
    require_role(&claims, permissions::CLAIM_WRITE)?;
    request.validate()?;
    let today = state.service.timezone().local_date(Utc::now());
    let note = state
        .service
        .add_credit_note(request.into_line(ClaimId::from_uuid(id), today))
        .await?;
    Ok((StatusCode::CREATED, Json(note.into())))
}
