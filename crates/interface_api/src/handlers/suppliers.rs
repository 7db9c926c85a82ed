//! Supplier handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use validator::Validate;

use crate::auth::{permissions, require_role, TokenClaims};
use crate::dto::claims::{CreateSupplierRequest, SupplierResponse};
use crate::{error::ApiError, AppState};

pub async fn list_suppliers(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<Vec<SupplierResponse>>, ApiError> {
    require_role(&claims, permissions::CLAIM_READ)?;
    let suppliers = state.service.suppliers().await?;
    Ok(Json(suppliers.into_iter().map(SupplierResponse::from).collect()))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(request): Json<CreateSupplierRequest>,
) -> Result<(StatusCode, Json<SupplierResponse>), ApiError> {
    require_role(&claims, permissions::CLAIM_WRITE)?;
    request.validate()?;
    let supplier = state.service.create_supplier(request.name).await?;
    Ok((StatusCode::CREATED, Json(supplier.into())))
}
