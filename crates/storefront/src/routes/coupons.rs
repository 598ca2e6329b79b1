//! Coupon verification.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::Coupon;
use crate::services::checkout::{Customer, resolve_coupon};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub coupon: Coupon,
}

/// Check a coupon code against the caller's eligibility, as checkout would.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn verify(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>> {
    let Json(request) = payload?;
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("Coupon code is required".to_string()));
    }

    let coupon = resolve_coupon(&state, code, &Customer::Member(user)).await?;
    Ok(Json(VerifyResponse { coupon }))
}
