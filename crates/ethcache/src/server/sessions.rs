use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::AppError;
use super::SharedState;
use crate::auth;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Deserialize)]
pub(super) struct AuthenticateRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub(super) struct AuthenticateResponse {
    token: String,
}

// ==============================================================================
// Handler
// ==============================================================================

pub(super) async fn authenticate(
    State(state): State<SharedState>,
    Json(body): Json<AuthenticateRequest>,
) -> Result<Json<AuthenticateResponse>, AppError> {
    let token = auth::authenticate(&state.store, &state.jwt, &body.username, &body.password).await?;
    info!(username = %body.username, "issued session token");
    Ok(Json(AuthenticateResponse { token }))
}
