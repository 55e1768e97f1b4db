use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{RegisterRequest, RegisterResponse},
        error::RegisterError,
        services::register_user,
    },
    state::AppState,
};

pub const REGISTERED_MESSAGE: &str = "Registration successful";
const INVALID_BODY_MESSAGE: &str = "Invalid request body";

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/register", post(register))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), RegisterError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable registration body");
        RegisterError::Validation(INVALID_BODY_MESSAGE.to_string())
    })?;

    let user = register_user(
        state.users.as_ref(),
        state.hasher.clone(),
        state.suffixes.as_ref(),
        payload,
    )
    .await
    .map_err(|e| {
        if let RegisterError::Validation(msg) = &e {
            warn!(reason = %msg, "registration rejected");
        }
        e
    })?;

    info!(user_id = %user.id, slug = %user.slug, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: REGISTERED_MESSAGE.to_string(),
            user,
        }),
    ))
}
