//! Profile handler

use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, Extension, Json,
};
use serde_json::json;
use tracing::error;

use super::dto::ProfileResponse;
use crate::domain::account::AccountRepositoryInterface;
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Profile state
#[derive(Clone)]
pub struct ProfileHandlerState {
    pub accounts: Arc<dyn AccountRepositoryInterface>,
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_profile(
    State(state): State<ProfileHandlerState>,
    user: Option<Extension<AuthenticatedUser>>,
) -> Result<Json<ProfileResponse>, Response> {
    // The auth middleware guards this route; the check stays for routers
    // mounted without it.
    let Some(Extension(user)) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Not authenticated" })),
        )
            .into_response());
    };

    let account = state
        .accounts
        .find_by_id(&user.account_id)
        .await
        .map_err(|e| {
            error!("Storage failure: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Internal server error" })),
            )
                .into_response()
        })?;

    let Some(account) = account else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Account not found" })),
        )
            .into_response());
    };

    // Auto-create a default profile on first read instead of failing
    let profile = state
        .accounts
        .get_or_create_profile(&account.id)
        .await
        .map_err(|e| {
            error!("Storage failure: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Internal server error" })),
            )
                .into_response()
        })?;

    Ok(Json(ProfileResponse {
        username: account.username,
        email: account.email,
        role: profile.role,
    }))
}
