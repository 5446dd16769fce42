//! Registration and login handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use tracing::{error, info};

use super::dto::{AccountInfo, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::domain::account::{AccountRepositoryInterface, NewAccount};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::verify_password;
use crate::interfaces::http::common::{FieldErrors, ValidatedJson};
use crate::shared::DomainError;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub accounts: Arc<dyn AccountRepositoryInterface>,
    pub jwt_config: JwtConfig,
}

fn internal_error(e: &DomainError) -> Response {
    error!("Storage failure: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error" })),
    )
        .into_response()
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account registered", body = RegisterResponse),
        (status = 400, description = "Per-field validation errors")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, Response> {
    let mut errors = FieldErrors::new();

    let existing_username = state
        .accounts
        .find_by_username(&request.username)
        .await
        .map_err(|e| internal_error(&e))?;
    if existing_username.is_some() {
        errors.push("username", "A user with that username already exists.");
    }

    let existing_email = state
        .accounts
        .find_by_email(&request.email)
        .await
        .map_err(|e| internal_error(&e))?;
    if existing_email.is_some() {
        errors.push("email", "A user with that email already exists.");
    }

    if !errors.is_empty() {
        return Err(errors.into_response());
    }

    let dto = NewAccount {
        username: request.username,
        email: request.email,
        password: request.password,
        role: request.role,
    };

    match state.accounts.register_account(dto).await {
        Ok(account) => {
            info!("Registered account {}", account.username);
            Ok(Json(RegisterResponse {
                message: "User registered successfully".to_string(),
            }))
        }
        // Lost a race against a concurrent registration; the unique index
        // decided the winner.
        Err(DomainError::Conflict(_)) => {
            let mut errors = FieldErrors::new();
            errors.push(
                "non_field_errors",
                "A user with that username or email already exists.",
            );
            Err(errors.into_response())
        }
        Err(e) => Err(internal_error(&e)),
    }
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, Response> {
    let account = match state
        .accounts
        .find_by_username(&request.username)
        .await
        .map_err(|e| internal_error(&e))?
    {
        Some(account) => Some(account),
        // Allow logging in with the email address as well
        None => state
            .accounts
            .find_by_email(&request.username)
            .await
            .map_err(|e| internal_error(&e))?,
    };

    let Some(account) = account else {
        return Err(unauthorized("Invalid credentials"));
    };

    if !account.is_active {
        return Err(unauthorized("Account is disabled"));
    }

    let password_valid =
        verify_password(&request.password, &account.password_hash).unwrap_or(false);
    if !password_valid {
        return Err(unauthorized("Invalid credentials"));
    }

    let profile = state
        .accounts
        .get_or_create_profile(&account.id)
        .await
        .map_err(|e| internal_error(&e))?;

    // Best effort; a failed timestamp update must not fail the login
    let _ = state.accounts.record_login(&account.id).await;

    let token = create_token(
        &account.id,
        &account.username,
        &profile.role,
        &state.jwt_config,
    )
    .map_err(|e| {
        error!("Failed to sign token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "Internal server error" })),
        )
            .into_response()
    })?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_config.expiration_hours * 3600,
        user: AccountInfo {
            id: account.id,
            username: account.username,
            email: account.email,
            role: profile.role,
        },
    }))
}
