use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use taskmint_core::domain::user::{validate_registration, User};
use taskmint_db::repositories::NewUser;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::rate_limit::{ClientIp, LOGIN_POLICY, REGISTER_POLICY};
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn public_user(user: &User) -> Value {
    json!({ "id": user.id.0, "name": user.name, "email": user.email })
}

fn issue_token(state: &ApiState, user: &User) -> Result<String, ApiError> {
    state.tokens.issue(user).map_err(|error| {
        tracing::error!(
            event_name = "api.auth.token_issue_failed",
            error = %error,
            "token signing failed"
        );
        ApiError::internal("Unable to complete authentication. Please try again.")
    })
}

pub async fn register(
    State(state): State<ApiState>,
    ClientIp(client): ClientIp,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !state.limiter.try_acquire(&REGISTER_POLICY, &client) {
        return Err(ApiError::too_many_requests(
            "Too many registration attempts. Please try again after an hour.",
        ));
    }

    let name = request.name.trim().to_string();
    let email = request.email.trim().to_lowercase();
    validate_registration(&name, &email, &request.password)?;

    let password_hash = state.hasher.hash(&request.password);
    let user = state
        .users
        .create(NewUser { name, email, password_hash, contacts: Vec::new() })
        .await
        .map_err(|error| {
            if error.is_unique_violation() {
                ApiError::bad_request(
                    "Email already registered. Please use a different email or try logging in.",
                )
            } else {
                ApiError::from(error)
            }
        })?;

    let token = issue_token(&state, &user)?;
    tracing::info!(event_name = "api.auth.registered", user_id = %user.id.0, "account created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully",
            "token": token,
            "user": public_user(&user),
        })),
    ))
}

pub async fn login(
    State(state): State<ApiState>,
    ClientIp(client): ClientIp,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.limiter.try_acquire(&LOGIN_POLICY, &client) {
        return Err(ApiError::too_many_requests(
            "Too many login attempts. Please try again in 15 minutes.",
        ));
    }

    // Same response for an unknown email and a wrong password.
    let email = request.email.trim().to_lowercase();
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .filter(|user| state.hasher.verify(&request.password, &user.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let token = issue_token(&state, &user)?;
    tracing::info!(event_name = "api.auth.logged_in", user_id = %user.id.0, "login succeeded");

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": public_user(&user),
    })))
}

pub async fn me(
    State(state): State<ApiState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let account = state
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token. Please login again."))?;

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": account.id.0,
            "name": account.name,
            "email": account.email,
            "contacts": account.contacts,
        },
    })))
}
