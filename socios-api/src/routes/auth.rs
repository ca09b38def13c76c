/// Authentication endpoints
///
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
///
/// Accounts are only created through `/v1/setup`; there is no public
/// registration.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiJson, ApiResult},
    routes::non_blank,
};
use axum::{extract::State, Json};
use socios_shared::{
    auth::{jwt, password},
    models::user::User,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Email ou senha inválidos";

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,

    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    pub user: User,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

fn issue_access_token(user: &User, secret: &str) -> ApiResult<(String, i64)> {
    let claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Access);
    let token = jwt::create_token(&claims, secret)?;
    Ok((token, claims.expires_in_seconds()))
}

/// Login endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// { "email": "admin@clube.com.br", "password": "segredo" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields or malformed email
/// - `401 Unauthorized`: Unknown email, wrong password or inactive user
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    validate_request(&req)?;

    let (Some(email), Some(password)) = (non_blank(req.email), req.password) else {
        return Err(ApiError::BadRequest(
            "Email e senha são obrigatórios".to_string(),
        ));
    };

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            tracing::info!(email = %email, "Login attempt for unknown email");
            ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
        })?;

    if !password::verify_password(&password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login attempt with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.active {
        tracing::info!(user_id = %user.id, "Login attempt by inactive user");
        return Err(ApiError::Unauthorized("Usuário inativo".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let (access_token, expires_in) = issue_access_token(&user, state.jwt_secret())?;
    let refresh_claims = jwt::Claims::new(user.id, user.role, jwt::TokenType::Refresh);
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in,
        user,
    }))
}

/// Token refresh endpoint
///
/// The new access token carries the user's current role, so a role change
/// takes effect at the next refresh.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or the user no
///   longer exists or is inactive
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let token = non_blank(req.refresh_token)
        .ok_or_else(|| ApiError::BadRequest("refresh_token é obrigatório".to_string()))?;

    let claims = jwt::validate_refresh_token(&token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| ApiError::Unauthorized("Sessão inválida".to_string()))?;

    let (access_token, expires_in) = issue_access_token(&user, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer",
        expires_in,
    }))
}
