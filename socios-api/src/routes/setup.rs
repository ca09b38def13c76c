/// One-time setup
///
/// - `GET /v1/setup` - `{ "needs_setup": bool, "user_count": n }`
/// - `POST /v1/setup` - create the first administrator (only while no user exists)
///
/// Both endpoints are public. The create path re-checks the user count
/// under an advisory lock inside `User::create_initial_admin`, so two
/// concurrent calls cannot both succeed.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiJson, ApiResult, ValidationErrorDetail},
    routes::non_blank,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use socios_shared::{
    auth::password,
    models::user::{CreateUser, InitialAdmin, User, UserRole},
};
use validator::Validate;

const SETUP_DONE: &str = "Setup já foi concluído. Já existem usuários no sistema.";

#[derive(Debug, Serialize)]
pub struct SetupStatus {
    pub needs_setup: bool,
    pub user_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetupRequest {
    #[validate(length(max = 120, message = "Nome deve ter no máximo 120 caracteres"))]
    pub name: Option<String>,

    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,

    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub message: &'static str,
    pub user: User,
}

pub async fn setup_status(State(state): State<AppState>) -> ApiResult<Json<SetupStatus>> {
    let user_count = User::count(&state.db).await?;

    Ok(Json(SetupStatus {
        needs_setup: user_count == 0,
        user_count,
    }))
}

/// Creates the initial administrator
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, malformed email or short password
/// - `403 Forbidden`: At least one user already exists
pub async fn create_admin(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SetupRequest>,
) -> ApiResult<(StatusCode, Json<SetupResponse>)> {
    validate_request(&req)?;

    let (Some(name), Some(email), Some(password)) =
        (non_blank(req.name), non_blank(req.email), req.password)
    else {
        return Err(ApiError::BadRequest("Campos obrigatórios faltando".to_string()));
    };

    password::validate_password_strength(&password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new("password", e)])
    })?;

    // Skip the hashing cost for the common already-configured case
    if User::count(&state.db).await? > 0 {
        return Err(ApiError::Forbidden(SETUP_DONE.to_string()));
    }

    let password_hash = password::hash_password(&password)?;

    let outcome = User::create_initial_admin(
        &state.db,
        CreateUser {
            email: email.to_lowercase(),
            name,
            password_hash,
            role: UserRole::Admin,
        },
    )
    .await?;

    match outcome {
        InitialAdmin::Created(user) => {
            tracing::info!(user_id = %user.id, email = %user.email, "Initial administrator created");
            Ok((
                StatusCode::CREATED,
                Json(SetupResponse {
                    message: "Administrador criado com sucesso",
                    user,
                }),
            ))
        }
        InitialAdmin::AlreadyConfigured => {
            tracing::warn!("Concurrent setup attempt refused");
            Err(ApiError::Forbidden(SETUP_DONE.to_string()))
        }
    }
}
