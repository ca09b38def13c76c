/// Current-user endpoints
///
/// - `GET /v1/users/me`
/// - `PUT /v1/users/me/password`

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use socios_shared::{
    auth::{middleware::AuthContext, password},
    models::{
        audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry},
        user::User,
    },
};

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

async fn current_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| ApiError::Unauthorized("Sessão inválida".to_string()))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    Ok(Json(current_user(&state, &auth).await?))
}

/// Changes the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, wrong current password, or a new
///   password that is too short or equal to the current one
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(current), Some(new)) = (req.current_password, req.new_password) else {
        return Err(ApiError::BadRequest("Campos obrigatórios faltando".to_string()));
    };

    password::validate_password_strength(&new).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new("new_password", e)])
    })?;

    if current == new {
        return Err(ApiError::BadRequest(
            "A nova senha deve ser diferente da atual".to_string(),
        ));
    }

    let user = current_user(&state, &auth).await?;

    if !password::verify_password(&current, &user.password_hash)? {
        return Err(ApiError::BadRequest("Senha atual incorreta".to_string()));
    }

    let password_hash = password::hash_password(&new)?;

    let mut tx = state.db.begin().await?;

    User::update_password(&mut *tx, user.id, &password_hash).await?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::UpdatePassword,
            entity_type: AuditEntity::User,
            entity_id: Some(user.id.to_string()),
            changes: json!({}),
            user_id: user.id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse {
        message: "Senha alterada com sucesso",
    }))
}
