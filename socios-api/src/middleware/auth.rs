/// Session middleware
///
/// Validates the `Authorization: Bearer <access token>` header and stores
/// the resulting [`AuthContext`] in the request extensions, where handlers
/// pick it up with `Extension<AuthContext>`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use socios_shared::auth::middleware::{authenticate, AuthContext};

/// Rejects the request with 401 unless it carries a valid access token
pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext = authenticate(req.headers(), state.jwt_secret())?;

    tracing::debug!(user_id = %auth.user_id, role = auth.role.as_str(), "Authenticated request");
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
