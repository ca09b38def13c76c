/// Role checks
///
/// Two roles exist. `USER` operates members and payments; `ADMIN` can do
/// everything a user can and also change system settings.
///
/// # Example
///
/// ```no_run
/// use socios_shared::auth::authorization::require_admin;
/// use socios_shared::auth::middleware::AuthContext;
///
/// fn update_settings(auth: &AuthContext) -> Result<(), Box<dyn std::error::Error>> {
///     require_admin(auth)?;
///     Ok(())
/// }
/// ```

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole { required: UserRole, actual: UserRole },
}

/// Requires the caller to be an administrator
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_admin() {
        return Err(AuthzError::InsufficientRole {
            required: UserRole::Admin,
            actual: auth.role,
        });
    }

    Ok(())
}
