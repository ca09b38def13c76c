/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password policy
/// - [`jwt`]: Access and refresh tokens (HS256)
/// - [`middleware`]: Bearer token extraction and the request auth context
/// - [`authorization`]: Role checks
///
/// # Example
///
/// ```no_run
/// use socios_shared::auth::password::{hash_password, verify_password};
/// use socios_shared::auth::jwt::{create_token, Claims, TokenType};
/// use socios_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("senha123")?;
/// assert!(verify_password("senha123", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), UserRole::Admin, TokenType::Access);
/// let token = create_token(&claims, "a-secret-of-at-least-thirty-two-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
