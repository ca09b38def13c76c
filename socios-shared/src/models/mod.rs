/// Database models for the membership service
///
/// Each model owns its SQL. Functions take any `PgExecutor`, so handlers can
/// run them against the pool or inside an open transaction.
///
/// # Models
///
/// - `user`: Staff accounts and the one-time setup
/// - `member`: Registered fan members (soft-deactivated, never deleted)
/// - `payment`: Monthly dues, one per member and reference period
/// - `settings`: Singleton system settings row
/// - `audit_log`: Append-only history of mutations
///
/// # Example
///
/// ```no_run
/// use socios_shared::models::member::{Member, MemberFilter};
/// use socios_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let filter = MemberFilter {
///     search: Some("silva".to_string()),
///     active: Some(true),
///     ..Default::default()
/// };
///
/// let members = Member::list(&pool, &filter).await?;
/// # Ok(())
/// # }
/// ```

pub mod audit_log;
pub mod member;
pub mod payment;
pub mod settings;
pub mod user;
