/// Database layer
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Schema migration runner (migrations live in `migrations/`
///   at the workspace root)
///
/// Models are in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use socios_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
