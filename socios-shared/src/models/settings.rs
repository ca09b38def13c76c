/// System settings singleton
///
/// Exactly one row exists, with id `singleton`. It is created lazily with
/// the column defaults the first time anyone reads it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE system_settings (
///     id TEXT PRIMARY KEY CHECK (id = 'singleton'),
///     membership_value NUMERIC(10, 2) NOT NULL DEFAULT 50.00,
///     payment_due_day_of_month INTEGER NOT NULL DEFAULT 10,
///     evolution_api_url TEXT,
///     evolution_api_key TEXT,
///     evolution_instance TEXT,
///     birthday_message_enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     birthday_message_template TEXT,
///     reminder_message_enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     reminder_message_template TEXT,
///     reminder_days_before_due INTEGER NOT NULL DEFAULT 5,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, PgConnection, Postgres};
use tracing::debug;

/// Primary key of the only settings row
pub const SETTINGS_ID: &str = "singleton";

const MASK: &str = "********";

/// Club-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SystemSettings {
    pub id: String,

    /// Monthly dues
    pub membership_value: Decimal,

    /// Day of the month payments fall due (1 to 31)
    pub payment_due_day_of_month: i32,

    /// Evolution API (WhatsApp gateway) base URL
    pub evolution_api_url: Option<String>,

    /// Evolution API key; masked for non-admin readers
    pub evolution_api_key: Option<String>,

    pub evolution_instance: Option<String>,

    pub birthday_message_enabled: bool,
    pub birthday_message_template: Option<String>,

    pub reminder_message_enabled: bool,
    pub reminder_message_template: Option<String>,

    /// Days before the due date to send the reminder (0 to 31)
    pub reminder_days_before_due: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial settings update
///
/// `None` keeps the stored value. Nullable text columns take
/// `Some(None)` to clear them.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub membership_value: Option<Decimal>,
    pub payment_due_day_of_month: Option<i32>,
    pub evolution_api_url: Option<Option<String>>,
    pub evolution_api_key: Option<Option<String>>,
    pub evolution_instance: Option<Option<String>>,
    pub birthday_message_enabled: Option<bool>,
    pub birthday_message_template: Option<Option<String>>,
    pub reminder_message_enabled: Option<bool>,
    pub reminder_message_template: Option<Option<String>>,
    pub reminder_days_before_due: Option<i32>,
}

const SETTINGS_COLUMNS: &str = "id, membership_value, payment_due_day_of_month, \
     evolution_api_url, evolution_api_key, evolution_instance, \
     birthday_message_enabled, birthday_message_template, \
     reminder_message_enabled, reminder_message_template, \
     reminder_days_before_due, created_at, updated_at";

/// Masks a secret, keeping the last four characters when it is long
/// enough to stay unguessable
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return MASK.to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{MASK}{tail}")
}

/// True for values produced by [`mask_secret`]
///
/// Lets a client send back the settings it was shown without overwriting
/// the stored key with its masked form.
pub fn is_masked(value: &str) -> bool {
    value.starts_with(MASK)
}

impl SystemSettings {
    /// Reads the settings row, inserting the defaults first if missing
    ///
    /// A statement that loses the insert race to a concurrent first read
    /// cannot see the winner's row in its own snapshot and returns nothing;
    /// the follow-up `SELECT` runs with a fresh snapshot and finds it.
    pub fn get_or_create<'a, A>(
        db: A,
    ) -> impl std::future::Future<Output = Result<Self, sqlx::Error>> + Send + 'a
    where
        A: Acquire<'a, Database = Postgres> + Send + 'a,
    {
        async move {
            let mut conn = db.acquire().await?;

            let query = format!(
                "WITH inserted AS (
                     INSERT INTO system_settings (id) VALUES ($1)
                     ON CONFLICT (id) DO NOTHING
                     RETURNING {SETTINGS_COLUMNS}
                 )
                 SELECT {SETTINGS_COLUMNS} FROM inserted
                 UNION ALL
                 SELECT {SETTINGS_COLUMNS} FROM system_settings WHERE id = $1
                 LIMIT 1"
            );

            let settings = sqlx::query_as::<_, SystemSettings>(&query)
                .bind(SETTINGS_ID)
                .fetch_optional(&mut *conn)
                .await?;

            if let Some(settings) = settings {
                return Ok(settings);
            }

            debug!("Settings row created concurrently, reading it back");

            let query = format!("SELECT {SETTINGS_COLUMNS} FROM system_settings WHERE id = $1");
            sqlx::query_as::<_, SystemSettings>(&query)
                .bind(SETTINGS_ID)
                .fetch_one(&mut *conn)
                .await
        }
    }

    /// Applies a partial update, creating the row first if needed
    ///
    /// Takes a connection rather than a generic executor since it issues
    /// two statements; pass `&mut *tx` to keep it inside a transaction.
    pub async fn upsert(conn: &mut PgConnection, data: UpdateSettings) -> Result<Self, sqlx::Error> {
        Self::get_or_create(&mut *conn).await?;

        let query = format!(
            "UPDATE system_settings
             SET membership_value = COALESCE($2, membership_value),
                 payment_due_day_of_month = COALESCE($3, payment_due_day_of_month),
                 evolution_api_url = CASE WHEN $4 THEN $5 ELSE evolution_api_url END,
                 evolution_api_key = CASE WHEN $6 THEN $7 ELSE evolution_api_key END,
                 evolution_instance = CASE WHEN $8 THEN $9 ELSE evolution_instance END,
                 birthday_message_enabled = COALESCE($10, birthday_message_enabled),
                 birthday_message_template =
                     CASE WHEN $11 THEN $12 ELSE birthday_message_template END,
                 reminder_message_enabled = COALESCE($13, reminder_message_enabled),
                 reminder_message_template =
                     CASE WHEN $14 THEN $15 ELSE reminder_message_template END,
                 reminder_days_before_due = COALESCE($16, reminder_days_before_due),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {SETTINGS_COLUMNS}"
        );

        sqlx::query_as::<_, SystemSettings>(&query)
            .bind(SETTINGS_ID)
            .bind(data.membership_value)
            .bind(data.payment_due_day_of_month)
            .bind(data.evolution_api_url.is_some())
            .bind(data.evolution_api_url.flatten())
            .bind(data.evolution_api_key.is_some())
            .bind(data.evolution_api_key.flatten())
            .bind(data.evolution_instance.is_some())
            .bind(data.evolution_instance.flatten())
            .bind(data.birthday_message_enabled)
            .bind(data.birthday_message_template.is_some())
            .bind(data.birthday_message_template.flatten())
            .bind(data.reminder_message_enabled)
            .bind(data.reminder_message_template.is_some())
            .bind(data.reminder_message_template.flatten())
            .bind(data.reminder_days_before_due)
            .fetch_one(&mut *conn)
            .await
    }

    /// Returns a copy safe to show to non-admin users
    pub fn masked(mut self) -> Self {
        self.evolution_api_key = self.evolution_api_key.as_deref().map(mask_secret);
        self
    }

    /// True when all three messaging credentials are filled in
    pub fn messaging_configured(&self) -> bool {
        [
            &self.evolution_api_url,
            &self.evolution_api_key,
            &self.evolution_instance,
        ]
        .iter()
        .all(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}
