/// Append-only audit log
///
/// Every mutating operation writes one entry, inside the same transaction as
/// the mutation. Entries are never updated or deleted.
///
/// `action` and `entity_type` are stored as text. The typed enums below
/// cover everything this service writes; readers still accept unknown
/// strings so older or hand-written rows keep rendering.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audit_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     action TEXT NOT NULL,
///     entity_type TEXT NOT NULL,
///     entity_id TEXT,
///     changes JSONB NOT NULL DEFAULT '{}'::jsonb,
///     user_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgExecutor};
use uuid::Uuid;

/// Kind of mutation recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Cancel,
    UpdatePassword,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Cancel => "CANCEL",
            AuditAction::UpdatePassword => "UPDATE_PASSWORD",
        }
    }
}

/// Kind of record an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEntity {
    Member,
    Payment,
    User,
    SystemSettings,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Member => "Member",
            AuditEntity::Payment => "Payment",
            AuditEntity::User => "User",
            AuditEntity::SystemSettings => "SystemSettings",
        }
    }
}

/// Stored audit entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub changes: Json<serde_json::Value>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Entry to append
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,

    /// Free-form payload; usually `{"data": ..}` or `{"before": .., "after": ..}`
    pub changes: serde_json::Value,

    /// Acting user
    pub user_id: Uuid,
}

/// Audit entry joined with the names the dashboard displays
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditActivity {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub created_at: DateTime<Utc>,

    /// Name of the acting user
    pub user_name: String,

    /// Current name of the referenced member, when the entry points at one
    pub member_name: Option<String>,
}

impl AuditLog {
    /// Appends an entry
    ///
    /// Pass the open transaction of the mutation being audited so both
    /// commit or roll back together.
    pub async fn record<'e, E>(executor: E, entry: NewAuditEntry) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        tracing::debug!(
            action = entry.action.as_str(),
            entity_type = entry.entity_type.as_str(),
            entity_id = ?entry.entity_id,
            user_id = %entry.user_id,
            "Recording audit entry"
        );

        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (action, entity_type, entity_id, changes, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, action, entity_type, entity_id, changes, user_id, created_at
            "#,
        )
        .bind(entry.action.as_str())
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(Json(entry.changes))
        .bind(entry.user_id)
        .fetch_one(executor)
        .await
    }

    /// Lists entries created at or after `since`, newest first
    pub async fn recent_since<'e, E>(
        executor: E,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AuditActivity>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditActivity>(
            r#"
            SELECT a.action, a.entity_type, a.entity_id, a.created_at,
                   u.name AS user_name,
                   m.name AS member_name
            FROM audit_logs a
            JOIN users u ON u.id = a.user_id
            LEFT JOIN members m
                   ON a.entity_type = 'Member' AND m.id::text = a.entity_id
            WHERE a.created_at >= $1
            ORDER BY a.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(executor)
        .await
    }
}
