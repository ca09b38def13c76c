/// Member model and database operations
///
/// Members are never deleted. Deactivation flips `active` to false and
/// leaves every payment untouched, so the financial history survives.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     cpf VARCHAR(11) NOT NULL,
///     birth_date DATE NOT NULL,
///     phone VARCHAR(20) NOT NULL,
///     email VARCHAR(255),
///     address TEXT,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     join_date DATE NOT NULL DEFAULT CURRENT_DATE,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT members_cpf_key UNIQUE (cpf)
/// );
/// ```
///
/// CPFs are stored as 11 bare digits; callers normalize with
/// [`crate::cpf::clean_cpf`] before writing or looking up.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Registered fan member
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    pub name: String,

    /// 11 digits, no punctuation
    pub cpf: String,

    pub birth_date: NaiveDate,

    /// Digits only
    pub phone: String,

    pub email: Option<String>,
    pub address: Option<String>,

    /// False once deactivated
    pub active: bool,

    pub join_date: NaiveDate,

    /// Staff user who registered the member
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a member
#[derive(Debug, Clone)]
pub struct CreateMember {
    pub name: String,
    pub cpf: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,

    /// Defaults to today when absent
    pub join_date: Option<NaiveDate>,

    pub created_by: Uuid,
}

/// Partial update
///
/// `None` leaves a column unchanged. For the nullable columns the inner
/// option is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateMember {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub active: Option<bool>,
    pub join_date: Option<NaiveDate>,
}

/// List filter and page window
#[derive(Debug, Clone)]
pub struct MemberFilter {
    /// Case-insensitive on name, substring on CPF and phone
    pub search: Option<String>,
    pub active: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for MemberFilter {
    fn default() -> Self {
        Self {
            search: None,
            active: None,
            limit: 10,
            offset: 0,
        }
    }
}

/// Member row as shown in listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub member: Member,

    /// Name of the staff user who registered the member
    pub created_by_name: String,

    /// Payments still in `PENDING`
    pub pending_payments: i64,
}

/// Member with creator details, used by the detail view
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberWithCreator {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub member: Member,

    pub created_by_name: String,
    pub created_by_email: String,
}

const MEMBER_COLUMNS: &str = "id, name, cpf, birth_date, phone, email, address, active, \
     join_date, created_by, created_at, updated_at";

// Shared WHERE clause for `list` and `count`; $1 = search, $2 = active
const MEMBER_FILTER: &str = "($1::text IS NULL
        OR m.name ILIKE '%' || $1 || '%'
        OR m.cpf LIKE '%' || $1 || '%'
        OR m.phone LIKE '%' || $1 || '%')
    AND ($2::boolean IS NULL OR m.active = $2)";

impl Member {
    /// Inserts a member
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `members_cpf_key` when the CPF is
    /// already registered.
    pub async fn create<'e, E>(executor: E, data: CreateMember) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO members (name, cpf, birth_date, phone, email, address, join_date, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, CURRENT_DATE), $8)
             RETURNING {MEMBER_COLUMNS}"
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(data.name)
            .bind(data.cpf)
            .bind(data.birth_date)
            .bind(data.phone)
            .bind(data.email)
            .bind(data.address)
            .bind(data.join_date)
            .bind(data.created_by)
            .fetch_one(executor)
            .await
    }

    /// Finds a member by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1");

        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a member by normalized CPF
    pub async fn find_by_cpf<'e, E>(executor: E, cpf: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE cpf = $1");

        sqlx::query_as::<_, Member>(&query)
            .bind(cpf)
            .fetch_optional(executor)
            .await
    }

    /// Loads a member together with the creator's name and email
    pub async fn find_with_creator<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<MemberWithCreator>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, MemberWithCreator>(
            r#"
            SELECT m.id, m.name, m.cpf, m.birth_date, m.phone, m.email, m.address,
                   m.active, m.join_date, m.created_by, m.created_at, m.updated_at,
                   u.name AS created_by_name,
                   u.email AS created_by_email
            FROM members m
            JOIN users u ON u.id = m.created_by
            WHERE m.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists members, newest registrations first
    pub async fn list<'e, E>(
        executor: E,
        filter: &MemberFilter,
    ) -> Result<Vec<MemberListItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT m.id, m.name, m.cpf, m.birth_date, m.phone, m.email, m.address,
                    m.active, m.join_date, m.created_by, m.created_at, m.updated_at,
                    u.name AS created_by_name,
                    (SELECT COUNT(*) FROM payments p
                     WHERE p.member_id = m.id AND p.status = 'PENDING') AS pending_payments
             FROM members m
             JOIN users u ON u.id = m.created_by
             WHERE {MEMBER_FILTER}
             ORDER BY m.created_at DESC
             LIMIT $3 OFFSET $4"
        );

        sqlx::query_as::<_, MemberListItem>(&query)
            .bind(filter.search.as_deref())
            .bind(filter.active)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(executor)
            .await
    }

    /// Counts members matching the filter, ignoring the page window
    pub async fn count<'e, E>(executor: E, filter: &MemberFilter) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT COUNT(*) FROM members m WHERE {MEMBER_FILTER}");

        sqlx::query_scalar(&query)
            .bind(filter.search.as_deref())
            .bind(filter.active)
            .fetch_one(executor)
            .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` when the member does not exist.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateMember,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE members
             SET name = COALESCE($2, name),
                 cpf = COALESCE($3, cpf),
                 birth_date = COALESCE($4, birth_date),
                 phone = COALESCE($5, phone),
                 email = CASE WHEN $6 THEN $7 ELSE email END,
                 address = CASE WHEN $8 THEN $9 ELSE address END,
                 active = COALESCE($10, active),
                 join_date = COALESCE($11, join_date),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {MEMBER_COLUMNS}"
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.cpf)
            .bind(data.birth_date)
            .bind(data.phone)
            .bind(data.email.is_some())
            .bind(data.email.flatten())
            .bind(data.address.is_some())
            .bind(data.address.flatten())
            .bind(data.active)
            .bind(data.join_date)
            .fetch_optional(executor)
            .await
    }

    /// Soft-deletes a member by clearing `active`
    ///
    /// Payments are not touched. Returns `None` when the member does not
    /// exist.
    pub async fn deactivate<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE members SET active = FALSE, updated_at = NOW()
             WHERE id = $1
             RETURNING {MEMBER_COLUMNS}"
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Counts active members
    pub async fn count_active<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE active")
            .fetch_one(executor)
            .await
    }

    /// Counts active members registered before `cutoff`
    ///
    /// Used as the baseline when comparing against the previous month.
    pub async fn count_active_created_before<'e, E>(
        executor: E,
        cutoff: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE active AND created_at < $1")
            .bind(cutoff)
            .fetch_one(executor)
            .await
    }
}
