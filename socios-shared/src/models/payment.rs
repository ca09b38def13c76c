/// Payment model and database operations
///
/// A payment records the dues of one member for one reference period
/// (month and year). At most one payment exists per member and period.
/// Payments are never deleted; cancelling sets the status to `CANCELLED`.
///
/// # Status Transitions
///
/// ```text
/// PENDING → PAID
///         → OVERDUE → PAID
///                   → CANCELLED
///         → CANCELLED
/// ```
///
/// `PAID` and `CANCELLED` are final. Setting a status to itself is allowed.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE payment_method AS ENUM ('PIX', 'CASH', 'CARD', 'BOLETO');
/// CREATE TYPE payment_status AS ENUM ('PENDING', 'PAID', 'OVERDUE', 'CANCELLED');
///
/// CREATE TABLE payments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     member_id UUID NOT NULL REFERENCES members(id),
///     amount NUMERIC(10, 2) NOT NULL CHECK (amount > 0),
///     method payment_method NOT NULL,
///     status payment_status NOT NULL DEFAULT 'PENDING',
///     reference_month INTEGER NOT NULL CHECK (reference_month BETWEEN 1 AND 12),
///     reference_year INTEGER NOT NULL,
///     due_date DATE NOT NULL,
///     paid_at TIMESTAMPTZ,
///     notes TEXT,
///     registered_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT payments_member_period_key
///         UNIQUE (member_id, reference_month, reference_year)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use socios_shared::models::payment::{CreatePayment, Payment, PaymentMethod, PaymentStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, member_id: Uuid, staff_id: Uuid) -> Result<(), sqlx::Error> {
/// let payment = Payment::create(&pool, CreatePayment {
///     member_id,
///     amount: Decimal::new(5000, 2),
///     method: PaymentMethod::Pix,
///     status: PaymentStatus::Pending,
///     reference_month: 3,
///     reference_year: 2025,
///     due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
///     paid_at: None,
///     notes: None,
///     registered_by: staff_id,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// How the member paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Pix,
    Cash,
    Card,
    Boleto,
}

/// Payment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// Registered, not yet paid
    Pending,

    /// Settled
    Paid,

    /// Past due date and still unpaid
    Overdue,

    /// Voided; kept for history
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Overdue => "OVERDUE",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Checks if moving to `target` is allowed
    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        if *self == target {
            return true;
        }

        match (self, target) {
            (PaymentStatus::Pending, PaymentStatus::Paid) => true,
            (PaymentStatus::Pending, PaymentStatus::Overdue) => true,
            (PaymentStatus::Pending, PaymentStatus::Cancelled) => true,

            (PaymentStatus::Overdue, PaymentStatus::Paid) => true,
            (PaymentStatus::Overdue, PaymentStatus::Cancelled) => true,

            _ => false,
        }
    }
}

/// Dues payment for one member and reference period
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub member_id: Uuid,

    /// Two decimal places, always positive
    pub amount: Decimal,

    pub method: PaymentMethod,
    pub status: PaymentStatus,

    /// 1 to 12
    pub reference_month: i32,
    pub reference_year: i32,

    pub due_date: NaiveDate,

    /// When the money was received
    pub paid_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,

    /// Staff user who registered the payment
    pub registered_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a payment
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub member_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_month: i32,
    pub reference_year: i32,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub registered_by: Uuid,
}

/// Partial update
///
/// `None` leaves a column unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct UpdatePayment {
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
}

/// List filter and page window
#[derive(Debug, Clone)]
pub struct PaymentFilter {
    pub member_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PaymentFilter {
    fn default() -> Self {
        Self {
            member_id: None,
            status: None,
            month: None,
            year: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// Payment joined with member and registrar names
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub payment: Payment,

    pub member_name: String,
    pub member_cpf: String,
    pub member_phone: String,
    pub registered_by_name: String,
}

/// Decimal places kept by money columns
pub const MONEY_SCALE: u32 = 2;

/// True when `value` fits a `NUMERIC(10,2)` column without rounding
pub fn fits_money_column(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE && value.abs() <= Decimal::new(9_999_999_999, 2)
}

const PAYMENT_COLUMNS: &str = "id, member_id, amount, method, status, reference_month, \
     reference_year, due_date, paid_at, notes, registered_by, created_at, updated_at";

const PAYMENT_LIST_SELECT: &str = "SELECT p.id, p.member_id, p.amount, p.method, p.status,
            p.reference_month, p.reference_year, p.due_date, p.paid_at, p.notes,
            p.registered_by, p.created_at, p.updated_at,
            m.name AS member_name,
            m.cpf AS member_cpf,
            m.phone AS member_phone,
            u.name AS registered_by_name
     FROM payments p
     JOIN members m ON m.id = p.member_id
     JOIN users u ON u.id = p.registered_by";

// $1 = member_id, $2 = status, $3 = month, $4 = year
const PAYMENT_FILTER: &str = "($1::uuid IS NULL OR p.member_id = $1)
    AND ($2::payment_status IS NULL OR p.status = $2)
    AND ($3::integer IS NULL OR p.reference_month = $3)
    AND ($4::integer IS NULL OR p.reference_year = $4)";

// Unpaid and past due, as of $1
const OVERDUE_CONDITION: &str = "status = 'OVERDUE' OR (status = 'PENDING' AND due_date < $1)";

impl Payment {
    /// Inserts a payment
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `payments_member_period_key` when
    /// the member already has a payment for the period.
    pub async fn create<'e, E>(executor: E, data: CreatePayment) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO payments (member_id, amount, method, status, reference_month,
                                   reference_year, due_date, paid_at, notes, registered_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {PAYMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(data.member_id)
            .bind(data.amount)
            .bind(data.method)
            .bind(data.status)
            .bind(data.reference_month)
            .bind(data.reference_year)
            .bind(data.due_date)
            .bind(data.paid_at)
            .bind(data.notes)
            .bind(data.registered_by)
            .fetch_one(executor)
            .await
    }

    /// Finds a payment by ID and locks the row until the transaction ends
    ///
    /// Status changes read through this so two concurrent transitions of
    /// the same payment are checked one after the other.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE");

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds the payment of a member for one reference period
    pub async fn find_for_period<'e, E>(
        executor: E,
        member_id: Uuid,
        month: i32,
        year: i32,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE member_id = $1 AND reference_month = $2 AND reference_year = $3"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(member_id)
            .bind(month)
            .bind(year)
            .fetch_optional(executor)
            .await
    }

    /// Loads one payment with member and registrar names
    pub async fn find_list_item<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<PaymentListItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("{PAYMENT_LIST_SELECT} WHERE p.id = $1");

        sqlx::query_as::<_, PaymentListItem>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists payments, latest reference period first
    pub async fn list<'e, E>(
        executor: E,
        filter: &PaymentFilter,
    ) -> Result<Vec<PaymentListItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "{PAYMENT_LIST_SELECT}
             WHERE {PAYMENT_FILTER}
             ORDER BY p.reference_year DESC, p.reference_month DESC, p.created_at DESC
             LIMIT $5 OFFSET $6"
        );

        sqlx::query_as::<_, PaymentListItem>(&query)
            .bind(filter.member_id)
            .bind(filter.status)
            .bind(filter.month)
            .bind(filter.year)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(executor)
            .await
    }

    /// Counts payments matching the filter, ignoring the page window
    pub async fn count<'e, E>(executor: E, filter: &PaymentFilter) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT COUNT(*) FROM payments p WHERE {PAYMENT_FILTER}");

        sqlx::query_scalar(&query)
            .bind(filter.member_id)
            .bind(filter.status)
            .bind(filter.month)
            .bind(filter.year)
            .fetch_one(executor)
            .await
    }

    /// Lists every payment of one member, latest period first
    pub async fn list_for_member<'e, E>(
        executor: E,
        member_id: Uuid,
    ) -> Result<Vec<PaymentListItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "{PAYMENT_LIST_SELECT}
             WHERE p.member_id = $1
             ORDER BY p.reference_year DESC, p.reference_month DESC"
        );

        sqlx::query_as::<_, PaymentListItem>(&query)
            .bind(member_id)
            .fetch_all(executor)
            .await
    }

    /// Applies a partial update
    ///
    /// Does not check status transitions; callers do that against the
    /// row read with [`Payment::find_by_id_for_update`].
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdatePayment,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE payments
             SET amount = COALESCE($2, amount),
                 method = COALESCE($3, method),
                 status = COALESCE($4, status),
                 due_date = COALESCE($5, due_date),
                 paid_at = CASE WHEN $6 THEN $7 ELSE paid_at END,
                 notes = CASE WHEN $8 THEN $9 ELSE notes END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(data.amount)
            .bind(data.method)
            .bind(data.status)
            .bind(data.due_date)
            .bind(data.paid_at.is_some())
            .bind(data.paid_at.flatten())
            .bind(data.notes.is_some())
            .bind(data.notes.flatten())
            .fetch_optional(executor)
            .await
    }

    /// Marks a payment as `CANCELLED`
    pub async fn cancel<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE payments SET status = 'CANCELLED', updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Sums `PAID` amounts for a reference period
    pub async fn revenue_for_period<'e, E>(
        executor: E,
        month: i32,
        year: i32,
    ) -> Result<Decimal, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM payments
            WHERE status = 'PAID' AND reference_month = $1 AND reference_year = $2
            "#,
        )
        .bind(month)
        .bind(year)
        .fetch_one(executor)
        .await
    }

    /// Counts `PAID` payments for a reference period
    pub async fn count_paid_for_period<'e, E>(
        executor: E,
        month: i32,
        year: i32,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM payments
            WHERE status = 'PAID' AND reference_month = $1 AND reference_year = $2
            "#,
        )
        .bind(month)
        .bind(year)
        .fetch_one(executor)
        .await
    }

    /// Counts payments that are overdue as of `today`
    ///
    /// A payment is overdue when its status says so, or when it is still
    /// `PENDING` with a due date before `today`.
    pub async fn count_overdue<'e, E>(executor: E, today: NaiveDate) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT COUNT(*) FROM payments WHERE {OVERDUE_CONDITION}");

        sqlx::query_scalar(&query)
            .bind(today)
            .fetch_one(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transitions() {
        let pending = PaymentStatus::Pending;
        assert!(pending.can_transition_to(PaymentStatus::Pending));
        assert!(pending.can_transition_to(PaymentStatus::Paid));
        assert!(pending.can_transition_to(PaymentStatus::Overdue));
        assert!(pending.can_transition_to(PaymentStatus::Cancelled));
    }

    #[test]
    fn test_overdue_transitions() {
        let overdue = PaymentStatus::Overdue;
        assert!(overdue.can_transition_to(PaymentStatus::Paid));
        assert!(overdue.can_transition_to(PaymentStatus::Cancelled));
        assert!(!overdue.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [PaymentStatus::Paid, PaymentStatus::Cancelled] {
            assert!(terminal.can_transition_to(terminal));
        }

        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Cancelled));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Cancelled.can_transition_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Cancelled.can_transition_to(PaymentStatus::Overdue));
    }

    #[test]
    fn test_fits_money_column() {
        assert!(fits_money_column(Decimal::new(5000, 2)));
        assert!(fits_money_column(Decimal::new(50000, 3)));
        assert!(fits_money_column(Decimal::new(9_999_999_999, 2)));
        assert!(!fits_money_column(Decimal::new(10_000_000_000, 2)));
        assert!(!fits_money_column(Decimal::new(100_000_000_000, 0)));
        assert!(!fits_money_column(Decimal::new(50001, 3)));
    }

    #[test]
    fn test_enum_serde() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Pix).unwrap(), "\"PIX\"");
        assert_eq!(
            serde_json::from_str::<PaymentMethod>("\"BOLETO\"").unwrap(),
            PaymentMethod::Boleto
        );
        assert_eq!(
            serde_json::from_str::<PaymentStatus>("\"CANCELLED\"").unwrap(),
            PaymentStatus::Cancelled
        );
        assert!(serde_json::from_str::<PaymentMethod>("\"CHEQUE\"").is_err());
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let payment = Payment {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            amount: Decimal::new(5000, 2),
            method: PaymentMethod::Cash,
            status: PaymentStatus::Paid,
            reference_month: 3,
            reference_year: 2025,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            paid_at: Some(Utc::now()),
            notes: None,
            registered_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["amount"], "50.00");
        assert_eq!(json["status"], "PAID");
        assert_eq!(json["due_date"], "2025-03-10");
    }

    #[test]
    fn test_filter_default_page_size() {
        assert_eq!(PaymentFilter::default().limit, 20);
    }
}
