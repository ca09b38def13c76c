/// Payment endpoints
///
/// - `GET /v1/payments` - `member_id`, `status`, `month`, `year`, `page`, `limit` (20)
/// - `POST /v1/payments` - record a payment (201)
/// - `GET /v1/payments/:id`
/// - `PUT /v1/payments/:id` - partial update with status transition rules
/// - `DELETE /v1/payments/:id` - cancel (status `CANCELLED`)
///
/// Status moves forward only:
///
/// ```text
/// PENDING ──> PAID
///    │ └────> CANCELLED
///    └──> OVERDUE ──> PAID | CANCELLED
/// ```
///
/// Moving to `PAID` without a `paid_at`, and none stored, stamps the
/// current time. Payments are never deleted.

use crate::{
    app::AppState,
    error::{
        ApiError, ApiJson, ApiPath, ApiQuery, ApiResult, MSG_DUPLICATE_PERIOD,
        MSG_MEMBER_NOT_FOUND, MSG_PAYMENT_NOT_FOUND,
    },
    routes::{non_blank, nullable, nullable_text, PageRequest, Pagination},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use socios_shared::{
    auth::middleware::AuthContext,
    models::{
        audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry},
        member::Member,
        payment::{
            fits_money_column, CreatePayment, Payment, PaymentFilter, PaymentListItem,
            PaymentMethod, PaymentStatus, UpdatePayment,
        },
    },
};
use uuid::Uuid;

/// Default page size for payment listings
pub const DEFAULT_PAYMENT_PAGE_SIZE: i64 = 20;

/// Accepted reference years
pub const MIN_REFERENCE_YEAR: i32 = 2000;
pub const MAX_REFERENCE_YEAR: i32 = 2100;

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub member_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub member_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,

    /// Defaults to `PENDING`
    pub status: Option<PaymentStatus>,
    pub reference_month: Option<i32>,
    pub reference_year: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePaymentRequest {
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    pub due_date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "nullable")]
    pub paid_at: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "nullable_text")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: &'static str,
    pub payment: Payment,
}

fn check_amount(amount: Decimal) -> ApiResult<()> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "Valor deve ser maior que zero".to_string(),
        ));
    }
    if !fits_money_column(amount) {
        return Err(ApiError::BadRequest(
            "Valor deve ter até duas casas decimais e no máximo 99.999.999,99".to_string(),
        ));
    }
    Ok(())
}

fn check_month(month: i32) -> ApiResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ApiError::BadRequest(
            "Mês de referência deve estar entre 1 e 12".to_string(),
        ));
    }
    Ok(())
}

fn check_year(year: i32) -> ApiResult<()> {
    if !(MIN_REFERENCE_YEAR..=MAX_REFERENCE_YEAR).contains(&year) {
        return Err(ApiError::BadRequest(format!(
            "Ano de referência deve estar entre {} e {}",
            MIN_REFERENCE_YEAR, MAX_REFERENCE_YEAR
        )));
    }
    Ok(())
}

fn invalid_transition(from: PaymentStatus, to: PaymentStatus) -> ApiError {
    ApiError::BadRequest(format!(
        "Não é possível alterar o status de {} para {}",
        from.as_str(),
        to.as_str()
    ))
}

/// Turns a create request into model input, rejecting bad fields
fn new_payment(
    req: CreatePaymentRequest,
    registered_by: Uuid,
    now: DateTime<Utc>,
) -> ApiResult<CreatePayment> {
    let (
        Some(member_id),
        Some(amount),
        Some(method),
        Some(reference_month),
        Some(reference_year),
        Some(due_date),
    ) = (
        req.member_id,
        req.amount,
        req.method,
        req.reference_month,
        req.reference_year,
        req.due_date,
    )
    else {
        return Err(ApiError::BadRequest("Campos obrigatórios faltando".to_string()));
    };

    check_amount(amount)?;
    check_month(reference_month)?;
    check_year(reference_year)?;

    let status = req.status.unwrap_or(PaymentStatus::Pending);
    if status == PaymentStatus::Cancelled {
        return Err(ApiError::BadRequest(
            "Um pagamento não pode ser criado já cancelado".to_string(),
        ));
    }

    let paid_at = match status {
        PaymentStatus::Paid => Some(req.paid_at.unwrap_or(now)),
        _ => None,
    };

    Ok(CreatePayment {
        member_id,
        amount,
        method,
        status,
        reference_month,
        reference_year,
        due_date,
        paid_at,
        notes: non_blank(req.notes),
        registered_by,
    })
}

/// Checks an update against the stored row and fills in `paid_at`
fn payment_changes(
    req: UpdatePaymentRequest,
    current: &Payment,
    now: DateTime<Utc>,
) -> ApiResult<UpdatePayment> {
    if let Some(amount) = req.amount {
        check_amount(amount)?;
    }

    if let Some(target) = req.status {
        if !current.status.can_transition_to(target) {
            return Err(invalid_transition(current.status, target));
        }
    }

    let becomes_paid = req.status == Some(PaymentStatus::Paid);
    let paid_at = match req.paid_at {
        None if becomes_paid && current.paid_at.is_none() => Some(Some(now)),
        Some(None) if becomes_paid || current.status == PaymentStatus::Paid => {
            return Err(ApiError::BadRequest(
                "Pagamento pago precisa de data de pagamento".to_string(),
            ))
        }
        other => other,
    };

    Ok(UpdatePayment {
        amount: req.amount,
        method: req.method,
        status: req.status,
        due_date: req.due_date,
        paid_at,
        notes: req.notes,
    })
}

pub async fn list_payments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListPaymentsQuery>,
) -> ApiResult<Json<PaymentListResponse>> {
    if let Some(month) = query.month {
        check_month(month)?;
    }

    let page = PageRequest::new(query.page, query.limit, DEFAULT_PAYMENT_PAGE_SIZE);

    let filter = PaymentFilter {
        member_id: query.member_id,
        status: query.status,
        month: query.month,
        year: query.year,
        limit: page.limit,
        offset: page.offset(),
    };

    let payments = Payment::list(&state.db, &filter).await?;
    let total = Payment::count(&state.db, &filter).await?;

    Ok(Json(PaymentListResponse {
        payments,
        pagination: page.pagination(total),
    }))
}

/// Records a payment
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid fields, or the member already
///   has a payment for the reference month/year
/// - `404 Not Found`: Unknown member
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentListItem>)> {
    let data = new_payment(req, auth.user_id, Utc::now())?;

    let mut tx = state.db.begin().await?;

    if Member::find_by_id(&mut *tx, data.member_id).await?.is_none() {
        return Err(ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string()));
    }

    let existing = Payment::find_for_period(
        &mut *tx,
        data.member_id,
        data.reference_month,
        data.reference_year,
    )
    .await?;
    if existing.is_some() {
        return Err(ApiError::BadRequest(MSG_DUPLICATE_PERIOD.to_string()));
    }

    let payment = Payment::create(&mut *tx, data).await?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Create,
            entity_type: AuditEntity::Payment,
            entity_id: Some(payment.id.to_string()),
            changes: json!(payment),
            user_id: auth.user_id,
        },
    )
    .await?;

    let item = Payment::find_list_item(&mut *tx, payment.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Created payment vanished".to_string()))?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        member_id = %payment.member_id,
        month = payment.reference_month,
        year = payment.reference_year,
        "Payment recorded"
    );

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PaymentListItem>> {
    let item = Payment::find_list_item(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_PAYMENT_NOT_FOUND.to_string()))?;

    Ok(Json(item))
}

/// Applies a partial update
///
/// # Errors
///
/// - `400 Bad Request`: Invalid amount or status transition
/// - `404 Not Found`: Unknown payment
pub async fn update_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePaymentRequest>,
) -> ApiResult<Json<Payment>> {
    let mut tx = state.db.begin().await?;

    let before = Payment::find_by_id_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_PAYMENT_NOT_FOUND.to_string()))?;

    let changes = payment_changes(req, &before, Utc::now())?;

    let after = Payment::update(&mut *tx, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_PAYMENT_NOT_FOUND.to_string()))?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Update,
            entity_type: AuditEntity::Payment,
            entity_id: Some(id.to_string()),
            changes: json!({ "before": before, "after": after }),
            user_id: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        payment_id = %id,
        status = after.status.as_str(),
        user_id = %auth.user_id,
        "Payment updated"
    );

    Ok(Json(after))
}

/// Cancels a payment
///
/// Cancelling an already cancelled payment is a no-op; a paid one cannot
/// be cancelled.
pub async fn cancel_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    let mut tx = state.db.begin().await?;

    let current = Payment::find_by_id_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_PAYMENT_NOT_FOUND.to_string()))?;

    if !current.status.can_transition_to(PaymentStatus::Cancelled) {
        return Err(invalid_transition(current.status, PaymentStatus::Cancelled));
    }

    if current.status == PaymentStatus::Cancelled {
        return Ok(Json(CancelResponse {
            message: "Pagamento já estava cancelado",
            payment: current,
        }));
    }

    let payment = Payment::cancel(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_PAYMENT_NOT_FOUND.to_string()))?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Cancel,
            entity_type: AuditEntity::Payment,
            entity_id: Some(id.to_string()),
            changes: json!({ "status": { "from": current.status, "to": payment.status } }),
            user_id: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(payment_id = %id, user_id = %auth.user_id, "Payment cancelled");

    Ok(Json(CancelResponse {
        message: "Pagamento cancelado com sucesso",
        payment,
    }))
}
