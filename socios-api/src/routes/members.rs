/// Member endpoints
///
/// - `GET /v1/members` - `search`, `active`, `page`, `limit` (10)
/// - `POST /v1/members` - register a member (201)
/// - `GET /v1/members/:id` - member, creator and payment history
/// - `PUT /v1/members/:id` - partial update
/// - `DELETE /v1/members/:id` - soft deactivation
///
/// CPFs are accepted formatted or bare and stored as 11 digits. Every
/// mutation writes its audit entry in the same transaction.

use crate::{
    app::AppState,
    error::{
        validate_request, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult, MSG_DUPLICATE_CPF,
        MSG_MEMBER_NOT_FOUND,
    },
    routes::{non_blank, nullable_text, PageRequest, Pagination},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use socios_shared::{
    auth::middleware::AuthContext,
    cpf::{clean_cpf, format_cpf, validate_cpf},
    models::{
        audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry},
        member::{CreateMember, Member, MemberFilter, MemberListItem, MemberWithCreator, UpdateMember},
        payment::{Payment, PaymentListItem},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Default page size for member listings
pub const DEFAULT_MEMBER_PAGE_SIZE: i64 = 10;

/// Minimum number of digits in a phone number (area code + number)
pub const MIN_PHONE_DIGITS: usize = 10;

/// Longest phone number the `phone` column stores
pub const MAX_PHONE_DIGITS: usize = 20;

const MSG_REQUIRED: &str = "Nome, CPF, data de nascimento e telefone são obrigatórios";

#[derive(Debug, Deserialize)]
pub struct ListMembersQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMemberRequest {
    #[validate(length(max = 255, message = "Nome deve ter no máximo 255 caracteres"))]
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,

    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub join_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, max = 255, message = "Nome deve ter entre 1 e 255 caracteres"))]
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "nullable_text")]
    #[validate(email(message = "Email inválido"))]
    pub email: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable_text")]
    pub address: Option<Option<String>>,

    pub active: Option<bool>,
    pub join_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MemberDetailResponse {
    #[serde(flatten)]
    pub member: MemberWithCreator,

    /// CPF as `000.000.000-00`
    pub cpf_formatted: String,

    pub payments: Vec<PaymentListItem>,
}

#[derive(Debug, Serialize)]
pub struct DeactivateResponse {
    pub message: &'static str,
    pub member: Member,
}

/// Validates and normalizes a CPF to bare digits
fn normalize_cpf(cpf: &str) -> ApiResult<String> {
    if !validate_cpf(cpf) {
        return Err(ApiError::BadRequest("CPF inválido".to_string()));
    }
    Ok(clean_cpf(cpf))
}

/// Keeps only digits; between [`MIN_PHONE_DIGITS`] and
/// [`MAX_PHONE_DIGITS`] are required
fn normalize_phone(phone: &str) -> ApiResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ApiError::BadRequest(
            "Telefone deve ter pelo menos 10 dígitos".to_string(),
        ));
    }
    if digits.len() > MAX_PHONE_DIGITS {
        return Err(ApiError::BadRequest(
            "Telefone deve ter no máximo 20 dígitos".to_string(),
        ));
    }
    Ok(digits)
}

fn check_birth_date(birth_date: NaiveDate, today: NaiveDate) -> ApiResult<()> {
    if birth_date > today {
        return Err(ApiError::BadRequest(
            "Data de nascimento não pode estar no futuro".to_string(),
        ));
    }
    Ok(())
}

/// Turns a create request into model input, rejecting bad fields
fn new_member(
    mut req: CreateMemberRequest,
    created_by: Uuid,
    today: NaiveDate,
) -> ApiResult<CreateMember> {
    // Forms send "" for an untouched optional email
    req.email = non_blank(req.email.take());
    validate_request(&req)?;

    let (Some(name), Some(cpf), Some(birth_date), Some(phone)) = (
        non_blank(req.name),
        non_blank(req.cpf),
        req.birth_date,
        non_blank(req.phone),
    ) else {
        return Err(ApiError::BadRequest(MSG_REQUIRED.to_string()));
    };

    check_birth_date(birth_date, today)?;

    Ok(CreateMember {
        name,
        cpf: normalize_cpf(&cpf)?,
        birth_date,
        phone: normalize_phone(&phone)?,
        email: req.email.map(|email| email.to_lowercase()),
        address: non_blank(req.address),
        join_date: req.join_date,
        created_by,
    })
}

/// Turns an update request into a partial model update
fn member_changes(req: UpdateMemberRequest, today: NaiveDate) -> ApiResult<UpdateMember> {
    validate_request(&req)?;

    let name = match req.name {
        Some(name) => Some(
            non_blank(Some(name))
                .ok_or_else(|| ApiError::BadRequest("Nome não pode ficar vazio".to_string()))?,
        ),
        None => None,
    };

    if let Some(birth_date) = req.birth_date {
        check_birth_date(birth_date, today)?;
    }

    Ok(UpdateMember {
        name,
        cpf: req.cpf.as_deref().map(normalize_cpf).transpose()?,
        birth_date: req.birth_date,
        phone: req.phone.as_deref().map(normalize_phone).transpose()?,
        email: req.email.map(|email| email.map(|e| e.to_lowercase())),
        address: req.address,
        active: req.active,
        join_date: req.join_date,
    })
}

pub async fn list_members(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListMembersQuery>,
) -> ApiResult<Json<MemberListResponse>> {
    let page = PageRequest::new(query.page, query.limit, DEFAULT_MEMBER_PAGE_SIZE);

    let filter = MemberFilter {
        search: non_blank(query.search),
        active: query.active,
        limit: page.limit,
        offset: page.offset(),
    };

    let members = Member::list(&state.db, &filter).await?;
    let total = Member::count(&state.db, &filter).await?;

    Ok(Json(MemberListResponse {
        members,
        pagination: page.pagination(total),
    }))
}

/// Registers a member
///
/// # Errors
///
/// - `400 Bad Request`: Missing required fields, invalid CPF or phone,
///   or CPF already registered
pub async fn create_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateMemberRequest>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    let data = new_member(req, auth.user_id, Utc::now().date_naive())?;

    let mut tx = state.db.begin().await?;

    let member = Member::create(&mut *tx, data).await?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Create,
            entity_type: AuditEntity::Member,
            entity_id: Some(member.id.to_string()),
            changes: json!(member),
            user_id: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(member_id = %member.id, user_id = %auth.user_id, "Member registered");

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MemberDetailResponse>> {
    let member = Member::find_with_creator(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string()))?;

    let payments = Payment::list_for_member(&state.db, id).await?;

    Ok(Json(MemberDetailResponse {
        cpf_formatted: format_cpf(&member.member.cpf),
        member,
        payments,
    }))
}

/// Applies a partial update
///
/// # Errors
///
/// - `400 Bad Request`: Invalid field, or the CPF belongs to another member
/// - `404 Not Found`: Unknown member
pub async fn update_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateMemberRequest>,
) -> ApiResult<Json<Member>> {
    let changes = member_changes(req, Utc::now().date_naive())?;

    let mut tx = state.db.begin().await?;

    let before = Member::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string()))?;

    if let Some(cpf) = changes.cpf.as_deref() {
        if let Some(other) = Member::find_by_cpf(&mut *tx, cpf).await? {
            if other.id != id {
                return Err(ApiError::BadRequest(MSG_DUPLICATE_CPF.to_string()));
            }
        }
    }

    let after = Member::update(&mut *tx, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string()))?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Update,
            entity_type: AuditEntity::Member,
            entity_id: Some(id.to_string()),
            changes: json!({ "before": before, "after": after }),
            user_id: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(member_id = %id, user_id = %auth.user_id, "Member updated");

    Ok(Json(after))
}

/// Deactivates a member; payments are kept
pub async fn deactivate_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeactivateResponse>> {
    let mut tx = state.db.begin().await?;

    let before = Member::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string()))?;

    let member = Member::deactivate(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string()))?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Delete,
            entity_type: AuditEntity::Member,
            entity_id: Some(id.to_string()),
            changes: json!({ "before": before, "active": false }),
            user_id: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(member_id = %id, user_id = %auth.user_id, "Member deactivated");

    Ok(Json(DeactivateResponse {
        message: "Sócio desativado com sucesso",
        member,
    }))
}
