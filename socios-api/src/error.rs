/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every error renders as
///
/// ```json
/// { "error": "bad_request", "message": "CPF já cadastrado" }
/// ```
///
/// with an optional `details` array for field validation failures.
/// Messages are user-facing and in Portuguese. Internal errors are logged
/// and replaced by a generic message.
///
/// Unique-constraint violations are mapped by constraint name, so the
/// database stays the single source of truth for uniqueness even under
/// concurrent requests.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use socios_shared::auth::{
    authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
};
use std::fmt;
use validator::{Validate, ValidationErrors};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

pub const MSG_DUPLICATE_CPF: &str = "CPF já cadastrado";
pub const MSG_DUPLICATE_PERIOD: &str = "Já existe pagamento registrado para este mês/ano";
pub const MSG_DUPLICATE_EMAIL: &str = "Este email já está em uso";
pub const MSG_MEMBER_NOT_FOUND: &str = "Sócio não encontrado";
pub const MSG_PAYMENT_NOT_FOUND: &str = "Pagamento não encontrado";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400): malformed input, failed domain checks, duplicates
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Field validation failures (400 with details)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Dados inválidos".to_string());
                (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    message,
                    Some(errors),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Erro interno do servidor".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// JSON body extractor whose rejections render as `ApiError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("JSON inválido: {}", rejection.body_text()))
    }
}

/// Query string extractor whose rejections render as `ApiError`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Parâmetros inválidos: {}", rejection.body_text()))
    }
}

/// Path extractor whose rejections render as `ApiError`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::BadRequest("Identificador inválido".to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    ValidationErrorDetail::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Valor inválido".to_string()),
                    )
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

/// Runs `validator` rules on a request body
pub fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(ApiError::from)
}

/// Message for SQLSTATE codes caused by out-of-range input
///
/// - `23514` check_violation
/// - `22001` string_data_right_truncation
/// - `22003` numeric_value_out_of_range
fn input_error_message(code: &str) -> Option<&'static str> {
    match code {
        "23514" | "22003" => Some("Valor fora do intervalo permitido"),
        "22001" => Some("Texto maior que o permitido"),
        _ => None,
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Registro não encontrado".to_string()),
            sqlx::Error::Database(db_err) => {
                match db_err.constraint() {
                    Some("members_cpf_key") => {
                        return ApiError::BadRequest(MSG_DUPLICATE_CPF.to_string())
                    }
                    Some("payments_member_period_key") => {
                        return ApiError::BadRequest(MSG_DUPLICATE_PERIOD.to_string())
                    }
                    Some("users_email_key") => {
                        return ApiError::BadRequest(MSG_DUPLICATE_EMAIL.to_string())
                    }
                    Some("payments_member_id_fkey") => {
                        return ApiError::NotFound(MSG_MEMBER_NOT_FOUND.to_string())
                    }
                    _ => {}
                }

                if let Some(message) = db_err.code().as_deref().and_then(input_error_message) {
                    return ApiError::BadRequest(message.to_string());
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "Authentication failed");
        match err {
            AuthError::MissingCredentials | AuthError::InvalidFormat => {
                ApiError::Unauthorized("Não autorizado".to_string())
            }
            AuthError::InvalidToken(JwtError::Expired) => {
                ApiError::Unauthorized("Sessão expirada".to_string())
            }
            AuthError::InvalidToken(_) => ApiError::Unauthorized("Sessão inválida".to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientRole { .. } => ApiError::Forbidden(
                "Apenas administradores podem realizar esta ação".to_string(),
            ),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Sessão expirada".to_string()),
            _ => ApiError::Unauthorized("Sessão inválida".to_string()),
        }
    }
}
