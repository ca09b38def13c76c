/// Settings endpoints
///
/// - `GET /v1/settings` - the singleton row, created with defaults on first read
/// - `PUT /v1/settings` - partial update, administrators only
/// - `GET /v1/settings/features` - feature-module cards for the settings panel
///
/// Non-admin readers get the Evolution API key masked.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiJson, ApiResult},
    routes::nullable_text,
};
use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use socios_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    features::{feature_catalog, FeatureModule},
    models::{
        audit_log::{AuditAction, AuditEntity, AuditLog, NewAuditEntry},
        payment::fits_money_column,
        settings::{is_masked, mask_secret, SystemSettings, UpdateSettings, SETTINGS_ID},
    },
};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct UpdateSettingsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_value: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 31, message = "Dia de vencimento deve estar entre 1 e 31"))]
    pub payment_due_day_of_month: Option<i32>,

    #[serde(default, deserialize_with = "nullable_text", skip_serializing_if = "Option::is_none")]
    pub evolution_api_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable_text", skip_serializing_if = "Option::is_none")]
    pub evolution_api_key: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable_text", skip_serializing_if = "Option::is_none")]
    pub evolution_instance: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday_message_enabled: Option<bool>,

    #[serde(default, deserialize_with = "nullable_text", skip_serializing_if = "Option::is_none")]
    pub birthday_message_template: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_message_enabled: Option<bool>,

    #[serde(default, deserialize_with = "nullable_text", skip_serializing_if = "Option::is_none")]
    pub reminder_message_template: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 31, message = "Dias de antecedência devem estar entre 0 e 31"))]
    pub reminder_days_before_due: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub modules: Vec<FeatureModule>,
}

impl UpdateSettingsRequest {
    /// Field checks the derive cannot express
    fn check(&self) -> ApiResult<()> {
        validate_request(self)?;

        if let Some(value) = self.membership_value {
            if value <= Decimal::ZERO {
                return Err(ApiError::BadRequest(
                    "Valor da mensalidade deve ser maior que zero".to_string(),
                ));
            }
            if !fits_money_column(value) {
                return Err(ApiError::BadRequest(
                    "Valor da mensalidade deve ter até duas casas decimais e no máximo 99.999.999,99"
                        .to_string(),
                ));
            }
        }

        if let Some(Some(url)) = &self.evolution_api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ApiError::BadRequest(
                    "URL da Evolution API deve começar com http:// ou https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Drops a key that is just the masked value the client was shown
    fn without_echoed_key(mut self) -> Self {
        if matches!(&self.evolution_api_key, Some(Some(key)) if is_masked(key)) {
            self.evolution_api_key = None;
        }
        self
    }

    /// Audit payload with the key masked
    fn audit_changes(&self) -> serde_json::Value {
        let mut changes = serde_json::to_value(self).unwrap_or_default();
        if let Some(Some(key)) = &self.evolution_api_key {
            changes["evolution_api_key"] = serde_json::Value::String(mask_secret(key));
        }
        changes
    }

    fn into_update(self) -> UpdateSettings {
        UpdateSettings {
            membership_value: self.membership_value,
            payment_due_day_of_month: self.payment_due_day_of_month,
            evolution_api_url: self.evolution_api_url,
            evolution_api_key: self.evolution_api_key,
            evolution_instance: self.evolution_instance,
            birthday_message_enabled: self.birthday_message_enabled,
            birthday_message_template: self.birthday_message_template,
            reminder_message_enabled: self.reminder_message_enabled,
            reminder_message_template: self.reminder_message_template,
            reminder_days_before_due: self.reminder_days_before_due,
        }
    }
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<SystemSettings>> {
    let settings = SystemSettings::get_or_create(&state.db).await?;

    if auth.is_admin() {
        Ok(Json(settings))
    } else {
        Ok(Json(settings.masked()))
    }
}

/// Updates the settings
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an administrator
/// - `400 Bad Request`: Value not positive, due day outside 1..=31 or
///   reminder days outside 0..=31
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateSettingsRequest>,
) -> ApiResult<Json<SystemSettings>> {
    require_admin(&auth).map_err(|_| {
        ApiError::Forbidden("Apenas administradores podem alterar configurações".to_string())
    })?;

    req.check()?;
    let req = req.without_echoed_key();
    let changes = req.audit_changes();

    let mut tx = state.db.begin().await?;

    let settings = SystemSettings::upsert(&mut *tx, req.into_update()).await?;

    AuditLog::record(
        &mut *tx,
        NewAuditEntry {
            action: AuditAction::Update,
            entity_type: AuditEntity::SystemSettings,
            entity_id: Some(SETTINGS_ID.to_string()),
            changes,
            user_id: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, "System settings updated");

    Ok(Json(settings))
}

pub async fn list_features(State(state): State<AppState>) -> ApiResult<Json<FeaturesResponse>> {
    let settings = SystemSettings::get_or_create(&state.db).await?;

    Ok(Json(FeaturesResponse {
        modules: feature_catalog(&settings),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> UpdateSettingsRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_range_checks() {
        assert!(parse(r#"{"payment_due_day_of_month": 10}"#).check().is_ok());
        assert!(parse(r#"{"payment_due_day_of_month": 0}"#).check().is_err());
        assert!(parse(r#"{"payment_due_day_of_month": 40}"#).check().is_err());
        assert!(parse(r#"{"reminder_days_before_due": 0}"#).check().is_ok());
        assert!(parse(r#"{"reminder_days_before_due": 32}"#).check().is_err());
        assert!(parse(r#"{"membership_value": "0"}"#).check().is_err());
        assert!(parse(r#"{"membership_value": 79.9}"#).check().is_ok());
        assert!(parse(r#"{"membership_value": "100000000000"}"#).check().is_err());
        assert!(parse(r#"{"membership_value": "79.999"}"#).check().is_err());
    }

    #[test]
    fn test_url_scheme_required() {
        assert!(parse(r#"{"evolution_api_url": "evo.clube.com.br"}"#).check().is_err());
        assert!(parse(r#"{"evolution_api_url": "https://evo.clube.com.br"}"#)
            .check()
            .is_ok());
        assert!(parse(r#"{"evolution_api_url": ""}"#).check().is_ok());
    }

    #[test]
    fn test_echoed_mask_is_ignored() {
        let req = parse(r#"{"evolution_api_key": "********4FD5"}"#).without_echoed_key();
        assert_eq!(req.evolution_api_key, None);

        let req = parse(r#"{"evolution_api_key": "NEWKEY1234567"}"#).without_echoed_key();
        assert_eq!(req.evolution_api_key, Some(Some("NEWKEY1234567".to_string())));
    }

    #[test]
    fn test_audit_changes_mask_key() {
        let req = parse(r#"{"evolution_api_key": "B6D711FCDE4D4FD5", "reminder_message_enabled": false}"#);
        let changes = req.audit_changes();

        assert_eq!(changes["evolution_api_key"], "********4FD5");
        assert_eq!(changes["reminder_message_enabled"], false);
        assert!(changes.get("membership_value").is_none());
    }
}
