/// Feature modules shown on the settings panel
///
/// The catalog is fixed; only each module's status and detail values
/// depend on the stored [`SystemSettings`].
///
/// | Key | Active when |
/// |-----|-------------|
/// | `financial` | always |
/// | `whatsapp` | Evolution API URL, key and instance are all set |
/// | `birthday_messages` | enabled and WhatsApp configured |
/// | `payment_reminders` | enabled and WhatsApp configured |

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::settings::SystemSettings;

/// Module availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    Active,
    NotConfigured,
    Disabled,
}

impl FeatureStatus {
    /// Portuguese badge text
    pub fn label(&self) -> &'static str {
        match self {
            FeatureStatus::Active => "Ativo",
            FeatureStatus::NotConfigured => "Não Configurado",
            FeatureStatus::Disabled => "Desabilitado",
        }
    }
}

/// One labelled value inside a module card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDetail {
    pub label: &'static str,
    pub value: String,
}

/// Settings panel card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureModule {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub status: FeatureStatus,
    pub status_label: &'static str,
    pub details: Vec<FeatureDetail>,
}

impl FeatureModule {
    fn new(
        key: &'static str,
        title: &'static str,
        description: &'static str,
        status: FeatureStatus,
        details: Vec<FeatureDetail>,
    ) -> Self {
        Self {
            key,
            title,
            description,
            status,
            status_label: status.label(),
            details,
        }
    }
}

/// Formats an amount as Brazilian reais, e.g. `R$ 1.250,00`
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    format!("{sign}R$ {grouped},{fraction}")
}

fn messaging_dependent(enabled: bool, messaging_ready: bool) -> FeatureStatus {
    match (enabled, messaging_ready) {
        (false, _) => FeatureStatus::Disabled,
        (true, false) => FeatureStatus::NotConfigured,
        (true, true) => FeatureStatus::Active,
    }
}

fn enabled_label(enabled: bool) -> String {
    let label = if enabled { "Sim" } else { "Não" };
    label.to_string()
}

/// Builds the catalog for the current settings
pub fn feature_catalog(settings: &SystemSettings) -> Vec<FeatureModule> {
    let messaging_ready = settings.messaging_configured();

    vec![
        FeatureModule::new(
            "financial",
            "Configurações Financeiras",
            "Valores e datas de pagamento",
            FeatureStatus::Active,
            vec![
                FeatureDetail {
                    label: "Valor da Mensalidade",
                    value: format_brl(settings.membership_value),
                },
                FeatureDetail {
                    label: "Dia de Vencimento",
                    value: format!("Dia {}", settings.payment_due_day_of_month),
                },
            ],
        ),
        FeatureModule::new(
            "whatsapp",
            "WhatsApp (Evolution API)",
            "Integração para enviar lembretes de pagamento e mensagens de aniversário",
            if messaging_ready {
                FeatureStatus::Active
            } else {
                FeatureStatus::NotConfigured
            },
            vec![FeatureDetail {
                label: "Instância",
                value: settings
                    .evolution_instance
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
            }],
        ),
        FeatureModule::new(
            "birthday_messages",
            "Mensagens de Aniversário",
            "Mensagens automáticas de aniversário para os sócios via WhatsApp",
            messaging_dependent(settings.birthday_message_enabled, messaging_ready),
            vec![FeatureDetail {
                label: "Habilitado",
                value: enabled_label(settings.birthday_message_enabled),
            }],
        ),
        FeatureModule::new(
            "payment_reminders",
            "Lembretes de Pagamento",
            "Aviso via WhatsApp antes do vencimento da mensalidade",
            messaging_dependent(settings.reminder_message_enabled, messaging_ready),
            vec![
                FeatureDetail {
                    label: "Habilitado",
                    value: enabled_label(settings.reminder_message_enabled),
                },
                FeatureDetail {
                    label: "Antecedência",
                    value: format!("{} dias antes do vencimento", settings.reminder_days_before_due),
                },
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::SETTINGS_ID;
    use chrono::Utc;

    fn settings() -> SystemSettings {
        SystemSettings {
            id: SETTINGS_ID.to_string(),
            membership_value: Decimal::new(5000, 2),
            payment_due_day_of_month: 10,
            evolution_api_url: None,
            evolution_api_key: None,
            evolution_instance: None,
            birthday_message_enabled: true,
            birthday_message_template: None,
            reminder_message_enabled: false,
            reminder_message_template: None,
            reminder_days_before_due: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn status_of(catalog: &[FeatureModule], key: &str) -> FeatureStatus {
        catalog
            .iter()
            .find(|module| module.key == key)
            .map(|module| module.status)
            .unwrap()
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(Decimal::new(5000, 2)), "R$ 50,00");
        assert_eq!(format_brl(Decimal::new(125000, 2)), "R$ 1.250,00");
        assert_eq!(format_brl(Decimal::new(123456789, 2)), "R$ 1.234.567,89");
        assert_eq!(format_brl(Decimal::new(5, 1)), "R$ 0,50");
        assert_eq!(format_brl(Decimal::new(-1999, 2)), "-R$ 19,99");
    }

    #[test]
    fn test_catalog_without_messaging() {
        let catalog = feature_catalog(&settings());

        assert_eq!(catalog.len(), 4);
        assert_eq!(status_of(&catalog, "financial"), FeatureStatus::Active);
        assert_eq!(status_of(&catalog, "whatsapp"), FeatureStatus::NotConfigured);
        assert_eq!(status_of(&catalog, "birthday_messages"), FeatureStatus::NotConfigured);
        assert_eq!(status_of(&catalog, "payment_reminders"), FeatureStatus::Disabled);

        assert_eq!(catalog[0].details[0].value, "R$ 50,00");
        assert_eq!(catalog[0].details[1].value, "Dia 10");
    }

    #[test]
    fn test_catalog_with_messaging() {
        let configured = SystemSettings {
            evolution_api_url: Some("https://evo.clube.com.br".to_string()),
            evolution_api_key: Some("chave".to_string()),
            evolution_instance: Some("clube".to_string()),
            ..settings()
        };
        let catalog = feature_catalog(&configured);

        assert_eq!(status_of(&catalog, "whatsapp"), FeatureStatus::Active);
        assert_eq!(status_of(&catalog, "birthday_messages"), FeatureStatus::Active);
        assert_eq!(status_of(&catalog, "payment_reminders"), FeatureStatus::Disabled);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(FeatureStatus::NotConfigured).unwrap();
        assert_eq!(json, "not_configured");
        assert_eq!(FeatureStatus::NotConfigured.label(), "Não Configurado");
    }
}
