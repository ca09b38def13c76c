/// Dashboard statistics and activity formatting
///
/// Everything here is pure: the API handler runs the aggregate queries,
/// fills [`DashboardInputs`] and turns audit rows into [`ActivityItem`]s.
/// Keeping the arithmetic out of the handler lets it be tested without a
/// database.
///
/// Percent changes are strings with one decimal (`"12.5"`), or `"0"` when
/// the baseline is zero. Labels add a sign and a percent sign (`"+12.5%"`).
///
/// # Example
///
/// ```
/// use socios_shared::dashboard::{percent_change, change_label, time_ago};
/// use chrono::{Duration, Utc};
///
/// assert_eq!(percent_change(110.0, 100.0), "10.0");
/// assert_eq!(percent_change(5.0, 0.0), "0");
/// assert_eq!(change_label("10.0"), "+10.0%");
///
/// let now = Utc::now();
/// assert_eq!(time_ago(now, now - Duration::hours(3)), "Há 3 horas");
/// ```

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::audit_log::AuditActivity;

/// Most activities returned by the dashboard
pub const MAX_RECENT_ACTIVITIES: i64 = 50;

/// Default activity window in days
pub const DEFAULT_ACTIVITY_DAYS: i64 = 30;

/// Direction shown next to a statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// Up when the percent change is zero or positive
    pub fn from_percent(change: &str) -> Self {
        match change.parse::<f64>() {
            Ok(value) if value < 0.0 => Trend::Down,
            _ => Trend::Up,
        }
    }
}

/// Statistic with a percent change label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat<V> {
    pub value: V,

    /// Signed label such as `+12.5%`
    pub change: String,

    pub trend: Trend,
}

impl<V> Stat<V> {
    pub fn with_percent_change(value: V, change: &str) -> Self {
        Self {
            value,
            change: change_label(change),
            trend: Trend::from_percent(change),
        }
    }
}

/// Statistic whose change is an absolute count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountStat {
    pub value: i64,
    pub change: i64,
    pub trend: Trend,
}

/// The four headline numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub active_members: Stat<i64>,
    pub monthly_revenue: Stat<f64>,
    pub payment_rate: Stat<f64>,
    pub overdue_payments: CountStat,
}

/// Raw aggregates gathered by the handler
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    /// Active members now
    pub active_members: i64,

    /// Active members registered before the current month started
    pub baseline_members: i64,

    /// `PAID` total for the current reference period
    pub revenue_current: Decimal,

    /// `PAID` total for the previous reference period
    pub revenue_previous: Decimal,

    pub paid_current: i64,
    pub paid_previous: i64,

    /// Overdue as of today
    pub overdue_now: i64,

    /// Overdue using a cutoff seven days earlier
    pub overdue_week_ago: i64,
}

/// Display row for one audit entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    /// Portuguese description, e.g. `Novo sócio cadastrado`
    pub action: String,

    /// Who to show: the acting user, or the member for member sign-ups
    pub user: String,

    /// Relative time, e.g. `Há 2 horas`
    pub time: String,

    pub entity_type: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityItem {
    pub fn from_activity(activity: AuditActivity, now: DateTime<Utc>) -> Self {
        let is_member_signup = activity.action == "CREATE" && activity.entity_type == "Member";

        let user = match activity.member_name {
            Some(member_name) if is_member_signup => member_name,
            _ => activity.user_name,
        };

        Self {
            action: describe_activity(&activity.action, &activity.entity_type),
            user,
            time: time_ago(now, activity.created_at),
            entity_type: activity.entity_type,
            created_at: activity.created_at,
        }
    }
}

/// Percent change from `previous` to `current`, one decimal place
///
/// Returns `"0"` when `previous` is zero.
pub fn percent_change(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "0".to_string();
    }

    one_decimal((current - previous) / previous * 100.0)
}

// Formats with one decimal, folding "-0.0" into "0.0"
fn one_decimal(value: f64) -> String {
    let formatted = format!("{:.1}", value);
    if formatted == "-0.0" {
        "0.0".to_string()
    } else {
        formatted
    }
}

/// Adds the sign and percent suffix: `"12.5"` becomes `"+12.5%"`
pub fn change_label(change: &str) -> String {
    match Trend::from_percent(change) {
        Trend::Up => format!("+{change}%"),
        Trend::Down => format!("{change}%"),
    }
}

/// Reference period before `(month, year)`
pub fn previous_period(month: u32, year: i32) -> (u32, i32) {
    if month <= 1 {
        (12, year - 1)
    } else {
        (month - 1, year)
    }
}

/// Midnight UTC on the first day of `now`'s month
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(now)
}

fn plural(count: i64, singular: &str) -> String {
    if count > 1 {
        format!("Há {count} {singular}s")
    } else {
        format!("Há {count} {singular}")
    }
}

/// Relative time in Portuguese
///
/// Days win over hours, hours over minutes; under a minute (or in the
/// future) is `Agora mesmo`.
pub fn time_ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);

    let days = elapsed.num_days();
    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes();

    if days > 0 {
        plural(days, "dia")
    } else if hours > 0 {
        plural(hours, "hora")
    } else if minutes > 0 {
        plural(minutes, "minuto")
    } else {
        "Agora mesmo".to_string()
    }
}

fn action_label(action: &str) -> &str {
    match action {
        "CREATE" => "Criado",
        "UPDATE" => "Atualizado",
        "DELETE" => "Excluído",
        "CANCEL" => "Cancelado",
        other => other,
    }
}

fn entity_label(entity_type: &str) -> &str {
    match entity_type {
        "Member" => "Sócio",
        "Payment" => "Pagamento",
        "User" => "Usuário",
        "SystemSettings" => "Configurações",
        other => other,
    }
}

/// Portuguese description of an audit entry
///
/// Known pairs have fixed phrases; anything else falls back to
/// `"<entity> <action>"`, e.g. `Pagamento cancelado`.
pub fn describe_activity(action: &str, entity_type: &str) -> String {
    let fixed = match (action, entity_type) {
        ("CREATE", "Member") => Some("Novo sócio cadastrado"),
        ("CREATE", "Payment") => Some("Novo pagamento registrado"),
        ("CREATE", "User") => Some("Novo usuário criado"),
        ("UPDATE", "Member") => Some("Sócio atualizado"),
        ("UPDATE", "Payment") => Some("Pagamento atualizado"),
        ("UPDATE", "User") => Some("Usuário atualizado"),
        ("UPDATE", "SystemSettings") => Some("Configurações atualizadas"),
        ("DELETE", "Member") => Some("Sócio removido"),
        ("DELETE", "Payment") => Some("Pagamento excluído"),
        ("DELETE", "User") => Some("Usuário removido"),
        ("UPDATE_PASSWORD", "User") => Some("Senha alterada"),
        _ => None,
    };

    match fixed {
        Some(description) => description.to_string(),
        None => format!(
            "{} {}",
            entity_label(entity_type),
            action_label(action).to_lowercase()
        ),
    }
}

/// Payment rate as a percentage of active members, one decimal
fn payment_rate(paid: i64, members: i64) -> String {
    if members == 0 {
        return "0".to_string();
    }

    one_decimal(paid as f64 / members as f64 * 100.0)
}

/// Builds the headline statistics from raw aggregates
pub fn build_stats(inputs: &DashboardInputs) -> DashboardStats {
    let members_change = percent_change(
        inputs.active_members as f64,
        inputs.baseline_members as f64,
    );

    let revenue_current = inputs.revenue_current.to_f64().unwrap_or(0.0);
    let revenue_previous = inputs.revenue_previous.to_f64().unwrap_or(0.0);
    let revenue_change = percent_change(revenue_current, revenue_previous);

    let rate = payment_rate(inputs.paid_current, inputs.active_members)
        .parse::<f64>()
        .unwrap_or(0.0);
    let previous_rate = if inputs.baseline_members == 0 {
        0.0
    } else {
        inputs.paid_previous as f64 / inputs.baseline_members as f64 * 100.0
    };
    let rate_change = percent_change(rate, previous_rate);

    let overdue_change = inputs.overdue_now - inputs.overdue_week_ago;

    DashboardStats {
        active_members: Stat::with_percent_change(inputs.active_members, &members_change),
        monthly_revenue: Stat::with_percent_change(revenue_current, &revenue_change),
        payment_rate: Stat::with_percent_change(rate, &rate_change),
        overdue_payments: CountStat {
            value: inputs.overdue_now,
            change: overdue_change,
            trend: if overdue_change <= 0 {
                Trend::Up
            } else {
                Trend::Down
            },
        },
    }
}
