/// Dashboard statistics
///
/// ```text
/// GET /v1/dashboard/stats?days=30
/// ```
///
/// ```json
/// {
///   "stats": {
///     "active_members": { "value": 120, "change": "+4.3%", "trend": "up" },
///     "monthly_revenue": { "value": 4500.0, "change": "-2.1%", "trend": "down" },
///     "payment_rate": { "value": 75.0, "change": "+0%", "trend": "up" },
///     "overdue_payments": { "value": 8, "change": -2, "trend": "up" }
///   },
///   "recent_activities": [
///     { "action": "Novo sócio cadastrado", "user": "Maria Souza", "time": "Há 2 horas", ... }
///   ],
///   "filter_days": 30
/// }
/// ```
///
/// The current month is taken in UTC. The aggregate queries are
/// independent and run concurrently on the pool.

use crate::{
    app::AppState,
    error::{ApiQuery, ApiResult},
};
use axum::{extract::State, Json};
use chrono::{Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use socios_shared::{
    dashboard::{
        build_stats, previous_period, start_of_month, ActivityItem, DashboardInputs,
        DashboardStats, DEFAULT_ACTIVITY_DAYS, MAX_RECENT_ACTIVITIES,
    },
    models::{audit_log::AuditLog, member::Member, payment::Payment},
};

/// Longest activity window accepted
pub const MAX_ACTIVITY_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub recent_activities: Vec<ActivityItem>,
    pub filter_days: i64,
}

fn activity_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_ACTIVITY_DAYS).clamp(1, MAX_ACTIVITY_DAYS)
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let days = activity_days(query.days);

    let now = Utc::now();
    let today = now.date_naive();
    let month = now.month();
    let year = now.year();
    let (previous_month, previous_year) = previous_period(month, year);

    let db = &state.db;
    let (
        active_members,
        baseline_members,
        revenue_current,
        revenue_previous,
        paid_current,
        paid_previous,
        overdue_now,
        overdue_week_ago,
        activities,
    ) = tokio::try_join!(
        Member::count_active(db),
        Member::count_active_created_before(db, start_of_month(now)),
        Payment::revenue_for_period(db, month as i32, year),
        Payment::revenue_for_period(db, previous_month as i32, previous_year),
        Payment::count_paid_for_period(db, month as i32, year),
        Payment::count_paid_for_period(db, previous_month as i32, previous_year),
        Payment::count_overdue(db, today),
        Payment::count_overdue(db, today - Duration::days(7)),
        AuditLog::recent_since(db, now - Duration::days(days), MAX_RECENT_ACTIVITIES),
    )?;

    let stats = build_stats(&DashboardInputs {
        active_members,
        baseline_members,
        revenue_current,
        revenue_previous,
        paid_current,
        paid_previous,
        overdue_now,
        overdue_week_ago,
    });

    tracing::debug!(
        days,
        active_members,
        overdue_now,
        activities = activities.len(),
        "Dashboard stats computed"
    );

    Ok(Json(DashboardResponse {
        stats,
        recent_activities: activities
            .into_iter()
            .map(|activity| ActivityItem::from_activity(activity, now))
            .collect(),
        filter_days: days,
    }))
}
