//! Report dashboard.
//!
//! Charts are plain HTML bars: each series is turned into rows carrying a
//! width percentage so the template needs no script.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use cms_core::filter::optional_choice;
use cms_core::records::Category;
use cms_core::report::{ReportData, ReportRange, bar_percent, format_etb};
use cms_core::{Capability, CategoryId};

use super::contraband::SelectOption;
use super::{Shell, non_empty};
use crate::error::AppError;
use crate::filters;
use crate::middleware::Officer;
use crate::state::AppState;

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub label: String,
    pub count: usize,
    pub value: String,
    pub color: &'static str,
    pub percent: usize,
}

/// One row of the top officers table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficerRow {
    pub rank: usize,
    pub name: String,
    pub badge: String,
    pub seizures: usize,
    pub value: String,
}

/// The report, shaped for the template.
#[derive(Debug, Clone, Default)]
pub struct ReportView {
    pub total_seizures: usize,
    pub total_value: String,
    pub active_users: usize,
    pub pending_approvals: usize,
    pub by_category: Vec<Bar>,
    pub by_month: Vec<Bar>,
    pub by_status: Vec<Bar>,
    pub top_officers: Vec<OfficerRow>,
}

/// Neutral bar color for series without a palette.
const MONTH_COLOR: &str = "#0088FE";

impl From<&ReportData> for ReportView {
    fn from(data: &ReportData) -> Self {
        let category_max = data.max_category_count();
        let month_max = data.max_month_count();
        let status_max = data.by_status.iter().map(|s| s.count).max().unwrap_or(0);

        Self {
            total_seizures: data.total_seizures,
            total_value: format_etb(data.total_value),
            active_users: data.active_users,
            pending_approvals: data.pending_approvals,
            by_category: data
                .by_category
                .iter()
                .map(|c| Bar {
                    label: c.name.clone(),
                    count: c.count,
                    value: format_etb(c.value),
                    color: c.color,
                    percent: bar_percent(c.count, category_max),
                })
                .collect(),
            by_month: data
                .by_month
                .iter()
                .map(|m| Bar {
                    label: m.label.clone(),
                    count: m.count,
                    value: format_etb(m.value),
                    color: MONTH_COLOR,
                    percent: bar_percent(m.count, month_max),
                })
                .collect(),
            by_status: data
                .by_status
                .iter()
                .map(|s| Bar {
                    label: s.label.clone(),
                    count: s.count,
                    value: String::new(),
                    color: s.color,
                    percent: bar_percent(s.count, status_max),
                })
                .collect(),
            top_officers: data
                .top_officers
                .iter()
                .enumerate()
                .map(|(i, o)| OfficerRow {
                    rank: i + 1,
                    name: o.name.clone(),
                    badge: o.badge.clone().unwrap_or_default(),
                    seizures: o.seizures,
                    value: format_etb(o.value),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    from: Option<String>,
    to: Option<String>,
    category: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    non_empty(raw).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn category_options(categories: &[Category], selected: Option<CategoryId>) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("all", "All Categories", selected.is_none()))
        .chain(categories.iter().map(|c| {
            SelectOption::new(c.id.to_string(), c.name.clone(), selected == Some(c.id))
        }))
        .collect()
}

/// Reports page template.
#[derive(Template, WebTemplate)]
#[template(path = "reports/index.html")]
pub struct ReportsTemplate {
    pub shell: Shell,
    pub report: ReportView,
    /// `YYYY-MM-DD` values for the date inputs.
    pub from: String,
    pub to: String,
    pub categories: Vec<SelectOption>,
    pub can_view_audit: bool,
}

/// Report dashboard.
///
/// GET /reports
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn index(
    officer: Officer,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<ReportsTemplate, AppError> {
    officer.require(Capability::ViewReports)?;
    let mut shell = Shell::new(&officer, "reports").await;
    let caller = officer.caller();
    let api = state.api();

    let (items, users, categories, approvals) = tokio::join!(
        api.items(&caller, None),
        api.users(&caller, false),
        api.categories(&caller),
        api.pending_approvals(&caller),
    );
    let items = shell.or_toast(items, "report data")?;
    let users = shell.or_toast(users, "users")?;
    let categories = shell.or_toast(categories, "categories")?;
    let approvals = shell.or_toast(approvals, "pending approvals")?;

    let range = ReportRange::from_dates(
        parse_date(query.from.as_deref()),
        parse_date(query.to.as_deref()),
        Utc::now(),
    );
    let category = optional_choice::<CategoryId>(query.category.as_deref());
    let data = ReportData::build(&items, &users, &approvals, &range, category);
    tracing::debug!(
        seizures = data.total_seizures,
        start = %range.start,
        end = %range.end,
        "Report built"
    );

    Ok(ReportsTemplate {
        report: ReportView::from(&data),
        from: range.start.format("%Y-%m-%d").to_string(),
        to: range.end.format("%Y-%m-%d").to_string(),
        categories: category_options(&categories, category),
        can_view_audit: officer.can(Capability::ViewAudit),
        shell,
    })
}
