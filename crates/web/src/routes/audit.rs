//! Audit trail viewer and CSV export.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use cms_core::Capability;
use cms_core::filter::{AuditFilter, SearchTerm, distinct_actions, distinct_tables};
use cms_core::format::humanize;
use cms_core::records::AuditLog;

use super::contraband::SelectOption;
use super::{Shell, non_empty};
use crate::client::AUDIT_LOG_LIMIT;
use crate::error::AppError;
use crate::export::{audit_csv, audit_file_name};
use crate::filters;
use crate::middleware::Officer;
use crate::state::AppState;

/// Badge class for an action: creations green, deletions red, transfers
/// purple, everything else blue.
fn action_class(action: &str) -> &'static str {
    let action = action.to_ascii_uppercase();
    if action.starts_with("CREATE") || action.starts_with("INSERT") {
        "badge-green"
    } else if action.starts_with("DELETE") {
        "badge-red"
    } else if action.contains("TRANSFER") {
        "badge-purple"
    } else {
        "badge-blue"
    }
}

/// Timestamp with seconds, as shown in the trail.
fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M:%S").to_string()
}

/// Whether a fetch filled the API's row cap, so older entries were left out.
const fn is_truncated(fetched: usize) -> bool {
    fetched >= AUDIT_LOG_LIMIT
}

fn pretty_json(value: Option<&serde_json::Value>) -> Option<String> {
    value.and_then(|v| serde_json::to_string_pretty(v).ok())
}

/// One row of the audit table.
#[derive(Debug, Clone)]
pub struct AuditRow {
    pub when: String,
    pub actor: String,
    pub badge: String,
    pub action: String,
    pub action_class: &'static str,
    pub table: String,
    pub record_id: String,
    pub ip_address: String,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
}

impl From<&AuditLog> for AuditRow {
    fn from(log: &AuditLog) -> Self {
        Self {
            when: timestamp(log.created_at),
            actor: log.actor_name().to_owned(),
            badge: log
                .user
                .as_ref()
                .and_then(|u| u.badge_number.clone())
                .unwrap_or_default(),
            action: humanize(&log.action),
            action_class: action_class(&log.action),
            table: log.table_name.clone(),
            record_id: log.record_id.clone().unwrap_or_default(),
            ip_address: log.ip_address.clone().unwrap_or_default(),
            old_values: pretty_json(log.old_values.as_ref()),
            new_values: pretty_json(log.new_values.as_ref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    q: Option<String>,
    action: Option<String>,
    table: Option<String>,
}

impl AuditQuery {
    fn filter(&self) -> AuditFilter {
        let choice = |raw: Option<&str>| {
            non_empty(raw)
                .filter(|v| !v.eq_ignore_ascii_case("all"))
                .map(str::to_owned)
        };
        AuditFilter {
            search: SearchTerm::new(self.q.as_deref().unwrap_or_default()),
            action: choice(self.action.as_deref()),
            table: choice(self.table.as_deref()),
        }
    }

    /// The same filter as a query string, for the export link.
    fn export_href(&self) -> String {
        let pairs = [
            ("q", self.q.as_deref()),
            ("action", self.action.as_deref()),
            ("table", self.table.as_deref()),
        ];
        let query = pairs
            .into_iter()
            .filter_map(|(key, value)| non_empty(value).map(|v| (key, v)))
            .fold(url::form_urlencoded::Serializer::new(String::new()), |mut s, (k, v)| {
                s.append_pair(k, v);
                s
            })
            .finish();
        if query.is_empty() {
            "/audit/export.csv".to_string()
        } else {
            format!("/audit/export.csv?{query}")
        }
    }
}

fn choice_options(values: Vec<String>, selected: Option<&str>, all_label: &str) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("all", all_label, selected.is_none()))
        .chain(values.into_iter().map(|v| {
            let label = humanize(&v);
            let is_selected = selected == Some(v.as_str());
            SelectOption::new(v, label, is_selected)
        }))
        .collect()
}

/// Audit trail template.
#[derive(Template, WebTemplate)]
#[template(path = "audit/index.html")]
pub struct AuditTemplate {
    pub shell: Shell,
    pub rows: Vec<AuditRow>,
    pub total: usize,
    pub truncated: bool,
    pub search: String,
    pub actions: Vec<SelectOption>,
    pub tables: Vec<SelectOption>,
    pub filtered: bool,
    pub export_href: String,
}

/// Audit trail with search and filters.
///
/// GET /audit
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn index(
    officer: Officer,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<AuditTemplate, AppError> {
    officer.require(Capability::ViewAudit)?;
    let mut shell = Shell::new(&officer, "audit").await;
    let logs = shell.or_toast(state.api().audit_logs(&officer.caller()).await, "audit logs")?;

    let filter = query.filter();
    let rows = filter.apply(&logs).into_iter().map(AuditRow::from).collect();

    Ok(AuditTemplate {
        shell,
        rows,
        total: logs.len(),
        truncated: is_truncated(logs.len()),
        search: query.q.clone().unwrap_or_default(),
        actions: choice_options(distinct_actions(&logs), filter.action.as_deref(), "All Actions"),
        tables: choice_options(distinct_tables(&logs), filter.table.as_deref(), "All Tables"),
        filtered: !filter.search.is_empty() || filter.action.is_some() || filter.table.is_some(),
        export_href: query.export_href(),
    })
}

/// Download the filtered trail as CSV.
///
/// GET /audit/export.csv
#[instrument(skip(officer, state), fields(user_id = %officer.id()))]
pub async fn export(
    officer: Officer,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    officer.require(Capability::ViewAudit)?;
    let logs = state.api().audit_logs(&officer.caller()).await?;
    if is_truncated(logs.len()) {
        tracing::warn!(
            limit = AUDIT_LOG_LIMIT,
            "Audit export holds only the newest entries"
        );
    }
    let selected = query.filter().apply(&logs);
    tracing::info!(rows = selected.len(), "Audit trail exported");

    let disposition = format!("attachment; filename=\"{}\"", audit_file_name(Utc::now()));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audit_csv(selected),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cms_core::Role;

    use super::*;
    use crate::test_support as fixtures;

    #[test]
    fn test_action_class() {
        assert_eq!(action_class("CREATE_SEIZURE"), "badge-green");
        assert_eq!(action_class("DELETE_FILE"), "badge-red");
        assert_eq!(action_class("CUSTODY_TRANSFER"), "badge-purple");
        assert_eq!(action_class("UPDATE_STATUS"), "badge-blue");
    }

    #[test]
    fn test_truncation_at_the_row_cap() {
        assert!(!is_truncated(0));
        assert!(!is_truncated(AUDIT_LOG_LIMIT - 1));
        assert!(is_truncated(AUDIT_LOG_LIMIT));
    }

    #[test]
    fn test_row_labels() {
        let actor = fixtures::officer("Selam Tesfaye", Role::Admin);
        let mut log = fixtures::audit(Some(&actor), "CREATE_SEIZURE", "SZ-7");
        log.new_values = Some(serde_json::json!({"status": "seized"}));

        let row = AuditRow::from(&log);
        assert_eq!(row.action, "Create Seizure");
        assert_eq!(row.actor, "Selam Tesfaye");
        assert_eq!(row.when, "May 2, 2024 14:30:00");
        assert!(row.old_values.is_none());
        assert!(row.new_values.unwrap().contains("\"status\": \"seized\""));

        let system = AuditRow::from(&fixtures::audit(None, "UPDATE_STATUS", "SZ-7"));
        assert_eq!(system.actor, "System");
    }

    #[test]
    fn test_query_filter_ignores_all() {
        let query = AuditQuery {
            q: Some("  ".into()),
            action: Some("all".into()),
            table: Some("users".into()),
        };
        let filter = query.filter();
        assert!(filter.search.is_empty());
        assert_eq!(filter.action, None);
        assert_eq!(filter.table.as_deref(), Some("users"));
    }

    #[test]
    fn test_export_href_keeps_filters() {
        assert_eq!(AuditQuery::default().export_href(), "/audit/export.csv");
        let query = AuditQuery {
            q: Some("Abebe K".into()),
            action: Some("CREATE_SEIZURE".into()),
            table: None,
        };
        assert_eq!(
            query.export_href(),
            "/audit/export.csv?q=Abebe+K&action=CREATE_SEIZURE"
        );
    }

    #[test]
    fn test_choice_options() {
        let options = choice_options(
            vec!["CREATE_SEIZURE".into(), "UPDATE_STATUS".into()],
            Some("UPDATE_STATUS"),
            "All Actions",
        );
        assert_eq!(options[0].label, "All Actions");
        assert_eq!(options[2].label, "Update Status");
        assert!(options[2].selected);
    }
}
