//! CSV export of the audit trail.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use cms_core::records::AuditLog;

/// Header row of the export.
pub const AUDIT_CSV_HEADER: &str = "Timestamp,User,Action,Table,Record ID,IP Address";

/// Download name for an export made at `now`: `audit_logs_2024-05-02.csv`.
#[must_use]
pub fn audit_file_name(now: DateTime<Utc>) -> String {
    format!("audit_logs_{}.csv", now.format("%Y-%m-%d"))
}

/// Quote a field when it contains a delimiter, quote or line break;
/// embedded quotes are doubled.
#[must_use]
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// Render audit rows as CSV, one line per row after the header. Lines end
/// in CRLF.
#[must_use]
pub fn audit_csv<'a>(logs: impl IntoIterator<Item = &'a AuditLog>) -> String {
    let mut csv = format!("{AUDIT_CSV_HEADER}\r\n");
    for log in logs {
        let user = log.user.as_ref().map_or("Unknown", |u| u.full_name.as_str());
        let fields = [
            log.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            csv_field(user),
            csv_field(&log.action),
            csv_field(&log.table_name),
            csv_field(log.record_id.as_deref().unwrap_or_default()),
            csv_field(log.ip_address.as_deref().unwrap_or_default()),
        ];
        let _ = write!(csv, "{}\r\n", fields.join(","));
    }
    csv
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use cms_core::Role;

    use super::*;
    use crate::test_support as fixtures;

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("Kebede, Abebe"), "\"Kebede, Abebe\"");
        assert_eq!(csv_field("the \"big\" one"), "\"the \"\"big\"\" one\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn test_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 23, 59, 0).unwrap();
        assert_eq!(audit_file_name(now), "audit_logs_2024-05-02.csv");
    }

    #[test]
    fn test_audit_csv() {
        let mut actor = fixtures::officer("Abebe Kebede", Role::Admin);
        actor.full_name = "Kebede, Abebe".into();
        let logs = vec![
            fixtures::audit(Some(&actor), "CREATE_SEIZURE", "SZ-1"),
            fixtures::audit(None, "UPDATE_STATUS", "SZ-2"),
        ];

        let csv = audit_csv(&logs);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], AUDIT_CSV_HEADER);
        assert_eq!(
            lines[1],
            "2024-05-02T14:30:00Z,\"Kebede, Abebe\",CREATE_SEIZURE,contraband_items,SZ-1,10.0.0.7"
        );
        assert_eq!(
            lines[2],
            "2024-05-02T14:30:00Z,Unknown,UPDATE_STATUS,contraband_items,SZ-2,10.0.0.7"
        );
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(audit_csv(&[]), format!("{AUDIT_CSV_HEADER}\r\n"));
    }
}
