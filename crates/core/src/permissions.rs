//! Role-based gates and the per-role navigation menu.
//!
//! Both the API (to reject requests) and the console (to hide links and
//! render the restricted page) consult these tables.

use crate::types::Role;

/// An operation that only some roles may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create accounts, change roles, activate/deactivate.
    ManageUsers,
    /// Open the report dashboard.
    ViewReports,
    /// Read the audit trail.
    ViewAudit,
    /// Register new seizures.
    RegisterSeizure,
    /// Change an item's status.
    ChangeStatus,
    /// Record a custody transfer.
    TransferCustody,
}

impl Capability {
    /// Short description used in "access restricted" responses.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage users",
            Self::ViewReports => "view reports",
            Self::ViewAudit => "view the audit trail",
            Self::RegisterSeizure => "register seizures",
            Self::ChangeStatus => "change item status",
            Self::TransferCustody => "transfer custody",
        }
    }
}

impl Role {
    /// Whether this role holds `capability`.
    #[must_use]
    pub const fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::ManageUsers => matches!(self, Self::Admin),
            Capability::ViewReports => matches!(self, Self::Admin | Self::Supervisor | Self::Auditor),
            Capability::ViewAudit => matches!(self, Self::Admin | Self::Auditor),
            Capability::RegisterSeizure => {
                matches!(self, Self::Admin | Self::Supervisor | Self::FieldOfficer)
            }
            Capability::ChangeStatus | Capability::TransferCustody => {
                !matches!(self, Self::Auditor)
            }
        }
    }
}

/// One entry of the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    /// Stable key, compared against the active page.
    pub id: &'static str,
    pub label: &'static str,
    pub href: &'static str,
}

const fn item(id: &'static str, label: &'static str, href: &'static str) -> MenuItem {
    MenuItem { id, label, href }
}

const ADMIN_MENU: &[MenuItem] = &[
    item("dashboard", "Dashboard", "/"),
    item("messages", "Messages", "/messages"),
    item("users", "User Management", "/users"),
    item("contraband", "Contraband Records", "/contraband"),
    item("register", "Register Seizure", "/seizures/new"),
    item("reports", "Reports & Audit", "/reports"),
];

const SUPERVISOR_MENU: &[MenuItem] = &[
    item("dashboard", "Dashboard", "/"),
    item("messages", "Messages", "/messages"),
    item("contraband", "Contraband Records", "/contraband"),
    item("register", "Register Seizure", "/seizures/new"),
    item("reports", "Reports", "/reports"),
];

const FIELD_OFFICER_MENU: &[MenuItem] = &[
    item("dashboard", "Dashboard", "/"),
    item("messages", "Messages", "/messages"),
    item("register", "Register Seizure", "/seizures/new"),
    item("contraband", "My Seizures", "/contraband?mine=true"),
];

const WAREHOUSE_MENU: &[MenuItem] = &[
    item("dashboard", "Dashboard", "/"),
    item("messages", "Messages", "/messages"),
    item("contraband", "Stored Items", "/contraband"),
];

const AUDITOR_MENU: &[MenuItem] = &[
    item("dashboard", "Dashboard", "/"),
    item("messages", "Messages", "/messages"),
    item("audit", "Audit Logs", "/audit"),
    item("contraband", "Evidence Records", "/contraband"),
    item("reports", "Compliance Reports", "/reports"),
];

/// Sidebar entries for `role`.
#[must_use]
pub const fn menu_for(role: Role) -> &'static [MenuItem] {
    match role {
        Role::Admin => ADMIN_MENU,
        Role::Supervisor => SUPERVISOR_MENU,
        Role::FieldOfficer => FIELD_OFFICER_MENU,
        Role::WarehouseManager => WAREHOUSE_MENU,
        Role::Auditor => AUDITOR_MENU,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_manages_users() {
        for role in Role::ALL {
            assert_eq!(role.can(Capability::ManageUsers), role == Role::Admin);
        }
    }

    #[test]
    fn test_report_and_audit_gates() {
        assert!(Role::Supervisor.can(Capability::ViewReports));
        assert!(!Role::Supervisor.can(Capability::ViewAudit));
        assert!(Role::Auditor.can(Capability::ViewAudit));
        assert!(Role::Auditor.can(Capability::ViewReports));
        assert!(!Role::FieldOfficer.can(Capability::ViewReports));
        assert!(!Role::WarehouseManager.can(Capability::ViewAudit));
    }

    #[test]
    fn test_auditor_is_read_only() {
        assert!(!Role::Auditor.can(Capability::RegisterSeizure));
        assert!(!Role::Auditor.can(Capability::ChangeStatus));
        assert!(!Role::Auditor.can(Capability::TransferCustody));
        assert!(Role::WarehouseManager.can(Capability::TransferCustody));
        assert!(!Role::WarehouseManager.can(Capability::RegisterSeizure));
    }

    #[test]
    fn test_menu_links_respect_gates() {
        for role in Role::ALL {
            for entry in menu_for(role) {
                match entry.id {
                    "users" => assert!(role.can(Capability::ManageUsers)),
                    "reports" => assert!(role.can(Capability::ViewReports)),
                    "audit" => assert!(role.can(Capability::ViewAudit)),
                    "register" => assert!(role.can(Capability::RegisterSeizure)),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_every_menu_starts_with_dashboard_and_messages() {
        for role in Role::ALL {
            let ids: Vec<_> = menu_for(role).iter().map(|m| m.id).collect();
            assert_eq!(ids.first(), Some(&"dashboard"));
            assert!(ids.contains(&"messages"));
        }
    }
}
