//! Table-style query builder translated into REST calls.
//!
//! Pages describe what they need as `from(table).select().eq(column, value)`
//! and [`Query::resolve`] maps that onto one API endpoint. Only the
//! combinations the API serves are accepted; anything else is reported as
//! [`QueryError::Unsupported`] rather than guessed at.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Tables the console reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ContrabandItems,
    ContrabandCategories,
    CustodyChain,
    Messages,
    Users,
    AuditLogs,
    EvidenceFiles,
}

impl Table {
    pub const ALL: [Self; 7] = [
        Self::ContrabandItems,
        Self::ContrabandCategories,
        Self::CustodyChain,
        Self::Messages,
        Self::Users,
        Self::AuditLogs,
        Self::EvidenceFiles,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContrabandItems => "contraband_items",
            Self::ContrabandCategories => "contraband_categories",
            Self::CustodyChain => "custody_chain",
            Self::Messages => "messages",
            Self::Users => "users",
            Self::AuditLogs => "audit_logs",
            Self::EvidenceFiles => "evidence_files",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| QueryError::UnknownTable(s.to_string()))
    }
}

/// Why a query cannot be sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("{operation} on {table} is not supported by the API")]
    Unsupported {
        table: Table,
        operation: &'static str,
    },
    #[error("{operation} on {table} needs eq({column}, ...)")]
    MissingFilter {
        table: Table,
        operation: &'static str,
        column: &'static str,
    },
    #[error("'{0}' is not a valid id")]
    InvalidId(String),
}

/// What the query does.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select,
    Insert(Value),
    Update(Value),
}

impl Operation {
    const fn name(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
        }
    }
}

/// Start a query on `table`.
#[must_use]
pub const fn from(table: Table) -> TableQuery {
    TableQuery { table }
}

/// A table picked, operation not yet chosen.
#[derive(Debug, Clone, Copy)]
pub struct TableQuery {
    table: Table,
}

impl TableQuery {
    #[must_use]
    pub const fn select(self) -> Query {
        Query::new(self.table, Operation::Select)
    }

    #[must_use]
    pub const fn insert(self, row: Value) -> Query {
        Query::new(self.table, Operation::Insert(row))
    }

    #[must_use]
    pub const fn update(self, changes: Value) -> Query {
        Query::new(self.table, Operation::Update(changes))
    }
}

/// A complete query with its equality filters and an optional row limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: Table,
    operation: Operation,
    filters: Vec<(String, String)>,
    limit: Option<usize>,
}

/// One HTTP request against the API.
#[derive(Debug, Clone, PartialEq)]
pub struct RestCall {
    pub method: Method,
    /// Path and query string, relative to the API base URL.
    pub path: String,
    pub body: Option<Value>,
}

impl RestCall {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    fn with_body(method: Method, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Outcome of resolving a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Call(RestCall),
    /// The API records these rows itself; nothing to send.
    NoOp,
}

impl Query {
    const fn new(table: Table, operation: Operation) -> Self {
        Self {
            table,
            operation,
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Cap the number of rows returned. Only the audit trail accepts a limit.
    #[must_use]
    pub fn limit(mut self, rows: usize) -> Self {
        self.limit = Some(rows);
        self
    }

    #[must_use]
    pub const fn table(&self) -> Table {
        self.table
    }

    fn filter(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Filters other than the given columns.
    fn has_other_filters(&self, allowed: &[&str]) -> bool {
        self.filters
            .iter()
            .any(|(column, _)| !allowed.contains(&column.as_str()))
    }

    fn unsupported(&self) -> QueryError {
        QueryError::Unsupported {
            table: self.table,
            operation: self.operation.name(),
        }
    }

    fn required_id(&self, column: &'static str) -> Result<Uuid, QueryError> {
        let raw = self.filter(column).ok_or(QueryError::MissingFilter {
            table: self.table,
            operation: self.operation.name(),
            column,
        })?;
        Uuid::parse_str(raw.trim()).map_err(|_| QueryError::InvalidId(raw.to_string()))
    }

    fn optional_id(&self, column: &'static str) -> Result<Option<Uuid>, QueryError> {
        match self.filter(column) {
            Some(_) => self.required_id(column).map(Some),
            None => Ok(None),
        }
    }

    /// Translate the query into the REST call that serves it.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` when the API has no endpoint for this
    /// combination of table, operation and filters.
    pub fn resolve(&self) -> Result<Resolved, QueryError> {
        let limited = matches!(self.operation, Operation::Select) && self.table == Table::AuditLogs;
        if self.limit.is_some() && !limited {
            return Err(self.unsupported());
        }
        match &self.operation {
            Operation::Select => self.resolve_select().map(Resolved::Call),
            Operation::Insert(row) => self.resolve_insert(row),
            Operation::Update(changes) => self.resolve_update(changes).map(Resolved::Call),
        }
    }

    fn resolve_select(&self) -> Result<RestCall, QueryError> {
        match self.table {
            Table::ContrabandItems => {
                if self.has_other_filters(&["id", "seized_by"]) {
                    return Err(self.unsupported());
                }
                if let Some(id) = self.optional_id("id")? {
                    return Ok(RestCall::get(format!("/contraband-items/{id}")));
                }
                Ok(match self.optional_id("seized_by")? {
                    Some(officer) => RestCall::get(format!("/contraband-items?seized_by={officer}")),
                    None => RestCall::get("/contraband-items"),
                })
            }
            Table::ContrabandCategories if self.filters.is_empty() => {
                Ok(RestCall::get("/categories"))
            }
            Table::Users => {
                if self.has_other_filters(&["id", "is_active"]) {
                    return Err(self.unsupported());
                }
                if let Some(id) = self.optional_id("id")? {
                    return Ok(RestCall::get(format!("/users/{id}")));
                }
                match self.filter("is_active") {
                    Some("true") => Ok(RestCall::get("/users?active=true")),
                    Some(_) => Err(self.unsupported()),
                    None => Ok(RestCall::get("/users")),
                }
            }
            Table::Messages => match self.filters.as_slice() {
                [] => Ok(RestCall::get("/messages")),
                [(column, value)] if column == "message_type" && value == "approval_request" => {
                    Ok(RestCall::get("/messages/approvals"))
                }
                _ => Err(self.unsupported()),
            },
            Table::AuditLogs if self.filters.is_empty() => Ok(match self.limit {
                Some(rows) => RestCall::get(format!("/audit-logs?limit={rows}")),
                None => RestCall::get("/audit-logs"),
            }),
            Table::CustodyChain if !self.has_other_filters(&["contraband_id"]) => {
                let item = self.required_id("contraband_id")?;
                Ok(RestCall::get(format!("/custody/{item}")))
            }
            Table::EvidenceFiles if !self.has_other_filters(&["contraband_id"]) => {
                let item = self.required_id("contraband_id")?;
                Ok(RestCall::get(format!("/contraband-items/{item}/files")))
            }
            _ => Err(self.unsupported()),
        }
    }

    fn resolve_insert(&self, row: &Value) -> Result<Resolved, QueryError> {
        if !self.filters.is_empty() {
            return Err(self.unsupported());
        }
        let path = match self.table {
            Table::ContrabandItems => "/contraband-items",
            Table::Messages => "/messages",
            Table::CustodyChain => "/custody/transfers",
            Table::Users => "/users",
            Table::AuditLogs | Table::EvidenceFiles => return Ok(Resolved::NoOp),
            Table::ContrabandCategories => return Err(self.unsupported()),
        };
        Ok(Resolved::Call(RestCall::with_body(
            Method::POST,
            path,
            row.clone(),
        )))
    }

    fn resolve_update(&self, changes: &Value) -> Result<RestCall, QueryError> {
        if self.has_other_filters(&["id"]) {
            return Err(self.unsupported());
        }
        let id = self.required_id("id")?;
        match self.table {
            Table::ContrabandItems => {
                let status = changes.get("status").ok_or_else(|| self.unsupported())?;
                Ok(RestCall::with_body(
                    Method::PUT,
                    format!("/contraband-items/{id}/status"),
                    serde_json::json!({ "status": status }),
                ))
            }
            Table::Messages if changes.get("is_read") == Some(&Value::Bool(true)) => {
                Ok(RestCall {
                    method: Method::PATCH,
                    path: format!("/messages/{id}/read"),
                    body: None,
                })
            }
            Table::Users => Ok(RestCall::with_body(
                Method::PUT,
                format!("/users/{id}"),
                changes.clone(),
            )),
            _ => Err(self.unsupported()),
        }
    }
}
