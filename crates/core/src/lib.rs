//! Contraband Management System core - shared domain library.
//!
//! This crate provides the types and rules used by every CMS component:
//! - `cms-api` - REST backend that owns the database
//! - `cms-web` - Server-rendered officer console
//! - `cms-cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. The API and the console both depend on
//! it, so the records in [`records`] are the single definition of the wire
//! format.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, roles and status enums
//! - [`records`] - Request and response payloads of the REST API
//! - [`permissions`] - Role gates and per-role navigation
//! - [`filter`] - Search and filtering over fetched lists
//! - [`report`] - Report dashboard aggregation
//! - [`seizure`] - Seizure numbering and form validation
//! - [`validate`] - Shared form validation
//! - [`format`] - Display helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod filter;
pub mod format;
pub mod permissions;
pub mod records;
pub mod report;
pub mod seizure;
pub mod types;
pub mod validate;

pub use permissions::{Capability, MenuItem, menu_for};
pub use types::*;
