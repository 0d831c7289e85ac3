//! Session-held models for the console.

pub mod session;

pub use session::{CurrentOfficer, Flash, FlashKind, keys as session_keys};
