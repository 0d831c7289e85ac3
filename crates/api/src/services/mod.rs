//! Business logic services for the API.
//!
//! - `auth` - Password login, registration and account creation
//! - `token` - Bearer token signing and verification
//! - `storage` - Evidence file storage on disk

pub mod auth;
pub mod storage;
pub mod token;
