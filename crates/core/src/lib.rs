//! `warden-core`: identifiers and the error taxonomy shared by every crate.
//!
//! This crate has no storage, transport or crypto concerns.

pub mod error;
pub mod id;

pub use error::{AuthError, AuthResult, FieldErrors};
pub use id::{AuditLogId, PermissionId, RoleId, UserId};
