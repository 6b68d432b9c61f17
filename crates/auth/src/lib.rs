//! `warden-auth`: authentication/authorization domain (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines the
//! data model, signs and verifies identity tokens, hashes credentials and
//! decides role gates. Persistence lives in `warden-infra`.

pub mod audit;
pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod rbac;
pub mod token;
pub mod user;

pub use audit::{
    AuditContext, AuditFilter, AuditLogEntry, AuditPage, NewAuditEntry, Pagination,
    infer_resource_type,
};
pub use authorize::{RoleRequirement, authorize_self_or_admin};
pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use password::{Argon2Hasher, CredentialHasher};
pub use principal::Identity;
pub use rbac::{Permission, PermissionResponse, Role, RolePermission, RoleResponse, UserRole};
pub use token::{TokenConfig, TokenService};
pub use user::{User, UserLogin, UserRegistration, UserResponse};

pub use warden_core::{AuditLogId, AuthError, AuthResult, PermissionId, RoleId, UserId};
