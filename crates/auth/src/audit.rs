//! Audit trail records, filters and pagination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{AuditLogId, UserId};

pub const ACTION_REGISTER: &str = "REGISTER";
pub const ACTION_LOGIN: &str = "LOGIN";

/// Resource type recorded when the path does not name one.
pub const FALLBACK_RESOURCE_TYPE: &str = "api";

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// A persisted audit record. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An audit record before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: Option<UserId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub details: Option<serde_json::Value>,
    /// Defaults to the store clock when absent.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewAuditEntry {
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            ip_address: String::new(),
            user_agent: String::new(),
            details: None,
            created_at: None,
        }
    }

    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Empty ids are stored as absent.
    pub fn with_resource_id(mut self, resource_id: Option<String>) -> Self {
        self.resource_id = resource_id.filter(|id| !id.is_empty());
        self
    }

    pub fn with_context(mut self, ctx: &AuditContext) -> Self {
        if self.user_id.is_none() {
            self.user_id = ctx.user_id;
        }
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn into_entry(self, id: AuditLogId, now: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            user_id: self.user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            details: self.details,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

/// Request metadata an audit entry is stamped with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub user_id: Option<UserId>,
    pub ip_address: String,
    pub user_agent: String,
}

/// Conjunctive audit query filter. Absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub user_id: Option<UserId>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id.is_none_or(|u| entry.user_id == Some(u))
            && self.action.as_deref().is_none_or(|a| entry.action == a)
            && self
                .resource_type
                .as_deref()
                .is_none_or(|r| entry.resource_type == r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Normalize raw values: a non-positive limit becomes the default, limits
    /// are capped at [`MAX_PAGE_LIMIT`], a negative offset becomes zero.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_PAGE_LIMIT),
            _ => DEFAULT_PAGE_LIMIT,
        };
        let offset = offset.filter(|o| *o >= 0).unwrap_or(0);
        Self { limit, offset }
    }
}

/// One page of audit results, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    pub pagination: Pagination,
}

/// Resource type for a request path: the first segment after `prefix`, or
/// [`FALLBACK_RESOURCE_TYPE`] when there is none.
///
/// `infer_resource_type("/api/v1/users/42", "/api/v1") == "users"`.
pub fn infer_resource_type(path: &str, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_RESOURCE_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_from_path() {
        assert_eq!(infer_resource_type("/api/v1/users/42/roles", "/api/v1"), "users");
        assert_eq!(infer_resource_type("/api/v1/roles", "/api/v1/"), "roles");
        assert_eq!(infer_resource_type("/api/v1/audit/logs", "/api/v1"), "audit");
        assert_eq!(infer_resource_type("/api/v1/", "/api/v1"), "api");
        assert_eq!(infer_resource_type("/api/v1", "/api/v1"), "api");
        assert_eq!(infer_resource_type("/metrics", "/api/v1"), "api");
        assert_eq!(infer_resource_type("/api/v10/users", "/api/v1"), "api");
    }

    #[test]
    fn pagination_normalization() {
        assert_eq!(Pagination::new(None, None), Pagination { limit: 50, offset: 0 });
        assert_eq!(Pagination::new(Some(0), Some(-3)), Pagination { limit: 50, offset: 0 });
        assert_eq!(Pagination::new(Some(-1), Some(10)), Pagination { limit: 50, offset: 10 });
        assert_eq!(Pagination::new(Some(5000), None).limit, MAX_PAGE_LIMIT);
        assert_eq!(Pagination::new(Some(7), Some(2)), Pagination { limit: 7, offset: 2 });
    }

    #[test]
    fn filter_is_conjunctive() {
        let user = UserId::new();
        let entry = NewAuditEntry::new("GET", "users")
            .with_user(Some(user))
            .into_entry(AuditLogId::new(), Utc::now());

        assert!(AuditFilter::default().matches(&entry));
        assert!(
            AuditFilter {
                user_id: Some(user),
                action: Some("GET".into()),
                resource_type: None,
            }
            .matches(&entry)
        );
        assert!(
            !AuditFilter {
                user_id: Some(user),
                action: Some("POST".into()),
                resource_type: None,
            }
            .matches(&entry)
        );
    }

    #[test]
    fn context_stamps_client_and_keeps_explicit_user() {
        let explicit = UserId::new();
        let ctx = AuditContext {
            user_id: Some(UserId::new()),
            ip_address: "10.0.0.1".into(),
            user_agent: "curl/8".into(),
        };
        let entry = NewAuditEntry::new("LOGIN", "user")
            .with_user(Some(explicit))
            .with_resource_id(Some(String::new()))
            .with_context(&ctx);

        assert_eq!(entry.user_id, Some(explicit));
        assert_eq!(entry.ip_address, "10.0.0.1");
        assert_eq!(entry.resource_id, None);
    }

    #[test]
    fn explicit_timestamp_survives() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut new = NewAuditEntry::new("GET", "roles");
        new.created_at = Some(at);
        assert_eq!(new.into_entry(AuditLogId::new(), Utc::now()).created_at, at);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: normalized paging is always within bounds.
            #[test]
            fn pagination_is_bounded(limit in any::<Option<i64>>(), offset in any::<Option<i64>>()) {
                let page = Pagination::new(limit, offset);
                prop_assert!(page.limit >= 1 && page.limit <= MAX_PAGE_LIMIT);
                prop_assert!(page.offset >= 0);
            }

            /// Property: the resource type is a single non-empty path segment.
            #[test]
            fn resource_type_is_one_segment(path in "(/[a-z0-9:]{0,8}){0,5}") {
                let resource = infer_resource_type(&format!("/api/v1{path}"), "/api/v1");
                prop_assert!(!resource.is_empty());
                prop_assert!(!resource.contains('/'));
            }
        }
    }
}
