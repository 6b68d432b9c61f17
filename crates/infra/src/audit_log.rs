//! Audit pipeline: record and query the append-only audit trail.

use std::sync::Arc;

use serde::Serialize;

use warden_auth::{AuditContext, AuditFilter, AuditLogEntry, AuditPage, NewAuditEntry, Pagination};
use warden_core::{AuthError, AuthResult};

use crate::store::AuditRepository;

#[derive(Clone)]
pub struct AuditLogger {
    repo: Arc<dyn AuditRepository>,
}

impl AuditLogger {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    /// Persist one entry and return it with its id (and timestamp) filled in.
    /// Write failures are returned; callers decide whether they are fatal.
    pub async fn record(&self, entry: NewAuditEntry) -> AuthResult<AuditLogEntry> {
        self.repo.append(entry).await
    }

    /// Record an entry stamped with the acting user and client metadata of
    /// the current request.
    pub async fn record_from_request<D: Serialize>(
        &self,
        ctx: &AuditContext,
        action: &str,
        resource_type: &str,
        resource_id: Option<String>,
        details: Option<&D>,
    ) -> AuthResult<AuditLogEntry> {
        let mut entry = NewAuditEntry::new(action, resource_type)
            .with_resource_id(resource_id)
            .with_context(ctx);
        if let Some(details) = details {
            let value = serde_json::to_value(details)
                .map_err(|e| AuthError::internal(format!("audit details not serializable: {e}")))?;
            entry = entry.with_details(value);
        }
        self.record(entry).await
    }

    /// Newest-first page of entries matching every set filter.
    pub async fn query(&self, filter: &AuditFilter, pagination: Pagination) -> AuthResult<AuditPage> {
        let entries = self.repo.query(filter, pagination).await?;
        Ok(AuditPage {
            entries,
            pagination,
        })
    }
}
