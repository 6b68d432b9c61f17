use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, header};

use warden_auth::AuditContext;

/// Authenticated identity attached to a request by the authenticate gate.
pub use warden_auth::Identity;

/// Client metadata for a request: address and agent string.
///
/// The address is the first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the socket peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn resolve(headers: &HeaderMap, extensions: &Extensions) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| header("x-real-ip").map(str::to_string))
            .or_else(|| {
                extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_default();

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self {
            ip_address,
            user_agent,
        }
    }

    /// Audit context for this client acting as `identity` (if any).
    pub fn audit_context(&self, identity: Option<&Identity>) -> AuditContext {
        AuditContext {
            user_id: identity.map(|i| i.user_id),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(&parts.headers, &parts.extensions))
    }
}
