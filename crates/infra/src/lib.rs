//! Infrastructure layer: repositories, database wiring and the services built
//! on them (credential store, authorization graph, audit logger).

pub mod audit_log;
pub mod credentials;
pub mod db;
pub mod graph;
pub mod store;

pub use audit_log::AuditLogger;
pub use credentials::CredentialStore;
pub use graph::AuthorizationGraph;
pub use store::{AuditRepository, RbacRepository, UserRepository};

#[cfg(test)]
mod integration_tests;
