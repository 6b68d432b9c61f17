//! Service wiring: picks the store backend and assembles the core services.

use std::sync::Arc;

use anyhow::Context;

use warden_auth::{Argon2Hasher, CredentialHasher, TokenService};
use warden_infra::db;
use warden_infra::store::{
    InMemoryAuditRepository, InMemoryRbacRepository, InMemoryUserRepository,
    PostgresAuditRepository, PostgresRbacRepository, PostgresUserRepository,
};
use warden_infra::{
    AuditLogger, AuditRepository, AuthorizationGraph, CredentialStore, RbacRepository,
    UserRepository,
};

use crate::config::AppConfig;

/// Everything handlers and gates need, shared behind one `Arc`.
pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub credentials: CredentialStore,
    pub graph: AuthorizationGraph,
    pub audit: AuditLogger,
}

/// Repository set backing the services.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub rbac: Arc<dyn RbacRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            rbac: Arc::new(InMemoryRbacRepository::new()),
            audit: Arc::new(InMemoryAuditRepository::new()),
        }
    }

    pub async fn postgres(config: &db::DbConfig) -> anyhow::Result<Self> {
        let pool = db::create_pool(config).await?;
        db::migrate(&pool).await?;
        Ok(Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            rbac: Arc::new(PostgresRbacRepository::new(pool.clone())),
            audit: Arc::new(PostgresAuditRepository::new(pool)),
        })
    }
}

impl AppServices {
    /// Wire services over `stores`, seeding default roles when configured.
    pub async fn assemble(
        config: AppConfig,
        stores: Stores,
        hasher: Arc<dyn CredentialHasher>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.token);
        if !tokens.is_configured() {
            tracing::warn!("token service has no signing secret; authenticated routes will fail");
        }

        let credentials =
            CredentialStore::new(stores.users, hasher).with_default_role(config.default_role.clone());
        let graph = AuthorizationGraph::new(stores.rbac);
        let audit = AuditLogger::new(stores.audit);

        if config.seed_defaults {
            graph
                .seed_defaults()
                .await
                .context("failed to seed default roles and permissions")?;
        }

        Ok(Self {
            config: Arc::new(config),
            tokens,
            credentials,
            graph,
            audit,
        })
    }
}

/// Build services from configuration: PostgreSQL when `DATABASE_URL` is set,
/// in-memory stores otherwise.
pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    let stores = match &config.database {
        Some(db) => Stores::postgres(db).await?,
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Stores::in_memory()
        }
    };
    AppServices::assemble(config, stores, Arc::new(Argon2Hasher::new())).await
}
