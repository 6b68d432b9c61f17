//! Integration tests for the services over in-memory repositories.
//!
//! Verifies:
//! - Registration defaults, uniqueness and password handling
//! - Role assignment idempotence and permission derivation through roles
//! - Audit recording, filtering and newest-first paging

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use warden_auth::{
        Argon2Hasher, AuditContext, AuditFilter, NewAuditEntry, Pagination, User, UserRegistration,
    };
    use warden_core::{AuthError, PermissionId, RoleId, UserId};

    use crate::store::{
        InMemoryAuditRepository, InMemoryRbacRepository, InMemoryUserRepository, UserRepository,
    };
    use crate::{AuditLogger, AuthorizationGraph, CredentialStore};

    fn credential_store() -> (CredentialStore, Arc<InMemoryUserRepository>) {
        let users = Arc::new(InMemoryUserRepository::new());
        let hasher = Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap());
        (CredentialStore::new(users.clone(), hasher), users)
    }

    fn registration(username: &str) -> UserRegistration {
        serde_json::from_value(serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse",
            "first_name": "Test",
            "last_name": "User",
        }))
        .unwrap()
    }

    async fn seeded_graph() -> AuthorizationGraph {
        let graph = AuthorizationGraph::new(Arc::new(InMemoryRbacRepository::new()));
        graph.seed_defaults().await.unwrap();
        graph
    }

    #[tokio::test]
    async fn create_then_lookup_returns_public_defaults() {
        let (store, _) = credential_store();
        let created = store.create(&registration("alice")).await.unwrap();

        let fetched = store.get_by_username("alice").await.unwrap();
        let view = CredentialStore::to_public_view(&fetched);
        assert_eq!(view.id, created.id);
        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "alice@example.com");
        assert_eq!(view.role, "user");
        assert!(view.active);
        assert_ne!(fetched.password_hash, "correct horse");
        assert_eq!(store.get_by_id(created.id).await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_without_a_second_row() {
        let (store, users) = credential_store();
        let first = store.create(&registration("alice")).await.unwrap();

        let err = store.create(&registration("alice")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        assert_eq!(users.find_by_username("alice").await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn invalid_registration_is_rejected_before_storage() {
        let (store, users) = credential_store();
        let mut reg = registration("al");
        reg.password = "short".into();

        assert!(matches!(store.create(&reg).await, Err(AuthError::Validation(_))));
        assert!(users.find_by_username("al").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let (store, _) = credential_store();
        store.create(&registration("alice")).await.unwrap();

        let wrong_password = store.authenticate("alice", "not the password").await.unwrap_err();
        let unknown_user = store.authenticate("bob", "correct horse").await.unwrap_err();
        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(unknown_user, wrong_password);

        assert!(store.authenticate("alice", "correct horse").await.is_ok());
    }

    #[tokio::test]
    async fn inactive_account_with_correct_password_is_forbidden() {
        let (store, users) = credential_store();
        let hasher = Argon2Hasher::with_params(1024, 1, 1).unwrap();
        let now = Utc::now();
        users
            .insert(User {
                id: UserId::new(),
                username: "carol".into(),
                email: "carol@example.com".into(),
                password_hash: warden_auth::CredentialHasher::hash(&hasher, "correct horse").unwrap(),
                first_name: String::new(),
                last_name: String::new(),
                role: "user".into(),
                active: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        assert!(matches!(
            store.authenticate("carol", "correct horse").await,
            Err(AuthError::Forbidden(_))
        ));
        assert_eq!(
            store.authenticate("carol", "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn assign_twice_equals_once_and_remove_absent_is_a_noop() {
        let graph = seeded_graph().await;
        let user = UserId::new();
        let admin = graph.get_role_by_name("admin").await.unwrap();

        graph.assign_role(user, admin.id).await.unwrap();
        graph.assign_role(user, admin.id).await.unwrap();
        let roles = graph.roles_for_user(user).await.unwrap();
        assert_eq!(roles.iter().filter(|r| r.id == admin.id).count(), 1);

        let member = graph.get_role_by_name("user").await.unwrap();
        graph.remove_role(user, member.id).await.unwrap();
        graph.remove_role(user, admin.id).await.unwrap();
        graph.remove_role(user, admin.id).await.unwrap();
        assert!(graph.roles_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_permissions_are_the_deduplicated_union_over_roles() {
        let graph = seeded_graph().await;
        let user = UserId::new();

        let auditor = graph.create_role("auditor", "Reads audit logs").await.unwrap();
        for name in ["audit:read", "users:read"] {
            let perm = graph
                .list_permissions()
                .await
                .unwrap()
                .into_iter()
                .find(|p| p.name == name)
                .unwrap();
            graph.grant_permission(auditor.id, perm.id).await.unwrap();
        }
        graph.assign_role(user, auditor.id).await.unwrap();
        let member = graph.get_role_by_name("user").await.unwrap();
        graph.assign_role(user, member.id).await.unwrap();

        let mut expected = BTreeSet::new();
        for role in graph.roles_for_user(user).await.unwrap() {
            for p in graph.permissions_for_role(role.id).await.unwrap() {
                expected.insert(p.name);
            }
        }

        let names: Vec<String> = graph
            .permissions_for_user(user)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, expected.into_iter().collect::<Vec<_>>());
        assert_eq!(names, vec!["audit:read", "users:read"]);

        for p in graph.list_permissions().await.unwrap() {
            assert_eq!(
                graph.has_permission(user, &p.name).await.unwrap(),
                names.contains(&p.name),
                "{}",
                p.name
            );
        }
    }

    #[tokio::test]
    async fn listings_are_ordered_by_name_and_seeding_is_idempotent() {
        let graph = seeded_graph().await;
        graph.seed_defaults().await.unwrap();

        let roles: Vec<String> = graph.list_roles().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(roles, vec!["admin", "user"]);

        let perms: Vec<String> = graph
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            perms,
            vec!["audit:read", "roles:read", "roles:write", "users:read", "users:write"]
        );

        let admin = graph.get_role_by_name("admin").await.unwrap();
        assert_eq!(graph.permissions_for_role(admin.id).await.unwrap().len(), 5);
        assert!(matches!(
            graph.create_role("admin", "").await,
            Err(AuthError::Conflict(_))
        ));
        assert!(matches!(
            graph.get_role_by_id(warden_core::RoleId::new()).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn audit_default_page_is_fifty_newest_first() {
        let audit = AuditLogger::new(Arc::new(InMemoryAuditRepository::new()));
        for i in 0..60 {
            let mut entry = NewAuditEntry::new("GET", "users");
            entry.created_at = DateTime::from_timestamp(1_700_000_000 + i, 0);
            audit.record(entry).await.unwrap();
        }

        let page = audit
            .query(&AuditFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 50);
        assert_eq!(page.entries[0].created_at.timestamp(), 1_700_000_059);
        assert!(page
            .entries
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn audit_user_filter_and_request_context() {
        let audit = AuditLogger::new(Arc::new(InMemoryAuditRepository::new()));
        let alice = UserId::new();
        let ctx = AuditContext {
            user_id: Some(alice),
            ip_address: "203.0.113.7".into(),
            user_agent: "reqwest".into(),
        };

        let recorded = audit
            .record_from_request(
                &ctx,
                "LOGIN",
                "user",
                Some(alice.to_string()),
                Some(&serde_json::json!({"username": "alice"})),
            )
            .await
            .unwrap();
        assert_eq!(recorded.ip_address, "203.0.113.7");
        assert_eq!(recorded.details, Some(serde_json::json!({"username": "alice"})));

        audit
            .record(NewAuditEntry::new("GET", "roles").with_user(Some(UserId::new())))
            .await
            .unwrap();
        audit.record(NewAuditEntry::new("POST", "auth")).await.unwrap();

        let filter = AuditFilter {
            user_id: Some(alice),
            ..AuditFilter::default()
        };
        let page = audit.query(&filter, Pagination::default()).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(page.entries.iter().all(|e| e.user_id == Some(alice)));
    }

    #[tokio::test]
    async fn grants_require_existing_role_and_permission() {
        let graph = seeded_graph().await;
        let role = graph.create_role("auditor", "").await.unwrap();
        let perm = graph
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == "audit:read")
            .unwrap();

        assert!(matches!(
            graph.grant_permission(RoleId::new(), perm.id).await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            graph.grant_permission(role.id, PermissionId::new()).await,
            Err(AuthError::NotFound(_))
        ));

        graph.grant_permission(role.id, perm.id).await.unwrap();
        graph.grant_permission(role.id, perm.id).await.unwrap();
        assert_eq!(graph.permissions_for_role(role.id).await.unwrap(), vec![perm]);
    }

    #[tokio::test]
    async fn names_longer_than_their_column_are_validation_errors() {
        let graph = seeded_graph().await;

        assert!(graph.create_role(&"r".repeat(50), "").await.is_ok());
        assert!(matches!(
            graph.create_role(&"r".repeat(51), "").await,
            Err(AuthError::Validation(_))
        ));

        assert!(graph.create_permission(&"p".repeat(100), "").await.is_ok());
        assert!(matches!(
            graph.create_permission(&"p".repeat(101), "").await,
            Err(AuthError::Validation(_))
        ));
    }
}
