//! Role management integration tests (`manage-roles`, `whoami`)

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use tatame_accounts::RoleStore;
use tatame_auth::AppRole;

use crate::common::{assert_error_body, TestApp};

const MANAGE_ROLES: &str = "/functions/v1/manage-roles";

mod test_manage_roles {
    use super::*;

    #[tokio::test]
    async fn test_grant_then_revoke_round_trip() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let user = app.create_user().await.unwrap();

        let (status, body) = app.get("/v1/auth/whoami", Some(&user.token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_admin"], false);

        let (status, body) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": user.id, "makeAdmin": true}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = app.get("/v1/auth/whoami", Some(&user.token)).await;
        assert_eq!(body["is_admin"], true);
        assert_eq!(body["id"], user.id.to_string());

        let (status, _) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": user.id, "makeAdmin": false}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get("/v1/auth/whoami", Some(&user.token)).await;
        assert_eq!(body["is_admin"], false);
    }

    #[tokio::test]
    async fn test_store_failure_changes_nothing() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let user = app.create_user().await.unwrap();
        let other_admin = app.create_admin().await.unwrap();
        app.role_store.set_failing_writes(true);

        let (status, body) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": user.id, "makeAdmin": true}),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_error_body(&body);

        let (status, _) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": other_admin.id, "makeAdmin": false}),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        assert!(!app.is_admin(user.id).await.unwrap());
        assert!(app.is_admin(other_admin.id).await.unwrap());
        assert_eq!(app.role_store.row_count(), 2);
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let user = app.create_user().await.unwrap();

        for _ in 0..3 {
            let (status, body) = app
                .post(
                    MANAGE_ROLES,
                    Some(&admin.token),
                    json!({"targetUserId": user.id, "makeAdmin": true}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }

        assert!(app.is_admin(user.id).await.unwrap());
        // A repeated grant does not add rows
        let admins = app
            .accounts
            .roles
            .admins_among(&[user.id, admin.id])
            .await
            .unwrap();
        assert_eq!(admins.len(), 2);
    }

    #[tokio::test]
    async fn test_revoke_of_non_admin_succeeds() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let user = app.create_user().await.unwrap();

        for _ in 0..2 {
            let (status, body) = app
                .post(
                    MANAGE_ROLES,
                    Some(&admin.token),
                    json!({"targetUserId": user.id, "makeAdmin": false}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }
        assert!(!app.is_admin(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, body) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": admin.id, "makeAdmin": false}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_body(&body);
        assert!(app.is_admin(admin.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_target_is_404() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, body) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": Uuid::new_v4(), "makeAdmin": true}),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, _) = app
            .post(
                MANAGE_ROLES,
                Some(&admin.token),
                json!({"targetUserId": "not-a-uuid", "makeAdmin": true}),
            )
            .await;
        assert!(status.is_client_error());
        assert_ne!(status, StatusCode::UNAUTHORIZED);
        assert_ne!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_body_cannot_claim_caller_identity() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let admin = app.create_admin().await.unwrap();

        // Extra fields naming the admin do not change who the caller is
        let (status, _) = app
            .post(
                MANAGE_ROLES,
                Some(&user.token),
                json!({"targetUserId": user.id, "makeAdmin": true, "callerId": admin.id, "isAdmin": true}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!app
            .accounts
            .roles
            .has_role(user.id, AppRole::Admin)
            .await
            .unwrap());
    }
}

mod test_whoami {
    use super::*;
    use crate::common::mint_token;
    use chrono::Duration;
    use tatame_accounts::ProfileStore;

    #[tokio::test]
    async fn test_whoami_requires_session() {
        let app = TestApp::new();
        let (status, body) = app.get("/v1/auth/whoami", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_error_body(&body);
    }

    #[tokio::test]
    async fn test_whoami_creates_profile_for_new_user() {
        let app = TestApp::new();
        let id = Uuid::new_v4();
        let token = mint_token(id, Some("Novo.Aluno@Tatame.test"), Duration::hours(1));

        let (status, body) = app.get("/v1/auth/whoami", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_admin"], false);
        assert!(body["expires_at"].is_string());

        let profile = app.accounts.profiles.get(id).await.unwrap().unwrap();
        assert_eq!(profile.email, "novo.aluno@tatame.test");
    }
}
