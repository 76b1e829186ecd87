//! Admin authorization boundary tests
//!
//! Every privileged endpoint answers 401 without a valid session and 403
//! for a signed-in non-admin, and neither leaves a trace in the stores or
//! the providers.

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};
use uuid::Uuid;

use tatame_accounts::ProfileStore;
use tatame_auth::SupabaseClaims;
use tatame_catalog::{TechniqueQuery, TechniqueStore};

use crate::common::{assert_error_body, mint_claims, mint_token, request, TestApp};

/// One privileged call per admin operation
fn admin_calls(target: Uuid) -> Vec<(Method, String, Option<Value>)> {
    vec![
        (
            Method::POST,
            "/functions/v1/manage-roles".to_string(),
            Some(json!({"targetUserId": target, "makeAdmin": true})),
        ),
        (Method::GET, "/functions/v1/admin-users".to_string(), None),
        (
            Method::DELETE,
            format!("/functions/v1/admin-users/{}", target),
            None,
        ),
        (
            Method::PATCH,
            format!("/functions/v1/admin-users/{}/billing", target),
            Some(json!({"billingCustomerId": "cus_hijack"})),
        ),
        (
            Method::POST,
            "/functions/v1/create-user".to_string(),
            Some(json!({"email": "novo@tatame.test", "password": "segredo123", "makeAdmin": true})),
        ),
        (
            Method::POST,
            "/functions/v1/update-user-password".to_string(),
            Some(json!({"userId": target, "password": "trocada123"})),
        ),
        (
            Method::POST,
            "/functions/v1/manage-plans".to_string(),
            Some(json!({"action": "create", "name": "Mensal", "unitAmount": 4990, "interval": "month"})),
        ),
        (
            Method::POST,
            "/v1/techniques".to_string(),
            Some(json!({"names": {"pt": "Armlock"}, "category": "finalizacao"})),
        ),
        (
            Method::POST,
            "/functions/v1/translate".to_string(),
            Some(json!({"text": "Raspagem", "targetLocales": ["en"]})),
        ),
    ]
}

/// Snapshot of everything an admin call could change
#[derive(Debug, PartialEq)]
struct Footprint {
    target_is_admin: bool,
    target_billing: Option<String>,
    identity_users: usize,
    billing_calls: usize,
    llm_calls: usize,
    techniques: i64,
}

async fn footprint(app: &TestApp, target: Uuid) -> Footprint {
    let profile = app.accounts.profiles.get(target).await.unwrap();
    let (_, techniques) = app
        .catalog
        .techniques
        .list(&TechniqueQuery::default(), 0, 100)
        .await
        .unwrap();
    Footprint {
        target_is_admin: app.is_admin(target).await.unwrap(),
        target_billing: profile.and_then(|p| p.billing_customer_id),
        identity_users: app.identity.user_count(),
        billing_calls: app.billing.call_count(),
        llm_calls: app.llm.call_count(),
        techniques,
    }
}

mod test_unauthenticated {
    use super::*;

    #[tokio::test]
    async fn test_admin_endpoints_reject_missing_token_with_401() {
        let app = TestApp::new();
        let target = app.create_user().await.unwrap();
        let before = footprint(&app, target.id).await;

        for (method, uri, body) in admin_calls(target.id) {
            let (status, response) = app.send(request(method.clone(), &uri, None, body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_error_body(&response);
        }

        assert_eq!(footprint(&app, target.id).await, before);
    }

    #[tokio::test]
    async fn test_admin_endpoints_reject_expired_token_with_401() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let expired = mint_token(admin.id, Some(&admin.email), Duration::hours(-2));
        let target = app.create_user().await.unwrap();
        let before = footprint(&app, target.id).await;

        for (method, uri, body) in admin_calls(target.id) {
            let (status, _) = app
                .send(request(method.clone(), &uri, Some(&expired), body))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }

        assert_eq!(footprint(&app, target.id).await, before);
    }

    #[tokio::test]
    async fn test_malformed_authorization_is_401() {
        let app = TestApp::new();

        let (status, body) = app.get("/functions/v1/admin-users", Some("not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_error_body(&body);
    }

    #[tokio::test]
    async fn test_project_key_is_not_a_session() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let claims = SupabaseClaims {
            sub: admin.id.to_string(),
            email: Some(admin.email.clone()),
            iat: chrono::Utc::now().timestamp() as u64,
            exp: (chrono::Utc::now() + Duration::hours(1)).timestamp() as u64,
            aud: "authenticated".to_string(),
            role: "service_role".to_string(),
            session_id: None,
        };

        let (status, _) = app
            .get("/functions/v1/admin-users", Some(&mint_claims(claims)))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod test_forbidden {
    use super::*;

    #[tokio::test]
    async fn test_admin_endpoints_reject_non_admin_with_403() {
        let app = TestApp::new();
        let caller = app.create_user().await.unwrap();
        let target = app.create_user().await.unwrap();
        let before = footprint(&app, target.id).await;

        for (method, uri, body) in admin_calls(target.id) {
            let (status, response) = app
                .send(request(method.clone(), &uri, Some(&caller.token), body))
                .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
            assert_error_body(&response);
        }

        assert_eq!(footprint(&app, target.id).await, before);
        assert!(!app.is_admin(caller.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_self_promote() {
        let app = TestApp::new();
        let caller = app.create_user().await.unwrap();

        let (status, _) = app
            .post(
                "/functions/v1/manage-roles",
                Some(&caller.token),
                json!({"targetUserId": caller.id, "makeAdmin": true}),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!app.is_admin(caller.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_technique_writes_forbidden_for_non_admin() {
        let app = TestApp::new();
        let caller = app.create_user().await.unwrap();
        let id = Uuid::new_v4();

        let (status, _) = app
            .patch(
                &format!("/v1/techniques/{}", id),
                Some(&caller.token),
                json!({"category": "passagem"}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .delete(&format!("/v1/techniques/{}", id), Some(&caller.token))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

mod test_admin_allowed {
    use super::*;

    #[tokio::test]
    async fn test_admin_passes_boundary() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, body) = app
            .get("/functions/v1/admin-users", Some(&admin.token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_revoked_admin_is_forbidden_immediately() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let other = app.create_admin().await.unwrap();

        let (status, _) = app
            .post(
                "/functions/v1/manage-roles",
                Some(&other.token),
                json!({"targetUserId": admin.id, "makeAdmin": false}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        // Same token, role re-read on every request
        let (status, _) = app
            .get("/functions/v1/admin-users", Some(&admin.token))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

mod test_provider_sessions {
    use super::*;

    #[tokio::test]
    async fn test_signed_out_admin_token_is_401() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let target = app.create_user().await.unwrap();

        app.identity.sign_out_user(admin.id);
        let before = footprint(&app, target.id).await;

        for (method, uri, body) in admin_calls(target.id) {
            let (status, response) = app
                .send(request(method.clone(), &uri, Some(&admin.token), body))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_eq!(response["error"]["code"], "SESSION_REVOKED");
        }

        assert_eq!(footprint(&app, target.id).await, before);
        assert!(app.is_admin(admin.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_signed_out_member_keeps_self_service() {
        let app = TestApp::new();
        let member = app.create_user().await.unwrap();
        app.identity.sign_out_user(member.id);

        // Only privileged requests consult the provider
        let (status, _) = app.get("/v1/auth/whoami", Some(&member.token)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_provider_outage_denies_admin() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        app.identity.set_unavailable(true);

        let (status, body) = app
            .get("/functions/v1/admin-users", Some(&admin.token))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");

        app.identity.set_unavailable(false);
        let (status, _) = app
            .get("/functions/v1/admin-users", Some(&admin.token))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}
