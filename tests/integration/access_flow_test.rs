//! Client access flow against a live backend
//!
//! Serves the composed router on a local port and drives the client
//! runtime through it: session store, both resolvers and the access gate.

#![allow(dead_code)]

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::net::TcpListener;
use uuid::Uuid;

use tatame_billing::SubscriptionState;
use tatame_client::{
    AccessBackend, AccessController, AccessDecision, AccessRequirements, BackendClient,
    ClientConfig, RoleResolver, Session, SessionStore, SessionUser, SubscriptionResolver,
};

use common::{mint_token, TestApp, UserFixture};

/// Serve the app and return its base URL
async fn serve(app: &TestApp) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn controller(base_url: &str) -> (SessionStore, Arc<AccessController>) {
    let config = ClientConfig::new(base_url, "http://auth.tatame.test", "anon");
    let backend: Arc<dyn AccessBackend> = Arc::new(BackendClient::new(&config));
    let store = SessionStore::new();
    let controller = AccessController::new(
        store.clone(),
        RoleResolver::new(backend.clone()),
        SubscriptionResolver::new(backend),
    );
    (store, controller)
}

fn session_for(user: &UserFixture, ttl: Duration) -> Session {
    Session {
        access_token: mint_token(user.id, Some(&user.email), ttl),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now() + ttl,
        user: SessionUser {
            id: user.id,
            email: Some(user.email.clone()),
        },
    }
}

/// Replace the session and wait for both resolvers
async fn sign_in(store: &SessionStore, controller: &AccessController, session: Option<Session>) {
    store.replace(session);
    controller.resolve(store.state()).await;
}

#[tokio::test]
async fn test_paywall_lifts_after_subscribing() {
    let app = TestApp::new();
    let base = serve(&app).await;
    let user = app.create_user().await.unwrap();
    let (store, controller) = controller(&base);

    sign_in(&store, &controller, Some(session_for(&user, Duration::hours(1)))).await;
    assert_eq!(
        controller.decide(AccessRequirements::subscriber(), "/tecnicas/1"),
        AccessDecision::PaywallBlocked
    );
    assert_eq!(
        controller.decide(AccessRequirements::authenticated(), "/perfil"),
        AccessDecision::Granted
    );

    let customer = app.billing.add_customer(&user.email);
    app.billing.add_subscription(
        &customer,
        "prod_mensal",
        SubscriptionState::Active,
        Utc::now() + Duration::days(30),
    );
    controller.refresh_subscription().await;

    assert_eq!(
        controller.decide(AccessRequirements::subscriber(), "/tecnicas/1"),
        AccessDecision::Granted
    );
}

#[tokio::test]
async fn test_admin_gate_follows_server_role() {
    let app = TestApp::new();
    let base = serve(&app).await;
    let admin = app.create_admin().await.unwrap();
    let (store, controller) = controller(&base);

    sign_in(&store, &controller, Some(session_for(&admin, Duration::hours(1)))).await;
    assert_eq!(
        controller.decide(AccessRequirements::admin(), "/admin"),
        AccessDecision::Granted
    );
    // Admins see paid content without a subscription
    assert_eq!(
        controller.decide(AccessRequirements::subscriber(), "/tecnicas/1"),
        AccessDecision::Granted
    );
}

#[tokio::test]
async fn test_last_session_wins() {
    let app = TestApp::new();
    let base = serve(&app).await;
    let admin = app.create_admin().await.unwrap();
    let student = app.create_user().await.unwrap();
    let (store, controller) = controller(&base);

    sign_in(&store, &controller, Some(session_for(&admin, Duration::hours(1)))).await;
    let admin_state = store.state();

    sign_in(&store, &controller, Some(session_for(&student, Duration::hours(1)))).await;
    // A late resolution for the admin session must not overwrite the student's
    controller.resolve(admin_state).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user_id, Some(student.id));
    assert_eq!(snapshot.is_admin, Some(false));
    assert!(matches!(
        controller.decide(AccessRequirements::admin(), "/admin"),
        AccessDecision::Forbidden { .. }
    ));
}

#[tokio::test]
async fn test_sign_out_requires_login() {
    let app = TestApp::new();
    let base = serve(&app).await;
    let user = app.create_user().await.unwrap();
    let (store, controller) = controller(&base);

    sign_in(&store, &controller, Some(session_for(&user, Duration::hours(1)))).await;
    sign_in(&store, &controller, None).await;

    assert_eq!(
        controller.decide(AccessRequirements::subscriber(), "/tecnicas/9"),
        AccessDecision::Unauthenticated {
            return_to: "/tecnicas/9".to_string()
        }
    );
}

#[tokio::test]
async fn test_expired_session_fails_closed() {
    let app = TestApp::new();
    let base = serve(&app).await;
    let admin = app.create_admin().await.unwrap();
    let customer = app.billing.add_customer(&admin.email);
    app.billing.add_subscription(
        &customer,
        "prod_mensal",
        SubscriptionState::Active,
        Utc::now() + Duration::days(30),
    );
    let (store, controller) = controller(&base);

    sign_in(&store, &controller, Some(session_for(&admin, Duration::minutes(-5)))).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.is_admin, Some(false));
    assert_eq!(snapshot.subscription.map(|s| s.subscribed), Some(false));
}

#[tokio::test]
async fn test_unreachable_backend_fails_closed() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (store, controller) = controller(&format!("http://{}", addr));
    let user = UserFixture {
        id: Uuid::new_v4(),
        email: "offline@tatame.test".to_string(),
        token: String::new(),
    };

    sign_in(&store, &controller, Some(session_for(&user, Duration::hours(1)))).await;

    assert_eq!(
        controller.decide(AccessRequirements::subscriber(), "/tecnicas/1"),
        AccessDecision::PaywallBlocked
    );
    assert!(matches!(
        controller.decide(AccessRequirements::admin(), "/admin"),
        AccessDecision::Forbidden { .. }
    ));
}
