//! Subscription integration tests
//!
//! `check-subscription`, checkout, customer portal and the payment
//! provider webhook, against the mock billing provider.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::json;

use tatame_accounts::ProfileStore;
use tatame_billing::webhook::{sign_payload, SIGNATURE_HEADER};
use tatame_billing::SubscriptionState;

use crate::common::{assert_error_body, mint_token, TestApp, WEBHOOK_SECRET};

const CHECK: &str = "/functions/v1/check-subscription";
const WEBHOOK: &str = "/functions/v1/billing-webhook";

mod test_check_subscription {
    use super::*;

    #[tokio::test]
    async fn test_active_subscription() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let customer = app.billing.add_customer(&user.email);
        let period_end = Utc::now() + Duration::days(30);
        app.billing
            .add_subscription(&customer, "prod_mensal", SubscriptionState::Active, period_end);

        let (status, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscribed"], true);
        assert_eq!(body["product_id"], "prod_mensal");
        assert!(body["subscription_end"].is_string());

        // Customer found by email is linked to the profile
        let profile = app.accounts.profiles.get(user.id).await.unwrap().unwrap();
        assert_eq!(profile.billing_customer_id.as_deref(), Some(customer.as_str()));
    }

    #[tokio::test]
    async fn test_get_is_equivalent_to_post() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let customer = app.billing.add_customer(&user.email);
        app.billing.add_subscription(
            &customer,
            "prod_anual",
            SubscriptionState::Active,
            Utc::now() + Duration::days(300),
        );

        let (status, body) = app.get(CHECK, Some(&user.token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscribed"], true);
    }

    #[tokio::test]
    async fn test_expired_period_is_not_subscribed() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let customer = app.billing.add_customer(&user.email);
        // Provider still says active but the period already ended
        app.billing.add_subscription(
            &customer,
            "prod_mensal",
            SubscriptionState::Active,
            Utc::now() - Duration::hours(1),
        );

        let (status, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscribed"], false);
        assert!(body["product_id"].is_null());
    }

    #[tokio::test]
    async fn test_canceled_is_not_subscribed() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let customer = app.billing.add_customer(&user.email);
        app.billing.add_subscription(
            &customer,
            "prod_mensal",
            SubscriptionState::Canceled,
            Utc::now() + Duration::days(10),
        );

        let (_, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(body["subscribed"], false);
    }

    #[tokio::test]
    async fn test_no_customer_is_unsubscribed_without_creating_one() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();

        let (status, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscribed"], false);

        let profile = app.accounts.profiles.get(user.id).await.unwrap().unwrap();
        assert!(profile.billing_customer_id.is_none());
        assert!(app.billing.checkouts().is_empty());
    }

    #[tokio::test]
    async fn test_requires_session() {
        let app = TestApp::new();

        let (status, body) = app.post(CHECK, None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_error_body(&body);
        assert_eq!(app.billing.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_without_email_is_401() {
        let app = TestApp::new();
        let token = mint_token(uuid::Uuid::new_v4(), None, Duration::hours(1));

        let (status, _) = app.post(CHECK, Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_provider_outage_is_502_not_false() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        app.billing.add_customer(&user.email);
        app.billing.set_unavailable(true);

        let (status, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    }
}

mod test_checkout {
    use super::*;

    #[tokio::test]
    async fn test_checkout_creates_customer_and_redirect() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();

        let (status, body) = app
            .post(
                "/functions/v1/create-checkout",
                Some(&user.token),
                json!({"price_id": "price_mensal"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().starts_with("https://checkout.mock/"));

        let checkouts = app.billing.checkouts();
        assert_eq!(checkouts.len(), 1);
        let checkout = &checkouts[0];
        assert_eq!(checkout.price_id, "price_mensal");
        assert_eq!(checkout.client_reference_id, Some(user.id.to_string()));
        assert_eq!(checkout.success_url, "https://tatame.test/assinatura/sucesso");
        assert!(checkout.customer_id.is_some());

        let profile = app.accounts.profiles.get(user.id).await.unwrap().unwrap();
        assert_eq!(profile.billing_customer_id, checkout.customer_id);
    }

    #[tokio::test]
    async fn test_checkout_requires_price() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();

        let (status, body) = app
            .post(
                "/functions/v1/create-checkout",
                Some(&user.token),
                json!({"price_id": ""}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_body(&body);
    }

    #[tokio::test]
    async fn test_portal_without_customer_is_404() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();

        let (status, _) = app
            .post("/functions/v1/customer-portal", Some(&user.token), json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_portal_for_linked_customer() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let customer = app.billing.add_customer(&user.email);

        let (status, body) = app
            .post("/functions/v1/customer-portal", Some(&user.token), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["url"].as_str().unwrap();
        assert!(url.contains(&customer));
        assert!(url.contains("https://tatame.test/perfil"));
    }
}

mod test_webhook {
    use super::*;

    fn signed(payload: &str, secret: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(WEBHOOK)
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                SIGNATURE_HEADER,
                sign_payload(payload.as_bytes(), secret, Utc::now().timestamp()),
            )
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn completed_checkout(customer: &str, reference: Option<String>, email: &str) -> String {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "customer": customer,
                "client_reference_id": reference,
                "customer_details": {"email": email}
            }}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_completed_checkout_links_customer() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let payload = completed_checkout("cus_pago", Some(user.id.to_string()), "outro@tatame.test");

        let (status, body) = app.send(signed(&payload, WEBHOOK_SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["received"], true);

        let profile = app.accounts.profiles.get(user.id).await.unwrap().unwrap();
        assert_eq!(profile.billing_customer_id.as_deref(), Some("cus_pago"));
    }

    #[tokio::test]
    async fn test_linked_customer_drives_check_subscription() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        // Customer registered under a different email than the profile
        let customer = app.billing.add_customer("pagante@outro.test");
        app.billing.add_subscription(
            &customer,
            "prod_mensal",
            SubscriptionState::Active,
            Utc::now() + Duration::days(30),
        );

        let (_, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(body["subscribed"], false);

        let payload = completed_checkout(&customer, None, &user.email);
        let (status, _) = app.send(signed(&payload, WEBHOOK_SECRET)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.post(CHECK, Some(&user.token), json!({})).await;
        assert_eq!(body["subscribed"], true);
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();
        let payload = completed_checkout("cus_falso", Some(user.id.to_string()), &user.email);

        let (status, body) = app.send(signed(&payload, "whsec_wrong")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_body(&body);

        let profile = app.accounts.profiles.get(user.id).await.unwrap().unwrap();
        assert!(profile.billing_customer_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected() {
        let app = TestApp::new();
        let (status, _) = app
            .post(WEBHOOK, None, json!({"id": "evt_1", "type": "ping", "data": {"object": {}}}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unconfigured_webhook_is_404() {
        let app = TestApp::without_webhook_secret();
        let payload = completed_checkout("cus_x", None, "x@tatame.test");

        let (status, _) = app.send(signed(&payload, WEBHOOK_SECRET)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_events_are_acknowledged() {
        let app = TestApp::new();
        let payload = json!({
            "id": "evt_2",
            "type": "invoice.paid",
            "data": {"object": {"customer": "cus_x"}}
        })
        .to_string();

        let (status, body) = app.send(signed(&payload, WEBHOOK_SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["received"], true);
    }
}
