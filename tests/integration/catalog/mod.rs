//! Technique catalog integration tests
//!
//! Public listing, authenticated detail, admin writes and the translation
//! helper.

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{assert_error_body, TestApp, UserFixture};

const TECHNIQUES: &str = "/v1/techniques";

async fn create(app: &TestApp, admin: &UserFixture, body: Value) -> Value {
    let (status, technique) = app.post(TECHNIQUES, Some(&admin.token), body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", technique);
    technique
}

async fn seed(app: &TestApp, admin: &UserFixture) -> (String, String) {
    let armlock = create(
        app,
        admin,
        json!({
            "names": {"pt": "Chave de braço da guarda", "en": "Armbar from guard"},
            "descriptions": {"pt": "Finalização clássica"},
            "category": "Finalizacao",
            "video_url": "https://videos.tatame.test/armlock.mp4",
            "thumbnail_url": "https://img.tatame.test/armlock.jpg",
            "display_order": 2
        }),
    )
    .await;
    let tesoura = create(
        app,
        admin,
        json!({
            "names": {"pt": "Raspagem de tesoura"},
            "category": "raspagem",
            "display_order": 1
        }),
    )
    .await;
    (
        armlock["id"].as_str().unwrap().to_string(),
        tesoura["id"].as_str().unwrap().to_string(),
    )
}

mod test_listing {
    use super::*;

    #[tokio::test]
    async fn test_public_list_hides_video_urls() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        seed(&app, &admin).await;

        let (status, body) = app.get(TECHNIQUES, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);

        let items = body["items"].as_array().unwrap();
        // display_order ascending by default
        assert_eq!(items[0]["name"], "Raspagem de tesoura");
        assert_eq!(items[1]["name"], "Chave de braço da guarda");
        assert_eq!(items[1]["has_video"], true);
        assert_eq!(items[0]["has_video"], false);
        for item in items {
            assert!(item.get("video_url").is_none());
        }
    }

    #[tokio::test]
    async fn test_locale_with_fallback() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        seed(&app, &admin).await;

        let (_, body) = app.get(&format!("{}?locale=en", TECHNIQUES), None).await;
        let names: Vec<&str> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Armbar from guard"));
        // No English name stored; Portuguese is served
        assert!(names.contains(&"Raspagem de tesoura"));
    }

    #[tokio::test]
    async fn test_unsupported_locale_is_400() {
        let app = TestApp::new();
        let (status, body) = app.get(&format!("{}?locale=xx", TECHNIQUES), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_body(&body);
    }

    #[tokio::test]
    async fn test_filter_by_category_and_search() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        seed(&app, &admin).await;

        let (_, body) = app
            .get(&format!("{}?category=FINALIZACAO", TECHNIQUES), None)
            .await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["category"], "finalizacao");

        let (_, body) = app.get(&format!("{}?search=tesoura", TECHNIQUES), None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["name"], "Raspagem de tesoura");
    }

    #[tokio::test]
    async fn test_paging() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        seed(&app, &admin).await;

        let (_, body) = app
            .get(&format!("{}?limit=1&offset=1", TECHNIQUES), None)
            .await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["total"], 2);
        assert_eq!(body["has_more"], false);
    }
}

mod test_detail {
    use super::*;

    #[tokio::test]
    async fn test_detail_requires_session() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let (armlock, _) = seed(&app, &admin).await;

        let (status, _) = app.get(&format!("{}/{}", TECHNIQUES, armlock), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = app.create_user().await.unwrap();
        let (status, body) = app
            .get(&format!("{}/{}", TECHNIQUES, armlock), Some(&user.token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["video_url"], "https://videos.tatame.test/armlock.mp4");
        assert_eq!(body["names"]["en"], "Armbar from guard");
    }

    #[tokio::test]
    async fn test_unknown_technique_is_404() {
        let app = TestApp::new();
        let user = app.create_user().await.unwrap();

        let (status, _) = app
            .get(
                &format!("{}/{}", TECHNIQUES, uuid::Uuid::new_v4()),
                Some(&user.token),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod test_admin_writes {
    use super::*;

    #[tokio::test]
    async fn test_create_requires_portuguese_name() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, body) = app
            .post(
                TECHNIQUES,
                Some(&admin.token),
                json!({"names": {"en": "Kimura"}, "category": "finalizacao"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_body(&body);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_url() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, _) = app
            .post(
                TECHNIQUES,
                Some(&admin.token),
                json!({"names": {"pt": "Kimura"}, "category": "finalizacao", "video_url": "nao-e-url"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_clears_video_and_keeps_rest() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let (armlock, _) = seed(&app, &admin).await;

        let (status, body) = app
            .patch(
                &format!("{}/{}", TECHNIQUES, armlock),
                Some(&admin.token),
                json!({"video_url": null, "display_order": 7}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["video_url"].is_null());
        assert_eq!(body["display_order"], 7);
        assert_eq!(body["thumbnail_url"], "https://img.tatame.test/armlock.jpg");
        assert_eq!(body["names"]["pt"], "Chave de braço da guarda");
    }

    #[tokio::test]
    async fn test_delete_then_404() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        let (_, tesoura) = seed(&app, &admin).await;
        let uri = format!("{}/{}", TECHNIQUES, tesoura);

        let (status, _) = app.delete(&uri, Some(&admin.token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.delete(&uri, Some(&admin.token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = app.get(TECHNIQUES, None).await;
        assert_eq!(body["total"], 1);
    }
}

mod test_translate {
    use super::*;

    const TRANSLATE: &str = "/functions/v1/translate";

    #[tokio::test]
    async fn test_translate_and_cache() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        app.llm
            .set_reply(r#"{"en": "Scissor sweep", "es": "Raspado de tijera"}"#);
        let body = json!({"text": "Raspagem de tesoura", "targetLocales": ["en", "es"]});

        let (status, response) = app
            .post(TRANSLATE, Some(&admin.token), body.clone())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["translations"]["en"], "Scissor sweep");
        assert_eq!(response["translations"]["es"], "Raspado de tijera");

        let (status, _) = app.post(TRANSLATE, Some(&admin.token), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_502() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();
        app.llm.set_failing(true);

        let (status, body) = app
            .post(
                TRANSLATE,
                Some(&admin.token),
                json!({"text": "Guarda fechada", "targetLocales": ["en"]}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_unsupported_target_is_400() {
        let app = TestApp::new();
        let admin = app.create_admin().await.unwrap();

        let (status, _) = app
            .post(
                TRANSLATE,
                Some(&admin.token),
                json!({"text": "Guarda fechada", "targetLocales": ["de"]}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.llm.call_count(), 0);
    }
}
