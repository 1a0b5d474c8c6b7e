mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tl_domain::config::VerificationMode;
use tl_gateway::identity::IdentityResolver;
use tl_store::UserStore;

use common::{app, register, send, Caller, PRINCIPAL_HEADER, TOKEN_HEADER};

#[tokio::test]
async fn register_then_me_returns_empty_record() {
    let app = app();
    let ann = Caller::new("p1", "Ann", "ann@x.com");

    register(&app, &ann).await;
    let (status, body) = send(&app.router, ann.get("/api/users/me")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ann");
    assert_eq!(body["email"], "ann@x.com");
    assert_eq!(body["principal_id"], "p1");
    assert_eq!(body["assistants"], json!([]));
    assert_eq!(body["threads"], json!([]));
    assert_eq!(body["vectorstores"], json!([]));
}

#[tokio::test]
async fn second_registration_conflicts() {
    let app = app();
    let ann = Caller::new("p1", "Ann", "ann@x.com");

    let (first, _) = send(&app.router, ann.post_empty("/api/users/")).await;
    let (second, body) = send(&app.router, ann.post_empty("/api/users/")).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["error"], "User with this principal ID already exists");
    assert_eq!(app.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn registration_without_trailing_slash_is_routed() {
    let app = app();
    let ann = Caller::new("p1", "Ann", "ann@x.com");

    let (status, _) = send(&app.router, ann.post_empty("/api/users")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn me_for_unregistered_principal_is_not_found() {
    let app = app();
    let ghost = Caller::new("nobody", "Ghost", "ghost@x.com");

    let (status, body) = send(&app.router, ghost.get("/api/users/me")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User with this principal ID is not registered");
}

#[tokio::test]
async fn missing_token_header_is_unauthorized() {
    let app = app();
    let req = Request::builder()
        .uri("/api/users/me")
        .header(PRINCIPAL_HEADER, "p1")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing Token");
}

#[tokio::test]
async fn missing_principal_header_is_unauthorized() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/users/")
        .header(TOKEN_HEADER, common::token("Ann", "ann@x.com"))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing principal ID");
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn garbage_credential_is_rejected_at_registration() {
    let app = app();
    let caller = Caller {
        principal_id: "p1".into(),
        token: "not-a-jwt".into(),
    };

    let (status, body) = send(&app.router, caller.post_empty("/api/users/")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn email_falls_back_to_preferred_username() {
    let app = app();
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "name": "Bo", "preferred_username": "bo@corp.example" }),
        &jsonwebtoken::EncodingKey::from_secret(b"k"),
    )
    .unwrap();
    let bo = Caller {
        principal_id: "p2".into(),
        token,
    };

    let body = register(&app, &bo).await;
    assert_eq!(body["email"], "bo@corp.example");
}

#[tokio::test]
async fn dev_fallbacks_fill_absent_headers() {
    let config = common::test_config();
    let identity = IdentityResolver::new(
        &config.identity,
        Some(common::token("Dev", "dev@localhost")),
        Some("dev-principal".into()),
        None,
    )
    .unwrap();
    let app = common::app_with_identity(config, identity);

    let req = Request::builder()
        .method("POST")
        .uri("/api/users/")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["principal_id"], "dev-principal");
    assert_eq!(body["name"], "Dev");
}

#[tokio::test]
async fn hs256_mode_rejects_wrong_signature() {
    let mut config = common::test_config();
    config.identity.verification.mode = VerificationMode::Hs256;
    let identity = IdentityResolver::new(&config.identity, None, None, Some("right")).unwrap();
    let app = common::app_with_identity(config, identity);

    let forged = Caller::new("p1", "Ann", "ann@x.com");
    let (status, _) = send(&app.router, forged.post_empty("/api/users/")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "name": "Ann", "email": "ann@x.com" }),
        &jsonwebtoken::EncodingKey::from_secret(b"right"),
    )
    .unwrap();
    let signed = Caller {
        principal_id: "p1".into(),
        token,
    };
    let (status, _) = send(&app.router, signed.post_empty("/api/users/")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn healthz_needs_no_identity() {
    let app = app();
    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
