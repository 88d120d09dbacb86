// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

mod common;

use common::{body_json, login_cookie, session_cookie, test_server};
use rocket::http::{ContentType, Status};
use serde_json::json;

#[tokio::test]
async fn test_code_login_accepts_only_current_code() {
    let server = test_server().await;
    let old_code = server.publish_code();
    let code = server.publish_code();

    for rejected in [old_code.as_str(), "20"] {
        if rejected == code {
            continue;
        }
        let response = server
            .client
            .post("/api/v1.0/auth/initLogin")
            .json(&json!({ "code": rejected }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        assert!(session_cookie(&response).is_none());
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid login code" })
        );
    }

    let response = server
        .client
        .post("/api/v1.0/auth/initLogin")
        .json(&json!({ "code": code }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let cookie = response.cookies().get("login").expect("login cookie").clone();
    assert_eq!(cookie.path(), Some("/api/v1.0"));
    assert_eq!(cookie.http_only(), Some(true));
    assert!(!cookie.value().is_empty());
    assert_eq!(body_json(response).await, json!({ "msg": "Success" }));

    // The code is single use once somebody has logged in
    let response = server
        .client
        .post("/api/v1.0/auth/initLogin")
        .json(&json!({ "code": code }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_code_login_refused_when_password_configured() {
    let server = test_server().await;
    server.store.set_password("admin", "password").await.unwrap();
    let code = server.publish_code();

    let response = server
        .client
        .post("/api/v1.0/auth/initLogin")
        .json(&json!({ "code": code }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert!(session_cookie(&response).is_none());
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid login code" })
    );

    server.login("admin", "password").await;
}

#[tokio::test]
async fn test_code_login_before_any_code_is_rejected() {
    let server = test_server().await;
    let response = server
        .client
        .post("/api/v1.0/auth/initLogin")
        .json(&json!({ "code": "" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_code_login_is_admin() {
    let server = test_server().await;
    let cookie = server.login_with_code().await;

    let response = server
        .client
        .get("/api/v1.0/auth/whoami")
        .cookie(login_cookie(&cookie))
        .dispatch()
        .await;
    assert_eq!(
        body_json(response).await,
        json!({ "authenticated": true, "role": "admin", "user": "admin" })
    );
}

#[tokio::test]
async fn test_password_login() {
    let server = test_server().await;
    server.store.set_password("user", "password").await.unwrap();

    let response = server
        .client
        .post("/api/v1.0/auth/login")
        .json(&json!({ "user": "user", "password": "password" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert!(session_cookie(&response).is_some());
    assert_eq!(body_json(response).await, json!({ "msg": "Success" }));

    let cases = [
        (json!({ "password": "password" }), Status::BadRequest, "User is required"),
        (json!({ "user": "user" }), Status::BadRequest, "Password is required"),
        (
            json!({ "user": "user", "password": "wrong" }),
            Status::Unauthorized,
            "Password and user didn't match",
        ),
        (
            json!({ "user": "nobody", "password": "password" }),
            Status::Unauthorized,
            "Password and user didn't match",
        ),
    ];
    for (body, status, message) in cases {
        let response = server
            .client
            .post("/api/v1.0/auth/login")
            .json(&body)
            .dispatch()
            .await;
        assert_eq!(response.status(), status, "body: {}", body);
        assert!(session_cookie(&response).is_none());
        assert_eq!(body_json(response).await, json!({ "error": message }));
    }
}

#[tokio::test]
async fn test_plaintext_password_line_never_matches() {
    let server = test_server().await;
    std::fs::write(server.store.path(), "admin:password\n").unwrap();

    let response = server
        .client
        .post("/api/v1.0/auth/login")
        .json(&json!({ "user": "admin", "password": "password" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_corrupted_store_is_internal_error() {
    let server = test_server().await;
    std::fs::write(server.store.path(), "no separator here\n").unwrap();

    let response = server
        .client
        .post("/api/v1.0/auth/login")
        .json(&json!({ "user": "admin", "password": "password" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Internal server error" })
    );
}

#[tokio::test]
async fn test_reset_password() {
    let server = test_server().await;
    server.store.set_password("user", "password").await.unwrap();
    let cookie = server.login("user", "password").await;

    for _ in 0..2 {
        let response = server
            .client
            .post("/api/v1.0/auth/resetLogin")
            .cookie(login_cookie(&cookie))
            .json(&json!({ "password": "newpassword" }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(body_json(response).await, json!({ "msg": "Success" }));
    }

    server.login("user", "newpassword").await;
    let response = server
        .client
        .post("/api/v1.0/auth/login")
        .json(&json!({ "user": "user", "password": "password" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[tokio::test]
async fn test_reset_password_requires_session() {
    let server = test_server().await;

    for cookie in [None, Some("not-a-token")] {
        let mut request = server
            .client
            .post("/api/v1.0/auth/resetLogin")
            .json(&json!({ "password": "newpassword" }));
        if let Some(value) = cookie {
            request = request.cookie(login_cookie(value));
        }
        let response = request.dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Authentication required to perform this operation" })
        );
    }
}

#[tokio::test]
async fn test_code_session_can_set_admin_password() {
    let server = test_server().await;
    let cookie = server.login_with_code().await;

    let response = server
        .client
        .post("/api/v1.0/auth/resetLogin")
        .cookie(login_cookie(&cookie))
        .json(&json!({ "password": "first-password" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert!(server.store.verify("admin", "first-password").await.unwrap());
}

#[tokio::test]
async fn test_whoami() {
    let server = test_server().await;

    let response = server.client.get("/api/v1.0/auth/whoami").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        body_json(response).await,
        json!({ "authenticated": false, "role": "", "user": "" })
    );

    server.store.set_password("user", "password").await.unwrap();
    let cookie = server.login("user", "password").await;
    let response = server
        .client
        .get("/api/v1.0/auth/whoami")
        .cookie(login_cookie(&cookie))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        body_json(response).await,
        json!({ "authenticated": true, "role": "user", "user": "user" })
    );
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let server = test_server().await;
    let cookie = server.login_with_code().await;

    let response = server
        .client
        .post("/api/v1.0/auth/logout")
        .cookie(login_cookie(&cookie))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let removal = response.cookies().get("login").expect("removal cookie");
    assert!(removal.value().is_empty());
}

#[tokio::test]
async fn test_malformed_body_gets_json_error() {
    let server = test_server().await;
    let response = server
        .client
        .post("/api/v1.0/auth/login")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch()
        .await;
    assert!(response.status().code >= 400 && response.status().code < 500);
    let body = body_json(response).await;
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn test_unknown_route_gets_json_404() {
    let server = test_server().await;
    let response = server.client.get("/api/v1.0/nope").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(body_json(response).await, json!({ "error": "Not Found" }));
}
