// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

#![allow(dead_code)]

use std::sync::Arc;

use origin_auth::activation::{ActivationCode, ActivationCodeSlot};
use origin_auth::auth::{AdminAuthorizer, SessionAuthenticator, SESSION_COOKIE};
use origin_auth::config::{Config, ConfigProvider, SharedConfig};
use origin_auth::credentials::CredentialStore;
use origin_auth::token::{IssuerKeys, TokenEngine};
use origin_auth::web::{build_rocket, WebServices};
use rocket::config::LogLevel;
use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const ISSUER: &str = "https://origin.example.org";

/// A Rocket client wired to fresh services in a scratch directory
pub struct TestServer {
    pub client: Client,
    pub config: SharedConfig,
    pub codes: ActivationCodeSlot,
    pub store: Arc<CredentialStore>,
    pub keys: Arc<IssuerKeys>,
    pub dir: TempDir,
}

pub async fn test_server() -> TestServer {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = Config::default();
    config.server.ui_password_file = dir.path().join("passwd").to_string_lossy().into_owned();
    config.issuer.url = Some(ISSUER.to_string());
    let config = SharedConfig::new(config);
    let provider: Arc<dyn ConfigProvider> = Arc::new(config.clone());

    let keys = Arc::new(IssuerKeys::generate().expect("issuer key"));
    let store = Arc::new(CredentialStore::new(dir.path().join("passwd")));
    let codes = ActivationCodeSlot::new();
    let services = WebServices {
        authenticator: Arc::new(SessionAuthenticator::new(
            store.clone(),
            codes.clone(),
            keys.clone(),
            provider.clone(),
        )),
        authorizer: Arc::new(AdminAuthorizer::new(provider.clone())),
        tokens: Arc::new(TokenEngine::new(keys.clone(), provider)),
        keys: keys.clone(),
    };

    let figment = rocket::Config::figment().merge(("log_level", LogLevel::Off));
    let client = Client::untracked(build_rocket(figment, services))
        .await
        .expect("valid rocket instance");

    TestServer {
        client,
        config,
        codes,
        store,
        keys,
        dir,
    }
}

impl TestServer {
    /// Publish a new activation code and return it
    pub fn publish_code(&self) -> String {
        let code = ActivationCode::generate();
        self.codes.publish(code.clone());
        code.value().to_string()
    }

    /// Log in with a password and return the session cookie value
    pub async fn login(&self, user: &str, password: &str) -> String {
        let response = self
            .client
            .post("/api/v1.0/auth/login")
            .json(&json!({ "user": user, "password": password }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        session_cookie(&response).expect("login cookie")
    }

    /// Log in with the current activation code and return the session cookie value
    pub async fn login_with_code(&self) -> String {
        let code = self.publish_code();
        let response = self
            .client
            .post("/api/v1.0/auth/initLogin")
            .json(&json!({ "code": code }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        session_cookie(&response).expect("login cookie")
    }
}

pub fn session_cookie(response: &LocalResponse<'_>) -> Option<String> {
    response
        .cookies()
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

pub fn login_cookie(value: &str) -> Cookie<'static> {
    Cookie::new(SESSION_COOKIE, value.to_string())
}

pub async fn body_json(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.expect("JSON body")
}
