// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Login endpoints mounted under `/api/v1.0/auth`
//!
//! | Route                  | Body                   | Success                      |
//! |------------------------|------------------------|------------------------------|
//! | `POST /initLogin`      | `{"code"}`             | `{"msg":"Success"}` + cookie |
//! | `POST /login`          | `{"user","password"}`  | `{"msg":"Success"}` + cookie |
//! | `POST /resetLogin`     | `{"password"}`         | `{"msg":"Success"}`          |
//! | `POST /logout`         |                        | `{"msg":"Success"}`          |
//! | `GET /whoami`          |                        | `{authenticated,role,user}`  |

use std::sync::Arc;

use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, SessionAuthenticator, WhoAmI, SESSION_COOKIE};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessMessage {
    pub msg: String,
}

impl SuccessMessage {
    pub fn success() -> Json<Self> {
        Json(Self {
            msg: "Success".to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InitLoginRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetLoginRequest {
    #[serde(default)]
    pub password: String,
}

fn session_token<'a>(cookies: &'a CookieJar<'_>) -> Option<&'a str> {
    cookies.get(SESSION_COOKIE).map(|c| c.value())
}

#[post("/auth/initLogin", data = "<body>")]
pub async fn init_login(
    body: Json<InitLoginRequest>,
    cookies: &CookieJar<'_>,
    auth: &State<Arc<SessionAuthenticator>>,
) -> Result<Json<SuccessMessage>, AuthError> {
    let session = auth.login_with_code(&body.code).await?;
    cookies.add(auth.session_cookie(&session));
    Ok(SuccessMessage::success())
}

#[post("/auth/login", data = "<body>")]
pub async fn login(
    body: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    auth: &State<Arc<SessionAuthenticator>>,
) -> Result<Json<SuccessMessage>, AuthError> {
    let session = auth.login_with_password(&body.user, &body.password).await?;
    cookies.add(auth.session_cookie(&session));
    Ok(SuccessMessage::success())
}

#[post("/auth/resetLogin", data = "<body>")]
pub async fn reset_login(
    body: Json<ResetLoginRequest>,
    cookies: &CookieJar<'_>,
    auth: &State<Arc<SessionAuthenticator>>,
) -> Result<Json<SuccessMessage>, AuthError> {
    auth.reset_password(session_token(cookies), &body.password)
        .await?;
    Ok(SuccessMessage::success())
}

#[post("/auth/logout")]
pub async fn logout(
    cookies: &CookieJar<'_>,
    auth: &State<Arc<SessionAuthenticator>>,
) -> Json<SuccessMessage> {
    cookies.remove(auth.removal_cookie());
    SuccessMessage::success()
}

#[get("/auth/whoami")]
pub async fn whoami(
    cookies: &CookieJar<'_>,
    auth: &State<Arc<SessionAuthenticator>>,
) -> Json<WhoAmI> {
    Json(auth.whoami(session_token(cookies)))
}
