// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use rocket::figment::Figment;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{catch, catchers, routes, Build, Request, Rocket};
use serde_json::{json, Value};

use super::{auth_api, token_api};
use crate::auth::{AdminAuthorizer, SessionAuthenticator};
use crate::token::{IssuerKeys, TokenEngine};

/// Prefix of every API route
pub const API_BASE: &str = "/api/v1.0";

/// Shared services handed to Rocket as managed state.
#[derive(Clone)]
pub struct WebServices {
    pub authenticator: Arc<SessionAuthenticator>,
    pub authorizer: Arc<AdminAuthorizer>,
    pub tokens: Arc<TokenEngine>,
    pub keys: Arc<IssuerKeys>,
}

#[catch(default)]
fn default_catcher(status: Status, _request: &Request<'_>) -> (Status, Json<Value>) {
    let message = status.reason().unwrap_or("Unknown error");
    (status, Json(json!({ "error": message })))
}

/// Build a Rocket instance serving the authentication and token API.
pub fn build_rocket(figment: Figment, services: WebServices) -> Rocket<Build> {
    rocket::custom(figment)
        .mount(
            API_BASE,
            routes![
                auth_api::init_login,
                auth_api::login,
                auth_api::reset_login,
                auth_api::logout,
                auth_api::whoami,
                token_api::create_token,
                token_api::verify_token,
            ],
        )
        .mount("/", routes![token_api::jwks])
        .register("/", catchers![default_catcher])
        .manage(services.authenticator)
        .manage(services.authorizer)
        .manage(services.tokens)
        .manage(services.keys)
}
