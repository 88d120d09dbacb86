// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token endpoints
//!
//! `POST /api/v1.0/tokens` and `POST /api/v1.0/tokens/verify` require an
//! admin session. The issuer's public keys are published without
//! authentication at `GET /.well-known/issuer.jwks`.

use std::sync::Arc;

use log::info;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::guards::AdminUser;
use crate::auth::AuthError;
use crate::token::{IssuerKeys, TokenEngine, TokenProfile, TokenRequest, VerifiedToken};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedToken {
    pub token: String,
    pub profile: TokenProfile,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

#[post("/tokens", data = "<body>")]
pub async fn create_token(
    admin: Result<AdminUser, AuthError>,
    body: Json<TokenRequest>,
    engine: &State<Arc<TokenEngine>>,
) -> Result<Json<CreatedToken>, AuthError> {
    let AdminUser(identity) = admin?;
    let request = body.into_inner();
    let token = engine.create(&request)?;
    info!(
        "'{}' issued a {} token for subject {:?}",
        identity.user, request.profile, request.subject
    );
    Ok(Json(CreatedToken {
        token,
        profile: request.profile,
    }))
}

#[post("/tokens/verify", data = "<body>")]
pub async fn verify_token(
    admin: Result<AdminUser, AuthError>,
    body: Json<VerifyRequest>,
    engine: &State<Arc<TokenEngine>>,
) -> Result<Json<VerifiedToken>, AuthError> {
    admin?;
    Ok(Json(engine.verify(&body.token)?))
}

#[get("/.well-known/issuer.jwks")]
pub async fn jwks(keys: &State<Arc<IssuerKeys>>) -> Json<Value> {
    Json(keys.jwks())
}
