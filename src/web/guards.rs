// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket request guards for session cookies
//!
//! - [`SessionIdentity`] resolves the `login` cookie to an identity, or none
//! - [`AdminUser`] additionally requires the admin check to pass
//!
//! Handlers take `Result<AdminUser, AuthError>` so that a rejection is
//! rendered by [`AuthError`]'s responder with its JSON body.

use std::sync::Arc;

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;

use crate::auth::{AdminAuthorizer, AuthError, Identity, SessionAuthenticator, SESSION_COOKIE};

/// The session identity of the request, if any. Never fails for a missing
/// or invalid cookie.
pub struct SessionIdentity(pub Option<Identity>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionIdentity {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let authenticator = match request.guard::<&State<Arc<SessionAuthenticator>>>().await {
            Outcome::Success(state) => state,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    AuthError::Internal("Missing authenticator state".to_string()),
                ))
            }
        };

        let token = request.cookies().get(SESSION_COOKIE).map(|c| c.value());
        Outcome::Success(SessionIdentity(authenticator.validate_session(token)))
    }
}

/// A session that passed the admin check.
pub struct AdminUser(pub Identity);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let identity = match request.guard::<SessionIdentity>().await {
            Outcome::Success(SessionIdentity(identity)) => identity,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        let authorizer = match request.guard::<&State<Arc<AdminAuthorizer>>>().await {
            Outcome::Success(state) => state,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    AuthError::Internal("Missing authorizer state".to_string()),
                ))
            }
        };

        match authorizer.authorize(identity.as_ref()) {
            Ok(()) => match identity {
                Some(identity) => Outcome::Success(AdminUser(identity)),
                None => Outcome::Error((Status::Unauthorized, AuthError::LoginRequired)),
            },
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}
