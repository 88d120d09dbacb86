// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use log::error;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde_json::json;
use thiserror::Error;

use crate::credentials::StoreError;
use crate::token::TokenError;

/// Message sent to clients for server-side failures
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Authentication and authorization failures, with their HTTP mapping.
///
/// The `Display` text of client-facing variants is exactly the message put
/// in the `{"error": ...}` response body.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User is required")]
    MissingUser,

    #[error("Password is required")]
    MissingPassword,

    #[error("Invalid login code")]
    InvalidCode,

    #[error("Password and user didn't match")]
    CredentialMismatch,

    #[error("Authentication required to perform this operation")]
    AuthenticationRequired,

    #[error("Login required to view this page")]
    LoginRequired,

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("Credential store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Session signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::MissingUser | AuthError::MissingPassword => Status::BadRequest,
            AuthError::InvalidCode
            | AuthError::CredentialMismatch
            | AuthError::AuthenticationRequired
            | AuthError::LoginRequired => Status::Unauthorized,
            AuthError::Forbidden => Status::Forbidden,
            AuthError::Token(e) if e.is_verification_failure() => Status::Unauthorized,
            AuthError::Token(TokenError::Signing(_)) => Status::InternalServerError,
            AuthError::Token(_) => Status::BadRequest,
            AuthError::Store(_) | AuthError::Signing(_) | AuthError::Internal(_) => {
                Status::InternalServerError
            }
        }
    }

    /// Text for the response body. Server-side details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Signing(_) | AuthError::Internal(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            AuthError::Token(e) if e.is_verification_failure() => "Invalid token".to_string(),
            AuthError::Token(TokenError::Signing(_)) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl<'r> Responder<'r, 'static> for AuthError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            error!("{} {}: {}", request.method(), request.uri(), self);
        }
        (status, Json(json!({ "error": self.public_message() }))).respond_to(request)
    }
}
