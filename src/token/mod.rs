// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Bearer token issuance and verification
//!
//! Tokens are ES256 JWTs built under one of two [`TokenProfile`]s and signed
//! with the same [`IssuerKeys`] used for web sessions.

pub mod claims;
pub mod engine;
pub mod error;
pub mod keys;
pub mod profile;

pub use claims::TokenClaims;
pub use engine::{
    create_token, create_token_at, verify_token, verify_token_at, TokenEngine, TokenRequest,
    VerifiedToken, DEFAULT_TOKEN_LIFETIME,
};
pub use error::TokenError;
pub use keys::IssuerKeys;
pub use profile::TokenProfile;
