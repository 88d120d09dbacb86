// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use thiserror::Error;

/// Errors raised while building or verifying a token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing required claim '{claim}'")]
    MissingClaim { claim: &'static str },

    #[error("Invalid claim '{claim}': {reason}")]
    InvalidClaim { claim: String, reason: String },

    #[error("No issuer given and no default issuer configured")]
    MissingIssuer,

    #[error("Invalid issuer URL '{issuer}'")]
    InvalidIssuer { issuer: String },

    #[error("Token lifetime must be positive, got {lifetime}")]
    InvalidLifetime { lifetime: i64 },

    #[error("Unknown token profile '{0}'")]
    UnknownProfile(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token signature does not match the trusted key")]
    SignatureMismatch,

    #[error("Token has expired")]
    Expired,

    #[error("Token is not valid yet")]
    NotYetValid,
}

impl TokenError {
    /// Whether the error comes from verifying a presented token.
    ///
    /// These are reported to callers uniformly as an invalid token.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            TokenError::Malformed(_)
                | TokenError::UnsupportedAlgorithm(_)
                | TokenError::SignatureMismatch
                | TokenError::Expired
                | TokenError::NotYetValid
        )
    }
}
