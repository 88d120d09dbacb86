// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token creation and verification
//!
//! [`create_token`] validates a [`TokenRequest`] against its profile, then
//! signs it with the issuer key. [`verify_token`] checks the signature and
//! validity window of a presented token. Both are free functions over an
//! explicit key so the CLI can use them without a running server;
//! [`TokenEngine`] binds them to the server's key and configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, DecodingKey, Header, Validation};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::claims::TokenClaims;
use super::error::TokenError;
use super::keys::{IssuerKeys, ISSUER_ALGORITHM};
use super::profile::TokenProfile;
use crate::config::{params, ConfigProvider};
use crate::config::utils::validate_issuer_url;

/// Lifetime applied when a request does not set one
pub const DEFAULT_TOKEN_LIFETIME: i64 = 1200;

/// Claim names a caller may not set through custom claims
pub const RESERVED_CLAIMS: &[&str] = &[
    "iss", "sub", "aud", "exp", "nbf", "iat", "jti", "scope", "ver", "wlcg.ver",
];

/// Everything needed to build one token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub profile: TokenProfile,
    /// Issuer URL; the configured issuer is used when absent
    #[serde(default)]
    pub issuer: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub lifetime: Option<i64>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub audience: Vec<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub claims: BTreeMap<String, String>,
}

/// A verified token and the profile it declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedToken {
    pub profile: Option<TokenProfile>,
    pub claims: TokenClaims,
}

/// Validate `request` and sign it, with `default_issuer` as issuer fallback.
pub fn create_token(
    request: &TokenRequest,
    default_issuer: Option<&str>,
    keys: &IssuerKeys,
) -> Result<String, TokenError> {
    create_token_at(request, default_issuer, keys, chrono::Utc::now().timestamp())
}

/// [`create_token`] with an explicit issue time.
pub fn create_token_at(
    request: &TokenRequest,
    default_issuer: Option<&str>,
    keys: &IssuerKeys,
    now: i64,
) -> Result<String, TokenError> {
    let lifetime = request.lifetime.unwrap_or(DEFAULT_TOKEN_LIFETIME);
    if lifetime <= 0 {
        return Err(TokenError::InvalidLifetime { lifetime });
    }

    request.profile.validate(request)?;
    validate_values(request)?;
    let issuer = resolve_issuer(request.issuer.as_deref(), default_issuer)?;

    let mut claims = TokenClaims {
        iss: issuer,
        sub: Some(request.subject.clone()).filter(|s| !s.is_empty()),
        aud: request.audience.clone(),
        scope: Some(request.scope.join(" ")).filter(|s| !s.is_empty()),
        iat: now,
        nbf: now,
        exp: now
            .checked_add(lifetime)
            .ok_or(TokenError::InvalidLifetime { lifetime })?,
        jti: Uuid::new_v4().to_string(),
        extra: request
            .claims
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    };
    request.profile.decorate(&mut claims);

    let mut header = Header::new(ISSUER_ALGORITHM);
    header.kid = Some(keys.kid().to_string());

    encode(&header, &claims, keys.encoding_key()).map_err(|e| {
        error!("Token signing failed: {}", e);
        TokenError::Signing(e.to_string())
    })
}

/// Verify signature and validity window of `token` against `key`.
pub fn verify_token(token: &str, key: &DecodingKey) -> Result<VerifiedToken, TokenError> {
    verify_token_at(token, key, chrono::Utc::now().timestamp())
}

/// [`verify_token`] evaluated at `now`.
pub fn verify_token_at(
    token: &str,
    key: &DecodingKey,
    now: i64,
) -> Result<VerifiedToken, TokenError> {
    let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
    if header.alg != ISSUER_ALGORITHM {
        return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
    }

    let mut validation = Validation::new(ISSUER_ALGORITHM);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<TokenClaims>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnsupportedAlgorithm(e.to_string())
        }
        _ => TokenError::Malformed(e.to_string()),
    })?;

    let claims = data.claims;
    if claims.exp <= now {
        debug!("Token {} expired at {}", claims.jti, claims.exp);
        return Err(TokenError::Expired);
    }
    if claims.nbf > now {
        return Err(TokenError::NotYetValid);
    }

    Ok(VerifiedToken {
        profile: TokenProfile::detect(&claims),
        claims,
    })
}

fn validate_values(request: &TokenRequest) -> Result<(), TokenError> {
    for aud in &request.audience {
        if aud.trim().is_empty() {
            return Err(TokenError::InvalidClaim {
                claim: "aud".to_string(),
                reason: "audience values must not be empty".to_string(),
            });
        }
    }
    for scope in &request.scope {
        if scope.is_empty() || scope.chars().any(char::is_whitespace) {
            return Err(TokenError::InvalidClaim {
                claim: "scope".to_string(),
                reason: format!("invalid scope value {:?}", scope),
            });
        }
    }
    for name in request.claims.keys() {
        if name.is_empty() {
            return Err(TokenError::InvalidClaim {
                claim: name.clone(),
                reason: "claim name must not be empty".to_string(),
            });
        }
        if RESERVED_CLAIMS.contains(&name.as_str()) {
            return Err(TokenError::InvalidClaim {
                claim: name.clone(),
                reason: "reserved claim cannot be set directly".to_string(),
            });
        }
    }
    Ok(())
}

fn resolve_issuer(requested: Option<&str>, fallback: Option<&str>) -> Result<String, TokenError> {
    let issuer = requested
        .filter(|s| !s.is_empty())
        .or(fallback.filter(|s| !s.is_empty()))
        .ok_or(TokenError::MissingIssuer)?;
    validate_issuer_url(issuer).map_err(|_| TokenError::InvalidIssuer {
        issuer: issuer.to_string(),
    })?;
    Ok(issuer.to_string())
}

/// The token engine bound to the issuer key and live configuration.
pub struct TokenEngine {
    keys: Arc<IssuerKeys>,
    config: Arc<dyn ConfigProvider>,
}

impl TokenEngine {
    pub fn new(keys: Arc<IssuerKeys>, config: Arc<dyn ConfigProvider>) -> Self {
        Self { keys, config }
    }

    /// Sign `request`, filling lifetime and issuer from configuration when absent.
    pub fn create(&self, request: &TokenRequest) -> Result<String, TokenError> {
        let mut request = request.clone();
        if request.lifetime.is_none() {
            request.lifetime = self.config.get_int(params::TOKEN_DEFAULT_LIFETIME);
        }
        let default_issuer = self.config.get_string(params::ISSUER_URL);
        create_token(&request, default_issuer.as_deref(), &self.keys)
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        verify_token(token, self.keys.decoding_key())
    }
}
