// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web UI session tokens
//!
//! Sessions are not stored on the server. A session is an ES256 JWT held in
//! the `login` cookie; a request is authenticated when the cookie carries a
//! token signed by the issuer key, addressed to [`SESSION_AUDIENCE`] and not
//! yet expired.

use std::fmt;

use jsonwebtoken::{decode, encode, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;
use crate::token::keys::{IssuerKeys, ISSUER_ALGORITHM};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "login";

/// Path the session cookie is scoped to
pub const SESSION_COOKIE_PATH: &str = "/api/v1.0";

/// Audience of session tokens, never used for bearer tokens
pub const SESSION_AUDIENCE: &str = "origin-web-ui";

/// The bootstrap administrator identity
pub const BOOTSTRAP_USER: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user behind a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    role: Role,
    iss: String,
    aud: String,
    iat: i64,
    nbf: i64,
    exp: i64,
    jti: String,
}

/// Sign a session for `identity`, valid for `lifetime` seconds from `now`.
pub fn encode_session(
    identity: &Identity,
    issuer: &str,
    lifetime: i64,
    keys: &IssuerKeys,
    now: i64,
) -> Result<String, AuthError> {
    let exp = now
        .checked_add(lifetime)
        .ok_or_else(|| AuthError::Signing(format!("session lifetime {} overflows", lifetime)))?;
    let claims = SessionClaims {
        sub: identity.user.clone(),
        role: identity.role,
        iss: issuer.to_string(),
        aud: SESSION_AUDIENCE.to_string(),
        iat: now,
        nbf: now,
        exp,
        jti: Uuid::new_v4().to_string(),
    };
    let mut header = Header::new(ISSUER_ALGORITHM);
    header.kid = Some(keys.kid().to_string());
    encode(&header, &claims, keys.encoding_key()).map_err(|e| AuthError::Signing(e.to_string()))
}

/// Identity carried by `token` if it is a valid session at `now`.
pub fn decode_session(token: &str, keys: &IssuerKeys, now: i64) -> Option<Identity> {
    let mut validation = Validation::new(ISSUER_ALGORITHM);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.set_audience(&[SESSION_AUDIENCE]);
    validation.set_required_spec_claims(&["exp", "sub", "aud"]);

    let claims = match decode::<SessionClaims>(token, keys.decoding_key(), &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!("Rejected session token: {}", e);
            return None;
        }
    };
    if claims.exp <= now || claims.nbf > now || claims.sub.is_empty() {
        debug!("Session for '{}' is outside its validity window", claims.sub);
        return None;
    }
    Some(Identity {
        user: claims.sub,
        role: claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{create_token, TokenProfile, TokenRequest};

    fn identity(user: &str, role: Role) -> Identity {
        Identity {
            user: user.to_string(),
            role,
        }
    }

    #[test]
    fn test_session_round_trip_and_expiry() {
        let keys = IssuerKeys::generate().unwrap();
        let now = 1_700_000_000;
        let token = encode_session(
            &identity("alice", Role::User),
            "https://origin.example.org",
            60,
            &keys,
            now,
        )
        .unwrap();

        assert_eq!(
            decode_session(&token, &keys, now + 59),
            Some(identity("alice", Role::User))
        );
        assert_eq!(decode_session(&token, &keys, now + 60), None);
    }

    #[test]
    fn test_foreign_key_and_garbage_rejected() {
        let keys = IssuerKeys::generate().unwrap();
        let other = IssuerKeys::generate().unwrap();
        let now = chrono::Utc::now().timestamp();
        let token = encode_session(
            &identity("admin", Role::Admin),
            "https://origin.example.org",
            60,
            &keys,
            now,
        )
        .unwrap();
        assert_eq!(decode_session(&token, &other, now), None);
        assert_eq!(decode_session("garbage", &keys, now), None);
    }

    #[test]
    fn test_bearer_token_is_not_a_session() {
        let keys = IssuerKeys::generate().unwrap();
        let request = TokenRequest {
            profile: TokenProfile::Generic,
            subject: "admin".to_string(),
            audience: vec!["https://storage.example.org".to_string()],
            ..Default::default()
        };
        let token = create_token(&request, Some("https://origin.example.org"), &keys).unwrap();
        assert_eq!(
            decode_session(&token, &keys, chrono::Utc::now().timestamp()),
            None
        );
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let keys = IssuerKeys::generate().unwrap();
        let result = encode_session(
            &identity("admin", Role::Admin),
            "https://origin.example.org",
            i64::MAX,
            &keys,
            1_700_000_000,
        );
        assert!(matches!(result, Err(AuthError::Signing(_))));
    }
}
