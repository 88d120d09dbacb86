// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token profiles
//!
//! A profile decides which request fields are mandatory and which version
//! claim the signed token carries.
//!
//! | Profile   | Required                          | Version claim             |
//! |-----------|-----------------------------------|---------------------------|
//! | `generic` | subject                           | `"wlcg.ver": "1.0"`       |
//! | `scoped`  | non-empty audience and scope list | `"ver": "scitoken:2.0"`   |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::claims::TokenClaims;
use super::engine::TokenRequest;
use super::error::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenProfile {
    /// Minimal bearer token
    #[default]
    Generic,
    /// Fine-grained scope based authorization
    Scoped,
}

impl TokenProfile {
    pub const ALL: [TokenProfile; 2] = [TokenProfile::Generic, TokenProfile::Scoped];

    pub fn name(&self) -> &'static str {
        match self {
            TokenProfile::Generic => "generic",
            TokenProfile::Scoped => "scoped",
        }
    }

    /// Claim name and value identifying tokens of this profile
    pub fn version_claim(&self) -> (&'static str, &'static str) {
        match self {
            TokenProfile::Generic => ("wlcg.ver", "1.0"),
            TokenProfile::Scoped => ("ver", "scitoken:2.0"),
        }
    }

    /// Check the profile's required fields.
    pub fn validate(&self, request: &TokenRequest) -> Result<(), TokenError> {
        match self {
            TokenProfile::Generic => {
                if request.subject.is_empty() {
                    return Err(TokenError::MissingClaim { claim: "sub" });
                }
            }
            TokenProfile::Scoped => {
                if request.audience.is_empty() {
                    return Err(TokenError::MissingClaim { claim: "aud" });
                }
                if request.scope.is_empty() {
                    return Err(TokenError::MissingClaim { claim: "scope" });
                }
            }
        }
        Ok(())
    }

    /// Stamp the profile's version claim.
    pub fn decorate(&self, claims: &mut TokenClaims) {
        let (name, value) = self.version_claim();
        claims
            .extra
            .insert(name.to_string(), Value::String(value.to_string()));
    }

    /// The profile whose version claim a token carries, if any.
    pub fn detect(claims: &TokenClaims) -> Option<Self> {
        Self::ALL.into_iter().find(|profile| {
            let (name, value) = profile.version_claim();
            claims.extra.get(name).and_then(Value::as_str) == Some(value)
        })
    }
}

impl fmt::Display for TokenProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenProfile {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(TokenProfile::Generic),
            "scoped" => Ok(TokenProfile::Scoped),
            _ => Err(TokenError::UnknownProfile(s.to_string())),
        }
    }
}
