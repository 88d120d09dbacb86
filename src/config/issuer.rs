// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Issuer and token engine configuration

use serde::{Deserialize, Serialize};

use crate::token::TokenProfile;

/// Issuer identity and signing key location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Issuer URL stamped into sessions and tokens.
    ///
    /// When unset, `https://<server.address>:<server.port>` is used.
    #[serde(default)]
    pub url: Option<String>,

    /// PKCS#8 PEM file holding the EC P-256 signing key; generated when missing
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Base64-encoded PKCS#8 PEM signing key, takes precedence over `key_file`
    #[serde(default)]
    pub private_key: Option<String>,
}

fn default_key_file() -> String {
    "issuer.pem".to_string()
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_file: default_key_file(),
            private_key: None,
        }
    }
}

/// Defaults applied by the token engine when a request leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    /// Token lifetime in seconds
    #[serde(default = "default_lifetime")]
    pub default_lifetime: u64,

    /// Profile used when none is requested
    #[serde(default)]
    pub default_profile: TokenProfile,
}

fn default_lifetime() -> u64 {
    1200
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            default_lifetime: default_lifetime(),
            default_profile: TokenProfile::default(),
        }
    }
}
