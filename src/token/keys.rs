// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Issuer signing key
//!
//! Sessions and issued tokens are signed with a single EC P-256 key (ES256).
//! The key is stored as PKCS#8 PEM, generated on first start when absent,
//! and its public half is published as a JWK set.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use log::{debug, info};
use rcgen::{KeyPair, PKCS_ECDSA_P256_SHA256};
use serde_json::{json, Value};

use crate::config::IssuerConfig;

/// Signing algorithm used for every session and token
pub const ISSUER_ALGORITHM: Algorithm = Algorithm::ES256;

/// The issuer's EC key pair in the forms `jsonwebtoken` needs.
pub struct IssuerKeys {
    pem: String,
    kid: String,
    x: String,
    y: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for IssuerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerKeys")
            .field("algorithm", &ISSUER_ALGORITHM)
            .field("kid", &self.kid)
            .field("encoding_key", &"<EncodingKey>")
            .field("decoding_key", &"<DecodingKey>")
            .finish()
    }
}

impl IssuerKeys {
    /// Generate a fresh P-256 key pair
    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| anyhow!("Failed to generate EC key: {}", e))?;
        Self::from_key_pair(&key_pair)
    }

    /// Load a PKCS#8 PEM encoded P-256 private key
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key_pair =
            KeyPair::from_pem(pem).map_err(|e| anyhow!("Failed to parse EC private key: {}", e))?;
        Self::from_key_pair(&key_pair)
    }

    /// Load the key at `path`, or generate one and save it there (mode 0600).
    pub fn load_or_generate<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Loading issuer key from {:?}", path);
            let pem = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read issuer key {:?}", path))?;
            return Self::from_pem(&pem).with_context(|| format!("Invalid issuer key {:?}", path));
        }

        info!("Issuer key {:?} not found, generating a new one", path);
        let keys = Self::generate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }
        write_private(path, keys.pem.as_bytes())
            .with_context(|| format!("Failed to save issuer key to {:?}", path))?;
        Ok(keys)
    }

    /// Inline base64 key when configured, otherwise the key file.
    pub fn from_config(config: &IssuerConfig) -> Result<Self> {
        match &config.private_key {
            Some(encoded) => {
                let pem = BASE64_STANDARD
                    .decode(encoded)
                    .context("Issuer private key is not valid base64")?;
                let pem = String::from_utf8(pem).context("Issuer private key is not UTF-8")?;
                Self::from_pem(&pem)
            }
            None => Self::load_or_generate(&config.key_file),
        }
    }

    fn from_key_pair(key_pair: &KeyPair) -> Result<Self> {
        if !key_pair.is_compatible(&PKCS_ECDSA_P256_SHA256) {
            return Err(anyhow!("Issuer key must be an EC P-256 key"));
        }

        // Uncompressed SEC1 point: 0x04 || x || y
        let raw = key_pair.public_key_raw();
        if raw.len() != 65 || raw[0] != 0x04 {
            return Err(anyhow!("Unexpected EC public key encoding"));
        }
        let x = BASE64_URL_SAFE_NO_PAD.encode(&raw[1..33]);
        let y = BASE64_URL_SAFE_NO_PAD.encode(&raw[33..65]);
        let kid = x.chars().take(16).collect();

        let pem = key_pair.serialize_pem();
        let encoding_key = EncodingKey::from_ec_pem(pem.as_bytes())?;
        let decoding_key = DecodingKey::from_ec_components(&x, &y)?;

        Ok(Self {
            pem,
            kid,
            x,
            y,
            encoding_key,
            decoding_key,
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Key identifier placed in token headers
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn private_key_pem(&self) -> &str {
        &self.pem
    }

    /// Public key as a JWK
    pub fn public_jwk(&self) -> Value {
        json!({
            "kty": "EC",
            "crv": "P-256",
            "alg": "ES256",
            "use": "sig",
            "kid": self.kid,
            "x": self.x,
            "y": self.y,
        })
    }

    /// Public key as a JWK set
    pub fn jwks(&self) -> Value {
        json!({ "keys": [self.public_jwk()] })
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)
}
