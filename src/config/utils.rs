// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;

use super::Config;

/// Longest accepted web UI session, one year.
pub const MAX_SESSION_LIFETIME: u64 = 365 * 24 * 3600;

/// Longest accepted activation code rotation interval, one day.
pub const MAX_ACTIVATION_CODE_INTERVAL: u64 = 24 * 3600;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./origin_auth --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Accepts any IPv4 or IPv6 address plus `localhost`.
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    addr == "localhost"
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **TLS**: a certificate requires a key (and vice versa), both valid base64
/// - **Address**: must be an IP address or `localhost`
/// - **Issuer**: the URL, when set, must be an absolute `http`/`https` URL with a host;
///   an inline private key must be valid base64
/// - **Durations**: session lifetime, activation code interval and default token lifetime are positive
/// - **Admin users**: names are non-empty and contain neither `:` nor whitespace
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let server = &config.server;
    match (&server.cert, &server.key) {
        (Some(cert), Some(key)) => {
            base64::engine::general_purpose::STANDARD
                .decode(cert)
                .context("SSL certificate is not valid base64")?;
            base64::engine::general_purpose::STANDARD
                .decode(key)
                .context("SSL key is not valid base64")?;
        }
        (Some(_), None) => anyhow::bail!("SSL certificate provided without a key"),
        (None, Some(_)) => anyhow::bail!("SSL key provided without a certificate"),
        (None, None) => {}
    }

    if !is_valid_ip_address(&server.address) {
        anyhow::bail!("Invalid address: {}", server.address);
    }

    if server.session_lifetime == 0 || server.session_lifetime > MAX_SESSION_LIFETIME {
        anyhow::bail!(
            "Session lifetime must be between 1 and {} seconds",
            MAX_SESSION_LIFETIME
        );
    }
    if server.activation_code_interval == 0
        || server.activation_code_interval > MAX_ACTIVATION_CODE_INTERVAL
    {
        anyhow::bail!(
            "Activation code interval must be between 1 and {} seconds",
            MAX_ACTIVATION_CODE_INTERVAL
        );
    }
    if config.tokens.default_lifetime == 0 {
        anyhow::bail!("Default token lifetime must be positive");
    }

    for user in &server.admin_users {
        if user.is_empty() || user.contains(':') || user.chars().any(char::is_whitespace) {
            anyhow::bail!("Invalid admin user name: {:?}", user);
        }
    }

    if let Some(url) = &config.issuer.url {
        validate_issuer_url(url)?;
    }

    if let Some(key) = &config.issuer.private_key {
        base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("Issuer private key is not valid base64")?;
    }

    Ok(())
}

/// An issuer must be an absolute `http` or `https` URL with a host.
pub fn validate_issuer_url(issuer: &str) -> Result<url::Url> {
    let url = url::Url::parse(issuer).with_context(|| format!("Invalid issuer URL: {}", issuer))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        anyhow::bail!("Issuer URL must be an http(s) URL with a host: {}", issuer);
    }
    Ok(url)
}
