// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web server configuration

use serde::{Deserialize, Serialize};

/// Settings for the web server and web UI authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network address to bind to
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server identity reported in the `Server` header
    #[serde(default = "default_name")]
    pub name: String,

    /// Base64-encoded PEM certificate chain; TLS is enabled when both `cert` and `key` are set
    #[serde(default)]
    pub cert: Option<String>,

    /// Base64-encoded PEM private key for TLS
    #[serde(default)]
    pub key: Option<String>,

    /// Password file holding one `username:hash` entry per line
    #[serde(default = "default_ui_password_file")]
    pub ui_password_file: String,

    /// File receiving the current activation code while the rotator runs
    #[serde(default = "default_ui_activation_code_file")]
    pub ui_activation_code_file: String,

    /// Seconds between two activation code rotations
    #[serde(default = "default_activation_code_interval")]
    pub activation_code_interval: u64,

    /// Session cookie lifetime in seconds
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime: u64,

    /// Users allowed past the admin check; empty means only `admin`
    #[serde(default)]
    pub admin_users: Vec<String>,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8444
}

fn default_name() -> String {
    format!("OriginAuth/{}", env!("CARGO_PKG_VERSION"))
}

fn default_ui_password_file() -> String {
    "origin-ui-passwd".to_string()
}

fn default_ui_activation_code_file() -> String {
    "origin-ui-activation-code".to_string()
}

fn default_activation_code_interval() -> u64 {
    60
}

fn default_session_lifetime() -> u64 {
    30 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            name: default_name(),
            cert: None,
            key: None,
            ui_password_file: default_ui_password_file(),
            ui_activation_code_file: default_ui_activation_code_file(),
            activation_code_interval: default_activation_code_interval(),
            session_lifetime: default_session_lifetime(),
            admin_users: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Whether both TLS certificate and key are configured
    pub fn tls_enabled(&self) -> bool {
        self.cert.is_some() && self.key.is_some()
    }
}
