// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the origin authentication service
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `server`: web server binding, UI credential files, session and activation settings
//! - `issuer`: issuer URL and signing key location
//! - `tokens`: defaults for the token engine
//!
//! Components never hold on to a [`Config`] value directly. They read settings
//! through the [`ConfigProvider`] trait, implemented by [`SharedConfig`], so a
//! reloaded file is picked up by the next check.
//!
//! ## Usage
//!
//! ```no_run
//! use origin_auth::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some(8444), Some("0.0.0.0".to_string()), None);
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod issuer;
pub mod provider;
pub mod server;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use issuer::{IssuerConfig, TokensConfig};
pub use provider::{params, ConfigProvider, SharedConfig};
pub use server::ServerConfig;
pub use utils::output_config_schema;

/// Root configuration structure for the origin authentication service.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Web server and web UI authentication settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Issuer identity and signing key.
    #[serde(default)]
    pub issuer: IssuerConfig,

    /// Token engine defaults.
    #[serde(default)]
    pub tokens: TokensConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails schema
    /// validation, deserialization or [`utils::validate_specific_rules`] is
    /// rejected, and a `*.sample.yaml` with defaults is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml_str(&contents).inspect_err(|_| {
            if let Err(e) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {}", e);
            }
        })
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document is a valid configuration with every default applied
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = serde_yml::from_str(contents).map_err(|err| {
            error!("Configuration deserialization error: {}", err);
            anyhow::anyhow!("Failed to deserialize configuration: {}", err)
        })?;

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the existing configuration.
    ///
    /// # Parameters
    ///
    /// * `port` - TCP port for the web server
    /// * `address` - Network address for the web server to bind to
    /// * `issuer_url` - Issuer URL stamped into sessions and tokens
    pub fn apply_args(
        &mut self,
        port: Option<u16>,
        address: Option<String>,
        issuer_url: Option<String>,
    ) {
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }

        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }

        if let Some(url) = issuer_url {
            debug!("Overriding issuer URL from command line: {}", url);
            self.issuer.url = Some(url);
        }
    }

    /// The issuer URL: the configured one, or one derived from the server binding.
    pub fn issuer_url(&self) -> String {
        match &self.issuer.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => match self.server.address.parse::<IpAddr>() {
                Ok(IpAddr::V6(address)) => format!("https://[{}]:{}", address, self.server.port),
                _ => format!("https://{}:{}", self.server.address, self.server.port),
            },
        }
    }
}
