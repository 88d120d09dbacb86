// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Named configuration lookups
//!
//! Authentication components read their settings through [`ConfigProvider`]
//! at the moment they need them. [`SharedConfig`] is the production provider:
//! a [`Config`] behind a lock that can be replaced or reloaded while the
//! server runs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use anyhow::{Context, Result};
use log::info;

use super::Config;

/// Setting names understood by [`SharedConfig`].
pub mod params {
    pub const SERVER_ADDRESS: &str = "Server.Address";
    pub const SERVER_PORT: &str = "Server.Port";
    pub const SERVER_ENABLE_TLS: &str = "Server.EnableTLS";
    pub const ADMIN_USERS: &str = "Server.AdminUsers";
    pub const UI_PASSWORD_FILE: &str = "Server.UIPasswordFile";
    pub const UI_ACTIVATION_CODE_FILE: &str = "Server.UIActivationCodeFile";
    pub const ACTIVATION_CODE_INTERVAL: &str = "Server.ActivationCodeInterval";
    pub const SESSION_LIFETIME: &str = "Server.SessionLifetime";
    pub const ISSUER_URL: &str = "Issuer.Url";
    pub const ISSUER_KEY_FILE: &str = "Issuer.KeyFile";
    pub const TOKEN_DEFAULT_LIFETIME: &str = "Tokens.DefaultLifetime";
    pub const TOKEN_DEFAULT_PROFILE: &str = "Tokens.DefaultProfile";
}

/// Read access to named settings.
///
/// Unknown names yield `None` (or an empty list).
pub trait ConfigProvider: Send + Sync {
    fn get_string(&self, name: &str) -> Option<String>;
    fn get_bool(&self, name: &str) -> Option<bool>;
    fn get_int(&self, name: &str) -> Option<i64>;
    fn get_string_list(&self, name: &str) -> Vec<String>;
}

/// A [`Config`] shared between components and replaceable at runtime.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
    path: Option<PathBuf>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// Load the configuration file and remember its path for [`SharedConfig::reload`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::from_file(path)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(path.to_path_buf()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A copy of the current configuration
    pub fn snapshot(&self) -> Config {
        self.read().clone()
    }

    /// Mutate the configuration in place.
    pub fn update<F: FnOnce(&mut Config)>(&self, f: F) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard);
    }

    /// Re-read the backing file. The current configuration is kept on failure.
    pub fn reload(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .context("Configuration was not loaded from a file")?;
        if !path.exists() {
            anyhow::bail!("Configuration file {:?} no longer exists", path);
        }
        let config = Config::from_file(path)
            .with_context(|| format!("Failed to reload configuration from {:?}", path))?;
        self.update(|current| *current = config);
        info!("Configuration reloaded from {:?}", path);
        Ok(())
    }
}

impl ConfigProvider for SharedConfig {
    fn get_string(&self, name: &str) -> Option<String> {
        let config = self.read();
        match name {
            params::SERVER_ADDRESS => Some(config.server.address.clone()),
            params::UI_PASSWORD_FILE => Some(config.server.ui_password_file.clone()),
            params::UI_ACTIVATION_CODE_FILE => Some(config.server.ui_activation_code_file.clone()),
            params::ISSUER_URL => Some(config.issuer_url()),
            params::ISSUER_KEY_FILE => Some(config.issuer.key_file.clone()),
            params::TOKEN_DEFAULT_PROFILE => Some(config.tokens.default_profile.to_string()),
            _ => None,
        }
    }

    fn get_bool(&self, name: &str) -> Option<bool> {
        let config = self.read();
        match name {
            params::SERVER_ENABLE_TLS => Some(config.server.tls_enabled()),
            _ => None,
        }
    }

    fn get_int(&self, name: &str) -> Option<i64> {
        let config = self.read();
        let value = match name {
            params::SERVER_PORT => u64::from(config.server.port),
            params::ACTIVATION_CODE_INTERVAL => config.server.activation_code_interval,
            params::SESSION_LIFETIME => config.server.session_lifetime,
            params::TOKEN_DEFAULT_LIFETIME => config.tokens.default_lifetime,
            _ => return None,
        };
        i64::try_from(value).ok()
    }

    fn get_string_list(&self, name: &str) -> Vec<String> {
        let config = self.read();
        match name {
            params::ADMIN_USERS => config.server.admin_users.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_follow_updates() {
        let shared = SharedConfig::new(Config::default());
        assert!(shared.get_string_list(params::ADMIN_USERS).is_empty());
        assert_eq!(shared.get_int(params::SESSION_LIFETIME), Some(1800));
        assert_eq!(shared.get_bool(params::SERVER_ENABLE_TLS), Some(false));

        shared.update(|c| c.server.admin_users = vec!["alice".to_string()]);
        assert_eq!(shared.get_string_list(params::ADMIN_USERS), vec!["alice"]);
    }

    #[test]
    fn test_issuer_url_falls_back_to_server_binding() {
        let shared = SharedConfig::new(Config::default());
        assert_eq!(
            shared.get_string(params::ISSUER_URL).as_deref(),
            Some("https://127.0.0.1:8444")
        );

        shared.update(|c| c.issuer.url = Some("https://origin.example.org".to_string()));
        assert_eq!(
            shared.get_string(params::ISSUER_URL).as_deref(),
            Some("https://origin.example.org")
        );
    }

    #[test]
    fn test_unknown_names() {
        let shared = SharedConfig::new(Config::default());
        assert_eq!(shared.get_string("Nope"), None);
        assert_eq!(shared.get_int("Nope"), None);
        assert_eq!(shared.get_bool("Nope"), None);
        assert!(shared.get_string_list("Nope").is_empty());
    }

    #[test]
    fn test_reload_without_file_fails() {
        let shared = SharedConfig::new(Config::default());
        assert!(shared.reload().is_err());
    }
}
