// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::prelude::*;
use log::{debug, error, info};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activation::{ActivationCodeRotator, ActivationCodeSlot};
use crate::auth::{AdminAuthorizer, SessionAuthenticator};
use crate::config::{ConfigProvider, SharedConfig};
use crate::credentials::CredentialStore;
use crate::token::{IssuerKeys, TokenEngine};
use crate::web::{build_rocket, WebServices};

/// Runs and supervises the server's background tasks
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
    codes: ActivationCodeSlot,
    services: Option<WebServices>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            cancel: CancellationToken::new(),
            codes: ActivationCodeSlot::new(),
            services: None,
        }
    }

    /// Token observed by every task; cancelling it stops the daemon.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The activation code slot shared by the rotator and the login handler
    pub fn activation_codes(&self) -> &ActivationCodeSlot {
        &self.codes
    }

    /// Services built by [`Daemon::launch`]
    pub fn services(&self) -> Option<&WebServices> {
        self.services.as_ref()
    }

    /// Build the authentication services and start every task.
    pub async fn launch(&mut self, config: &SharedConfig) -> Result<()> {
        let snapshot = config.snapshot();
        let provider: Arc<dyn ConfigProvider> = Arc::new(config.clone());

        let keys = Arc::new(
            IssuerKeys::from_config(&snapshot.issuer).context("Failed to load the issuer key")?,
        );
        info!("Issuer {} using key {}", snapshot.issuer_url(), keys.kid());

        let store = Arc::new(CredentialStore::new(&snapshot.server.ui_password_file));
        let users = store
            .users()
            .await
            .context("Failed to read the web UI password file")?;
        let authenticator = Arc::new(SessionAuthenticator::new(
            store,
            self.codes.clone(),
            keys.clone(),
            provider.clone(),
        ));
        let services = WebServices {
            authenticator: authenticator.clone(),
            authorizer: Arc::new(AdminAuthorizer::new(provider.clone())),
            tokens: Arc::new(TokenEngine::new(keys.clone(), provider)),
            keys,
        };

        if users.is_empty() {
            let rotation = self.cancel.child_token();
            self.start_activation_rotator(config, rotation.clone());
            self.start_login_watcher(authenticator, rotation);
        } else {
            info!(
                "Web UI passwords set for {} user(s), activation code login disabled",
                users.len()
            );
        }
        self.start_web_server(config, services.clone()).await?;
        self.start_config_reloader(config);

        self.services = Some(services);
        Ok(())
    }

    fn start_activation_rotator(&mut self, config: &SharedConfig, rotation: CancellationToken) {
        let server = config.snapshot().server;
        let rotator = ActivationCodeRotator::new(
            self.codes.clone(),
            &server.ui_activation_code_file,
            Duration::from_secs(server.activation_code_interval),
        );
        self.tasks.push(rotator.spawn(rotation));
    }

    /// Stop code rotation once first-run setup is over.
    fn start_login_watcher(
        &mut self,
        authenticator: Arc<SessionAuthenticator>,
        rotation: CancellationToken,
    ) {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move {
            authenticator.wait_until_login(&cancel).await;
            if cancel.is_cancelled() {
                return Ok(());
            }
            if authenticator.has_logged_in() {
                info!("First web UI login completed");
            }
            info!("Activation code login closed");
            rotation.cancel();
            Ok(())
        });
        self.tasks.push(task);
    }

    /// Start the Rocket web server
    async fn start_web_server(&mut self, config: &SharedConfig, services: WebServices) -> Result<()> {
        let server = config.snapshot().server;
        info!("Starting web server on {}:{}", server.address, server.port);

        let mut figment = rocket::Config::figment()
            .merge(("ident", server.name.clone()))
            .merge(("limits", Limits::new().limit("json", 1.mebibytes())))
            .merge(("address", server.address.clone()))
            .merge(("port", server.port))
            .merge(("shutdown.ctrlc", false))
            .merge(("log_level", LogLevel::Normal));

        if let (Some(cert), Some(key)) = (&server.cert, &server.key) {
            debug!("SSL certificates found in configuration, enabling TLS");
            let cert_data = BASE64_STANDARD.decode(cert)?;
            let key_data = BASE64_STANDARD.decode(key)?;
            figment = figment
                .merge(("tls.certs", cert_data))
                .merge(("tls.key", key_data));
            info!("TLS enabled for web server");
        }

        let ignited = build_rocket(figment, services).ignite().await?;
        let shutdown = ignited.shutdown();
        let cancel = self.cancel.clone();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                cancel.cancelled().await;
                shutdown.notify();
            }
        });

        let task = tokio::spawn(async move {
            let result = ignited.launch().await;
            // The server stopping on its own takes the rest of the daemon down with it
            cancel.cancel();
            result?;
            Ok(())
        });
        self.tasks.push(task);
        Ok(())
    }

    /// Reload the configuration file on SIGHUP.
    fn start_config_reloader(&mut self, config: &SharedConfig) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let config = config.clone();
            let cancel = self.cancel.clone();
            let task = tokio::spawn(async move {
                let mut hangup = signal(SignalKind::hangup())?;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        received = hangup.recv() => {
                            if received.is_none() {
                                break;
                            }
                            if let Err(e) = config.reload() {
                                error!("Configuration reload failed: {:#}", e);
                            }
                        }
                    }
                }
                Ok(())
            });
            self.tasks.push(task);
        }
        #[cfg(not(unix))]
        let _ = config;
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.cancel.cancel();
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}
