// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session authentication service
//!
//! This module implements the web UI login flows:
//!
//! 1. **Activation code login**: a fresh installation has no password. The
//!    operator reads the current code from the activation code file and
//!    submits it; success yields an `admin` session.
//! 2. **Password login**: user and password are checked against the
//!    [`CredentialStore`].
//!
//! Both flows end in a signed session cookie (see [`super::session`]). A
//! session can then reset its own password, query `whoami`, and pass the
//! admin check.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rocket::http::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::error::AuthError;
use super::session::{
    decode_session, encode_session, Identity, Role, BOOTSTRAP_USER, SESSION_COOKIE,
    SESSION_COOKIE_PATH,
};
use crate::activation::ActivationCodeSlot;
use crate::config::{params, ConfigProvider};
use crate::credentials::CredentialStore;
use crate::token::IssuerKeys;

/// Session lifetime used when configuration has no positive value
pub const DEFAULT_SESSION_LIFETIME: i64 = 30 * 60;

/// A freshly signed session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub identity: Identity,
    pub token: String,
    /// Lifetime in seconds
    pub max_age: i64,
}

/// Response body of `whoami`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoAmI {
    pub authenticated: bool,
    pub role: String,
    pub user: String,
}

pub struct SessionAuthenticator {
    store: Arc<CredentialStore>,
    codes: ActivationCodeSlot,
    keys: Arc<IssuerKeys>,
    config: Arc<dyn ConfigProvider>,
    logged_in: watch::Sender<bool>,
}

impl SessionAuthenticator {
    pub fn new(
        store: Arc<CredentialStore>,
        codes: ActivationCodeSlot,
        keys: Arc<IssuerKeys>,
        config: Arc<dyn ConfigProvider>,
    ) -> Self {
        let (logged_in, _) = watch::channel(false);
        Self {
            store,
            codes,
            keys,
            config,
            logged_in,
        }
    }

    /// Log in with the current activation code as the bootstrap administrator.
    ///
    /// Codes are only honoured during first-run setup, see
    /// [`SessionAuthenticator::activation_open`].
    pub async fn login_with_code(&self, code: &str) -> Result<IssuedSession, AuthError> {
        if !self.activation_open().await? {
            debug!("Rejected activation code login, first-run setup is over");
            return Err(AuthError::InvalidCode);
        }
        if !self.codes.matches(code) {
            debug!("Rejected activation code login");
            return Err(AuthError::InvalidCode);
        }
        info!("Activation code login for '{}'", BOOTSTRAP_USER);
        let session = self.issue_session(BOOTSTRAP_USER, Role::Admin)?;
        self.mark_logged_in();
        Ok(session)
    }

    /// Log in with a password from the credential store.
    pub async fn login_with_password(
        &self,
        user: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        if user.is_empty() {
            return Err(AuthError::MissingUser);
        }
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        if !self.store.verify(user, password).await? {
            info!("Failed password login for '{}'", user);
            return Err(AuthError::CredentialMismatch);
        }

        let role = if user == BOOTSTRAP_USER {
            Role::Admin
        } else {
            Role::User
        };
        info!("Password login for '{}'", user);
        let session = self.issue_session(user, role)?;
        self.mark_logged_in();
        Ok(session)
    }

    /// Sign a session for `subject`.
    pub fn issue_session(&self, subject: &str, role: Role) -> Result<IssuedSession, AuthError> {
        let identity = Identity {
            user: subject.to_string(),
            role,
        };
        let max_age = self.session_lifetime();
        let issuer = self
            .config
            .get_string(params::ISSUER_URL)
            .unwrap_or_default();
        let now = chrono::Utc::now().timestamp();
        let token = encode_session(&identity, &issuer, max_age, &self.keys, now)?;
        Ok(IssuedSession {
            identity,
            token,
            max_age,
        })
    }

    /// Identity of a session cookie value; `None` when absent, forged or expired.
    pub fn validate_session(&self, token: Option<&str>) -> Option<Identity> {
        let token = token.filter(|t| !t.is_empty())?;
        decode_session(token, &self.keys, chrono::Utc::now().timestamp())
    }

    /// Set a new password for the session's own user.
    pub async fn reset_password(
        &self,
        token: Option<&str>,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let identity = self
            .validate_session(token)
            .ok_or(AuthError::AuthenticationRequired)?;
        if new_password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        self.store.set_password(&identity.user, new_password).await?;
        info!("Password reset by '{}'", identity.user);
        Ok(())
    }

    pub fn whoami(&self, token: Option<&str>) -> WhoAmI {
        match self.validate_session(token) {
            Some(identity) => WhoAmI {
                authenticated: true,
                role: identity.role.to_string(),
                user: identity.user,
            },
            None => WhoAmI::default(),
        }
    }

    /// Whether activation code login is still possible: nobody has logged in
    /// yet and the password file has no entries.
    pub async fn activation_open(&self) -> Result<bool, AuthError> {
        if self.has_logged_in() {
            return Ok(false);
        }
        Ok(!self.store.has_entries().await?)
    }

    /// Wait until first-run setup is over, or for `cancel`.
    ///
    /// Setup is over after the first successful login, or as soon as the
    /// password file has an entry. The file is checked on start and then
    /// once per activation code interval.
    pub async fn wait_until_login(&self, cancel: &CancellationToken) {
        let mut logged_in = self.logged_in.subscribe();
        let mut recheck = time::interval(self.recheck_interval());
        recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Stopped waiting for the first login");
                    return;
                }
                result = async { logged_in.wait_for(|done| *done).await.map(|_| ()) } => {
                    if result.is_err() {
                        debug!("Login notifier closed");
                    }
                    return;
                }
                _ = recheck.tick() => {
                    match self.store.has_entries().await {
                        Ok(true) => {
                            debug!("Password file has entries, first-run setup is over");
                            return;
                        }
                        Ok(false) => {}
                        Err(e) => warn!("Cannot check the password file: {}", e),
                    }
                }
            }
        }
    }

    pub fn has_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }

    /// Cookie carrying `session`.
    pub fn session_cookie(&self, session: &IssuedSession) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, session.token.clone()))
            .path(SESSION_COOKIE_PATH)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.config.get_bool(params::SERVER_ENABLE_TLS).unwrap_or(false))
            .max_age(rocket::time::Duration::seconds(session.max_age))
            .build()
    }

    /// Cookie matching the session cookie's name and path, for removal.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path(SESSION_COOKIE_PATH).build()
    }

    fn session_lifetime(&self) -> i64 {
        self.config
            .get_int(params::SESSION_LIFETIME)
            .filter(|lifetime| *lifetime > 0)
            .unwrap_or(DEFAULT_SESSION_LIFETIME)
    }

    fn recheck_interval(&self) -> Duration {
        let seconds = self
            .config
            .get_int(params::ACTIVATION_CODE_INTERVAL)
            .filter(|interval| *interval > 0)
            .unwrap_or(60);
        Duration::from_secs(seconds.unsigned_abs())
    }

    fn mark_logged_in(&self) {
        self.logged_in.send_if_modified(|done| !std::mem::replace(done, true));
    }
}
