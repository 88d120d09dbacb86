// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::sync::Arc;

use log::debug;

use super::error::AuthError;
use super::session::{Identity, BOOTSTRAP_USER};
use crate::config::{params, ConfigProvider};

/// Admin check applied after session validation.
///
/// The allow-list is read from configuration on every call.
pub struct AdminAuthorizer {
    config: Arc<dyn ConfigProvider>,
}

impl AdminAuthorizer {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }

    pub fn authorize(&self, identity: Option<&Identity>) -> Result<(), AuthError> {
        let admins = self.config.get_string_list(params::ADMIN_USERS);
        authorize_user(identity.map(|i| i.user.as_str()), &admins)
    }
}

/// Membership check behind [`AdminAuthorizer::authorize`].
///
/// With an empty allow-list only the bootstrap `admin` user passes. Otherwise
/// the list alone decides, whatever role the session carries.
pub fn authorize_user(user: Option<&str>, admins: &[String]) -> Result<(), AuthError> {
    let user = match user {
        Some(user) if !user.is_empty() => user,
        _ => return Err(AuthError::LoginRequired),
    };

    let allowed = if admins.is_empty() {
        user == BOOTSTRAP_USER
    } else {
        admins.iter().any(|admin| admin == user)
    };

    if allowed {
        Ok(())
    } else {
        debug!("User '{}' is not an administrator", user);
        Err(AuthError::Forbidden)
    }
}
