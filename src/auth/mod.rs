// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web UI authentication and authorization
//!
//! The state machine seen by a browser is:
//!
//! ```text
//! unauthenticated --(activation code | password)--> authenticated --(admin check)--> admin
//! ```
//!
//! - [`SessionAuthenticator`] runs the login flows and validates session cookies
//! - [`AdminAuthorizer`] decides whether an authenticated user may use admin routes
//! - [`AuthError`] maps every failure to its HTTP status and JSON body

pub mod admin;
pub mod authenticator;
pub mod error;
pub mod session;

pub use admin::AdminAuthorizer;
pub use authenticator::{IssuedSession, SessionAuthenticator, WhoAmI};
pub use error::AuthError;
pub use session::{Identity, Role, BOOTSTRAP_USER, SESSION_COOKIE, SESSION_COOKIE_PATH};
