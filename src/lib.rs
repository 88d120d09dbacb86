// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Origin authentication library
//!
//! This library provides the authentication and credential-issuance core of a
//! federated data origin: operator login to the administrative web interface
//! (password or one-time activation code), signed session cookies, admin
//! authorization, and profile-constrained JWT issuance and verification.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration, schema validation and the [`config::ConfigProvider`] seam
//! - [`credentials`]: the flat-file password store
//! - [`activation`]: the activation code slot and its background rotator
//! - [`auth`]: session authentication and admin authorization
//! - [`token`]: issuer keys and the token engine
//! - [`web`]: the Rocket HTTP surface
//! - [`daemon`]: the execution context that owns every background task

pub mod activation;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod daemon;
pub mod token;
pub mod utility;
pub mod web;
