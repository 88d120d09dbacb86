// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP surface built on Rocket

pub mod auth_api;
pub mod guards;
pub mod server;
pub mod token_api;

pub use server::{build_rocket, WebServices, API_BASE};
