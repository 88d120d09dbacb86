// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One-time activation codes
//!
//! Before any password exists, an operator logs in with a short numeric code
//! read from a well-known file on the server host. [`ActivationCodeRotator`]
//! replaces that code on a fixed interval and publishes it through an
//! [`ActivationCodeSlot`] that request handlers read.

mod rotator;

pub use rotator::ActivationCodeRotator;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::watch;

use crate::utility::constant_time_eq;

/// Number of digits in an activation code
pub const ACTIVATION_CODE_DIGITS: usize = 6;

/// A 6-digit activation code and the time it was generated.
#[derive(Clone, PartialEq, Eq)]
pub struct ActivationCode {
    value: String,
    issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for ActivationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationCode")
            .field("value", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl ActivationCode {
    /// Draw a uniformly distributed, zero-padded code from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Self {
            value: format!("{:06}", n),
            issued_at: Utc::now(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Constant-time comparison against a submitted code.
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.value.as_bytes(), candidate.as_bytes())
    }
}

/// The single current activation code.
///
/// Cloning yields another handle to the same slot. The rotator is the only
/// writer; readers always see either the previous or the new code.
#[derive(Debug, Clone)]
pub struct ActivationCodeSlot {
    sender: Arc<watch::Sender<Option<ActivationCode>>>,
}

impl Default for ActivationCodeSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationCodeSlot {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the current code.
    pub fn publish(&self, code: ActivationCode) {
        self.sender.send_replace(Some(code));
    }

    pub fn current(&self) -> Option<ActivationCode> {
        self.sender.borrow().clone()
    }

    /// Whether `candidate` equals the current code. An empty slot matches nothing.
    pub fn matches(&self, candidate: &str) -> bool {
        self.sender
            .borrow()
            .as_ref()
            .is_some_and(|code| code.matches(candidate))
    }

    /// Observe publications.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActivationCode>> {
        self.sender.subscribe()
    }
}
