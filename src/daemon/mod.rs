// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon owns every long-running task of the server: the activation
//! code rotator, the web server, the first-login watcher and the
//! configuration reloader. All of them observe one cancellation token, and
//! [`Daemon::join`] waits until each has finished its cleanup.
//!
//! ## Usage
//!
//! ```no_run
//! use origin_auth::{config::SharedConfig, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = SharedConfig::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
