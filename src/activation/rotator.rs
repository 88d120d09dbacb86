// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{ActivationCode, ActivationCodeSlot};
use crate::utility::ensure_parent_dir;

/// Background task publishing a fresh activation code on every tick.
///
/// The first code is published as soon as the task starts. Each code is
/// written to `path` followed by a newline; the file is removed once the
/// task observes cancellation.
#[derive(Debug)]
pub struct ActivationCodeRotator {
    slot: ActivationCodeSlot,
    path: PathBuf,
    interval: Duration,
}

impl ActivationCodeRotator {
    pub fn new<P: AsRef<Path>>(slot: ActivationCodeSlot, path: P, interval: Duration) -> Self {
        Self {
            slot,
            path: path.as_ref().to_path_buf(),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Run on the current runtime until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(
            "Activation code rotation started, code file: {:?}, interval: {:?}",
            self.path, self.interval
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.rotate().await,
            }
        }

        self.remove_code_file().await;
        info!("Activation code rotation stopped");
        Ok(())
    }

    /// Publish a new code. The file never keeps showing a superseded code:
    /// when it cannot be rewritten it is removed.
    async fn rotate(&self) {
        let code = ActivationCode::generate();
        match self.write_code_file(code.value()).await {
            Ok(()) => info!("New activation code published to {:?}", self.path),
            Err(e) => {
                warn!(
                    "Failed to write activation code file {:?}: {}",
                    self.path, e
                );
                self.remove_code_file().await;
            }
        }
        self.slot.publish(code);
    }

    async fn write_code_file(&self, code: &str) -> std::io::Result<()> {
        ensure_parent_dir(&self.path).await?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        file.write_all(format!("{}\n", code).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn remove_code_file(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed activation code file {:?}", self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove activation code file {:?}: {}",
                self.path, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_tracks_published_code_and_is_removed_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("code");
        let slot = ActivationCodeSlot::new();
        let mut updates = slot.subscribe();
        let cancel = CancellationToken::new();

        let handle = ActivationCodeRotator::new(slot.clone(), &path, Duration::from_secs(3600))
            .spawn(cancel.clone());

        time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .unwrap()
            .unwrap();
        let code = slot.current().unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, format!("{}\n", code.value()));

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert!(!path.exists());
        // The in-memory code outlives the file
        assert!(slot.current().is_some());
    }

    #[tokio::test]
    async fn test_cancel_with_missing_file_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code");
        let slot = ActivationCodeSlot::new();
        let mut updates = slot.subscribe();
        let cancel = CancellationToken::new();

        let handle =
            ActivationCodeRotator::new(slot, &path, Duration::from_secs(3600)).spawn(cancel.clone());
        updates.changed().await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_write_removes_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code");
        let slot = ActivationCodeSlot::new();
        let rotator = ActivationCodeRotator::new(slot.clone(), &path, Duration::from_secs(3600));

        rotator.rotate().await;
        let first = slot.current().unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            format!("{}\n", first.value())
        );

        // Every write to /dev/full fails with ENOSPC
        tokio::fs::remove_file(&path).await.unwrap();
        std::os::unix::fs::symlink("/dev/full", &path).unwrap();
        rotator.rotate().await;
        assert!(std::fs::symlink_metadata(&path).is_err());
        // The new code is still published
        let second = slot.current().unwrap();
        assert!(second.issued_at() >= first.issued_at());
        assert!(slot.matches(second.value()));

        rotator.rotate().await;
        let third = slot.current().unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            format!("{}\n", third.value())
        );
    }
}
