// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Flat-file credential store
//!
//! Passwords for the web UI live in a line-oriented file, one
//! `username:hash` entry per line, in the format produced by `htpasswd`.
//! New hashes are SHA-512 crypt (`$6$salt$hash`); verification accepts any
//! crypt(3) scheme understood by [`pwhash::unix`], so entries created by
//! other tools keep working.
//!
//! Readers run concurrently with each other but never with a writer. A write
//! replaces the whole file atomically.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, error, info};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::utility::{constant_time_eq, ensure_parent_dir, restrict_permissions};

/// Errors raised by the credential store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Credential store I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential store {path:?} is corrupted at line {line}: {reason}")]
    Corrupted {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// One `username:hash` line of the password file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub username: String,
    pub password_hash: String,
}

/// Password file backed credential store.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl CredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash `plaintext` and store it for `user`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// * [`StoreError::InvalidInput`] for an empty user or password, or a user
    ///   name containing `:` or whitespace
    /// * [`StoreError::Corrupted`] if the existing file cannot be parsed
    /// * [`StoreError::Io`] if the file cannot be read or written
    pub async fn set_password(&self, user: &str, plaintext: &str) -> Result<(), StoreError> {
        validate_username(user)?;
        if plaintext.is_empty() {
            return Err(StoreError::InvalidInput("password must not be empty".to_string()));
        }

        let hash = pwhash::sha512_crypt::hash(plaintext)
            .map_err(|e| StoreError::Hash(e.to_string()))?;

        let _guard = self.lock.write().await;
        let mut entries = self.load_entries().await?;
        match entries.iter_mut().find(|entry| entry.username == user) {
            Some(entry) => entry.password_hash = hash,
            None => entries.push(CredentialEntry {
                username: user.to_string(),
                password_hash: hash,
            }),
        }
        self.write_entries(&entries).await?;

        info!("Password updated for user '{}'", user);
        Ok(())
    }

    /// Check `plaintext` against the stored hash for `user`.
    ///
    /// Unknown users and wrong passwords both return `Ok(false)`; only the
    /// debug log tells them apart. Unknown users still pay for one hash
    /// computation.
    pub async fn verify(&self, user: &str, plaintext: &str) -> Result<bool, StoreError> {
        let entries = {
            let _guard = self.lock.read().await;
            self.load_entries().await?
        };

        match entries.iter().find(|entry| entry.username == user) {
            Some(entry) => {
                if check_hash(plaintext, &entry.password_hash) {
                    debug!("Password verified for user '{}'", user);
                    Ok(true)
                } else {
                    debug!("Wrong password for user '{}'", user);
                    Ok(false)
                }
            }
            None => {
                let _ = check_hash(plaintext, dummy_hash());
                debug!("Unknown user '{}'", user);
                Ok(false)
            }
        }
    }

    /// Names of every user in the store, in file order
    pub async fn users(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self
            .load_entries()
            .await?
            .into_iter()
            .map(|entry| entry.username)
            .collect())
    }

    pub async fn has_entries(&self) -> Result<bool, StoreError> {
        Ok(!self.users().await?.is_empty())
    }

    async fn load_entries(&self) -> Result<Vec<CredentialEntry>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => parse_entries(&self.path, &contents).inspect_err(|e| error!("{}", e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write_entries(&self, entries: &[CredentialEntry]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let mut contents = String::new();
        for entry in entries {
            contents.push_str(&entry.username);
            contents.push(':');
            contents.push_str(&entry.password_hash);
            contents.push('\n');
        }

        ensure_parent_dir(&self.path).await.map_err(io_err)?;
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, contents).await.map_err(io_err)?;
        restrict_permissions(&tmp_path).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_err)?;
        Ok(())
    }
}

/// Parse the password file contents.
///
/// Blank lines are skipped. Any malformed line or repeated username makes the
/// whole file unusable.
pub fn parse_entries(path: &Path, contents: &str) -> Result<Vec<CredentialEntry>, StoreError> {
    let mut entries: Vec<CredentialEntry> = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let corrupted = |reason: &str| StoreError::Corrupted {
            path: path.to_path_buf(),
            line: index + 1,
            reason: reason.to_string(),
        };

        let (username, hash) = line
            .split_once(':')
            .ok_or_else(|| corrupted("missing ':' separator"))?;
        if username.is_empty() {
            return Err(corrupted("empty username"));
        }
        if hash.is_empty() {
            return Err(corrupted("empty password hash"));
        }
        if entries.iter().any(|entry| entry.username == username) {
            return Err(corrupted("duplicate username"));
        }
        entries.push(CredentialEntry {
            username: username.to_string(),
            password_hash: hash.to_string(),
        });
    }
    Ok(entries)
}

fn validate_username(user: &str) -> Result<(), StoreError> {
    if user.is_empty() {
        return Err(StoreError::InvalidInput("user must not be empty".to_string()));
    }
    if user.contains(':') || user.chars().any(char::is_whitespace) {
        return Err(StoreError::InvalidInput(format!(
            "user '{}' contains ':' or whitespace",
            user.escape_debug()
        )));
    }
    Ok(())
}

/// Recompute the hash with the stored salt and compare the results.
fn check_hash(plaintext: &str, stored: &str) -> bool {
    match pwhash::unix::crypt(plaintext, stored) {
        Ok(computed) => constant_time_eq(computed.as_bytes(), stored.as_bytes()),
        Err(e) => {
            debug!("Unusable password hash: {}", e);
            false
        }
    }
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| pwhash::sha512_crypt::hash("dummy password").unwrap_or_default())
}
