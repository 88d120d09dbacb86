// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use origin_auth::activation::{ActivationCodeRotator, ActivationCodeSlot};
use origin_auth::auth::SessionAuthenticator;
use origin_auth::config::{Config, SharedConfig};
use origin_auth::credentials::CredentialStore;
use origin_auth::daemon::Daemon;
use origin_auth::token::IssuerKeys;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_rotator_replaces_codes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("code");
    let slot = ActivationCodeSlot::new();
    let mut updates = slot.subscribe();
    let cancel = CancellationToken::new();

    let handle = ActivationCodeRotator::new(slot.clone(), &path, Duration::from_millis(50))
        .spawn(cancel.clone());

    let mut seen = Vec::new();
    for _ in 0..3 {
        timeout(Duration::from_secs(5), updates.changed())
            .await
            .unwrap()
            .unwrap();
        let code = updates.borrow_and_update().clone().unwrap();
        assert_eq!(code.value().len(), 6);
        assert!(code.value().chars().all(|c| c.is_ascii_digit()));
        seen.push(code);
    }
    // Issue times move forward with every rotation
    assert!(seen.windows(2).all(|w| w[0].issued_at() <= w[1].issued_at()));

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert!(!path.exists());

    // Only the last published code is accepted
    let last = slot.current().unwrap();
    assert!(slot.matches(last.value()));
}

#[tokio::test]
async fn test_wait_until_login_returns_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let authenticator = SessionAuthenticator::new(
        Arc::new(CredentialStore::new(dir.path().join("passwd"))),
        ActivationCodeSlot::new(),
        Arc::new(IssuerKeys::generate().unwrap()),
        Arc::new(SharedConfig::new(Config::default())),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    timeout(Duration::from_secs(5), authenticator.wait_until_login(&cancel))
        .await
        .unwrap();
    assert!(!authenticator.has_logged_in());
}

fn daemon_config(dir: &Path) -> SharedConfig {
    let mut config = Config::default();
    config.server.port = 0;
    config.server.ui_password_file = dir.join("passwd").to_string_lossy().into_owned();
    config.server.ui_activation_code_file = dir
        .join("run")
        .join("activation-code")
        .to_string_lossy()
        .into_owned();
    config.issuer.key_file = dir.join("issuer.pem").to_string_lossy().into_owned();
    config.issuer.url = Some("https://origin.example.org".to_string());
    SharedConfig::new(config)
}

/// Wait until the code file shows the code currently held by `slot`.
async fn wait_for_code_file(path: &Path, slot: &ActivationCodeSlot) -> String {
    timeout(Duration::from_secs(5), async {
        loop {
            if let (Ok(contents), Some(current)) =
                (tokio::fs::read_to_string(path).await, slot.current())
            {
                if contents == format!("{}\n", current.value()) {
                    return current.value().to_string();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_daemon_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let code_file = dir.path().join("run").join("activation-code");
    let config = daemon_config(dir.path());

    let mut daemon = Daemon::new();
    daemon.launch(&config).await.unwrap();
    assert!(daemon.services().is_some());
    assert!(dir.path().join("issuer.pem").exists());

    let published = wait_for_code_file(&code_file, daemon.activation_codes()).await;
    assert_eq!(published.len(), 6);

    daemon.shutdown();
    timeout(Duration::from_secs(30), daemon.join())
        .await
        .unwrap()
        .unwrap();
    assert!(!code_file.exists());
}

#[tokio::test]
async fn test_daemon_skips_codes_when_passwords_exist() {
    let dir = tempfile::tempdir().unwrap();
    let code_file = dir.path().join("run").join("activation-code");
    CredentialStore::new(dir.path().join("passwd"))
        .set_password("admin", "pw")
        .await
        .unwrap();
    let config = daemon_config(dir.path());

    let mut daemon = Daemon::new();
    daemon.launch(&config).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!code_file.exists());
    assert!(daemon.activation_codes().current().is_none());

    daemon.shutdown();
    timeout(Duration::from_secs(30), daemon.join())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_first_login_stops_code_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let code_file = dir.path().join("run").join("activation-code");
    let config = daemon_config(dir.path());

    let mut daemon = Daemon::new();
    daemon.launch(&config).await.unwrap();
    let published = wait_for_code_file(&code_file, daemon.activation_codes()).await;

    let authenticator = daemon.services().unwrap().authenticator.clone();
    authenticator.login_with_code(&published).await.unwrap();

    timeout(Duration::from_secs(5), async {
        while code_file.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert!(!daemon.cancellation_token().is_cancelled());

    daemon.shutdown();
    timeout(Duration::from_secs(30), daemon.join())
        .await
        .unwrap()
        .unwrap();
}
