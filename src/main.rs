// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the origin-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the origin authentication service

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jsonwebtoken::DecodingKey;
use log::{error, info};
use thiserror::Error;

use origin_auth::auth::BOOTSTRAP_USER;
use origin_auth::config::{output_config_schema, Config, SharedConfig};
use origin_auth::credentials::{CredentialStore, StoreError};
use origin_auth::daemon::Daemon;
use origin_auth::token::{
    create_token, verify_token, IssuerKeys, TokenError, TokenProfile, TokenRequest,
};

/// Web UI authentication and token issuance for a federated data origin
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the web server, activation code rotation and background tasks
    Serve {
        /// Web server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Web server address
        #[arg(short, long)]
        address: Option<String>,

        /// Issuer URL
        #[arg(long)]
        issuer: Option<String>,
    },

    /// Create or verify bearer tokens
    #[command(subcommand)]
    Token(TokenCommand),

    /// Manage web UI credentials
    #[command(name = "web-ui", subcommand)]
    WebUi(WebUiCommand),
}

#[derive(Debug, Subcommand)]
enum TokenCommand {
    /// Create a signed token
    Create(CreateArgs),

    /// Verify a token and print its claims
    Verify {
        /// The token to verify
        token: String,

        /// PEM public key to verify against instead of the issuer key
        #[arg(long)]
        public_key: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Token profile (generic or scoped)
    #[arg(long)]
    profile: Option<TokenProfile>,

    /// Lifetime in seconds
    #[arg(long, default_value_t = 1200)]
    lifetime: i64,

    /// Subject claim
    #[arg(long, default_value = "")]
    subject: String,

    /// Audience, may be repeated
    #[arg(long)]
    audience: Vec<String>,

    /// Scope value, may be repeated
    #[arg(long)]
    scope: Vec<String>,

    /// Extra claim as name=value, may be repeated
    #[arg(long = "claim", value_parser = parse_claim)]
    claims: Vec<(String, String)>,

    /// Issuer URL, defaults to the configured issuer
    #[arg(long)]
    issuer: Option<String>,

    /// PKCS#8 PEM private key, defaults to the configured issuer key
    #[arg(long)]
    private_key: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum WebUiCommand {
    /// Set a web UI password
    ResetPassword {
        /// User whose password is set
        #[arg(long, default_value = BOOTSTRAP_USER)]
        user: String,

        /// Read the password from the first line of stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },
}

/// Failures of the one-shot commands, each with its own exit code
#[derive(Error, Debug)]
enum CliError {
    #[error("Configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("Key error: {0:#}")]
    Key(anyhow::Error),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Input error: {0:#}")]
    Input(anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::Key(_) => 2,
            CliError::Token(_) => 3,
            CliError::Store(_) => 4,
            CliError::Input(_) => 5,
        }
    }
}

fn parse_claim(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", s)),
    }
}

fn load_private_key(path: &Path) -> Result<IssuerKeys> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key {:?}", path))?;
    IssuerKeys::from_pem(&pem)
}

fn create(config: &Config, args: CreateArgs) -> std::result::Result<String, CliError> {
    let keys = match &args.private_key {
        Some(path) => load_private_key(path),
        None => IssuerKeys::from_config(&config.issuer),
    }
    .map_err(CliError::Key)?;

    let request = TokenRequest {
        profile: args.profile.unwrap_or(config.tokens.default_profile),
        issuer: args.issuer,
        lifetime: Some(args.lifetime),
        subject: args.subject,
        audience: args.audience,
        scope: args.scope,
        claims: args.claims.into_iter().collect::<BTreeMap<_, _>>(),
    };
    let default_issuer = config.issuer_url();
    Ok(create_token(&request, Some(&default_issuer), &keys)?)
}

fn verify(
    config: &Config,
    token: &str,
    public_key: Option<&Path>,
) -> std::result::Result<String, CliError> {
    let key = match public_key {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read public key {:?}", path))
            .and_then(|pem| Ok(DecodingKey::from_ec_pem(&pem)?)),
        None if config.issuer.private_key.is_none()
            && !Path::new(&config.issuer.key_file).exists() =>
        {
            Err(anyhow::anyhow!(
                "No issuer key at {:?} and no --public-key given",
                config.issuer.key_file
            ))
        }
        None => IssuerKeys::from_config(&config.issuer).map(|keys| keys.decoding_key().clone()),
    }
    .map_err(CliError::Key)?;

    let verified = verify_token(token, &key)?;
    serde_json::to_string_pretty(&verified).map_err(|e| CliError::Input(e.into()))
}

async fn reset_password(
    config: &Config,
    user: &str,
    from_stdin: bool,
) -> std::result::Result<(), CliError> {
    let password = if from_stdin {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read password from stdin")
            .map_err(CliError::Input)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        dialoguer::Password::new()
            .with_prompt(format!("New password for '{}'", user))
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .context("Failed to read password")
            .map_err(CliError::Input)?
    };

    let store = CredentialStore::new(&config.server.ui_password_file);
    store.set_password(user, &password).await?;
    println!("Password set for '{}' in {:?}", user, store.path());
    Ok(())
}

async fn serve(
    config_path: &Path,
    port: Option<u16>,
    address: Option<String>,
    issuer: Option<String>,
) -> Result<()> {
    let config = SharedConfig::from_file(config_path)?;
    config.update(|c| c.apply_args(port, address, issuer));

    let mut daemon = Daemon::new();
    if let Err(e) = daemon.launch(&config).await {
        error!("Failed to start: {:#}", e);
        daemon.shutdown();
        daemon.join().await?;
        return Err(e);
    }

    let cancel = daemon.cancellation_token();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C");
        }
        _ = cancel.cancelled() => {}
    }

    daemon.shutdown();
    daemon.join().await
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.show_config_schema {
        return output_config_schema();
    }

    let command = cli.command.unwrap_or(Command::Serve {
        port: None,
        address: None,
        issuer: None,
    });

    if let Command::Serve {
        port,
        address,
        issuer,
    } = command
    {
        return serve(&cli.config, port, address, issuer).await;
    }

    let outcome = match Config::from_file(&cli.config).map_err(CliError::Config) {
        Err(e) => Err(e),
        Ok(config) => match command {
            Command::Token(TokenCommand::Create(args)) => create(&config, args).map(|token| {
                println!("{}", token);
            }),
            Command::Token(TokenCommand::Verify { token, public_key }) => {
                verify(&config, &token, public_key.as_deref()).map(|claims| {
                    println!("{}", claims);
                })
            }
            Command::WebUi(WebUiCommand::ResetPassword { user, stdin }) => {
                reset_password(&config, &user, stdin).await
            }
            Command::Serve { .. } => Ok(()),
        },
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}
