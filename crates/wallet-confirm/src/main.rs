//! wallet-confirm: runs one dApp request through the confirmation flow
//! against the configured RPC endpoints.

use std::path::{Path, PathBuf};

use alloy::primitives::utils::format_ether;
use clap::{Parser, ValueEnum};
use eyre::WrapErr;
use serde::de::DeserializeOwned;

use wallet_confirm_adapters::{AdapterConfig, AdapterSet, DappSession};
use wallet_confirm_core::{
    AccountInfo, ConfirmConfig, ConfirmOutcome, ConfirmationSession, PendingRequest, SpeedTier,
    WalletRepository,
};

#[derive(Parser)]
#[command(name = "wallet-confirm", about = "Confirm or reject one dApp wallet request", version)]
struct Cli {
    /// Pending request as JSON
    request: PathBuf,

    /// Fee tier to confirm with
    #[arg(long, value_enum, default_value_t = Speed::Normal)]
    speed: Speed,

    /// Reject instead of confirming
    #[arg(long)]
    reject: bool,

    /// Wallet repository snapshot used to label the account and detect hardware wallets
    #[arg(long)]
    wallets: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Speed {
    Normal,
    Fast,
    Urgent,
}

impl From<Speed> for SpeedTier {
    fn from(speed: Speed) -> Self {
        match speed {
            Speed::Normal => SpeedTier::Normal,
            Speed::Fast => SpeedTier::Fast,
            Speed::Urgent => SpeedTier::Urgent,
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> eyre::Result<T> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("{} is not a valid {what}", path.display()))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let request: PendingRequest = read_json(&cli.request, "pending request")?;
    let account = match &cli.wallets {
        Some(path) => {
            let repository: WalletRepository = read_json(path, "wallet snapshot")?;
            repository.account_info(request.address)
        }
        None => AccountInfo::software(request.address),
    };

    let config = AdapterConfig::from_env();
    tracing::info!(
        profile = ?config.runtime_profile,
        chains = config.rpc_urls.len(),
        "Starting wallet-confirm"
    );
    let adapters = AdapterSet::from_config(&config)?;
    adapters.session.insert_session(DappSession {
        session_id: request.session_id.clone(),
        dapp_name: request.dapp_name.clone(),
        dapp_url: request.dapp_url.clone(),
        active: true,
    })?;

    let request_id = request.request_id.clone();
    let session =
        ConfirmationSession::open(request, account, adapters.ports(), ConfirmConfig::default());
    if let Some(label) = &session.account().label {
        println!("account {label}");
    }

    let view = match session.prepare().await {
        Ok(view) => view,
        Err(err) => {
            session.close().await;
            return Err(err.into());
        }
    };
    if let Some(selection) = &view.selection {
        println!(
            "gas limit {} | estimated fee {} {} | max fee {} {}",
            selection.gas_limit,
            format_ether(selection.estimated_fee),
            view.native_symbol,
            format_ether(selection.max_fee),
            view.native_symbol,
        );
    }
    if let Some(nonce) = view.nonce {
        println!("nonce {nonce}");
    }

    if cli.reject {
        session.cancel().await;
    } else {
        session.select_speed(cli.speed.into());
        let outcome = match session.confirm().await {
            Ok(outcome) => outcome,
            Err(err) => {
                session.close().await;
                return Err(err.into());
            }
        };
        match outcome {
            ConfirmOutcome::Approved(approval) => println!("approved: {}", approval.rpc_result()),
            ConfirmOutcome::Blocked(label) => {
                println!("confirm blocked: {label:?}");
                session.cancel().await;
            }
            ConfirmOutcome::Failed { message, sheet_open } => {
                println!("signing failed: {message}");
                if sheet_open {
                    session.cancel().await;
                }
            }
            other => println!("{other:?}"),
        }
    }
    session.close().await;

    match adapters.session.response(&request_id)? {
        Some(response) => println!("response to {request_id}: {response:?}"),
        None => println!("request {request_id} left unanswered"),
    }
    Ok(())
}
