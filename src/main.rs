//! certnotary - notarize certificates through a Circular Network Access Gateway
//!
//! Thin command-line front end over the library: loads settings and
//! credentials, opens the configured account and runs one operation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use certnotary::config::{resolve_private_key, Credentials, Settings};
use certnotary::gateway::DiscoveryResolver;
use certnotary::{Account, CancelHandle, CancelToken, Certificate, HttpTransport};

#[derive(Parser)]
#[command(name = "certnotary")]
#[command(version, about = "Notarize certificates on a Circular network", long_about = None)]
struct Cli {
    /// Settings file; defaults to $CERTNOTARY_CONFIG or config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON credential file keyed by network name
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a certificate and optionally wait for its outcome
    Submit {
        /// Certificate content
        #[arg(long, conflicts_with = "file")]
        data: Option<String>,
        /// Read certificate content from a file
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        previous_tx: String,
        #[arg(long, default_value = "")]
        previous_block: String,
        /// Poll until the transaction leaves Pending
        #[arg(long)]
        wait: bool,
    },
    /// Show the account's next nonce
    Nonce,
    /// Wait for a transaction outcome
    Outcome {
        tx_id: String,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Check a signature against a public key
    Verify {
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        signature: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.json_logs);

    let result = run(&cli).await;

    if cli.metrics {
        print!("{}", certnotary::metrics::gather());
    }

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn run(cli: &Cli) -> Result<()> {
    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let credentials = match cli
        .credentials
        .clone()
        .or_else(|| settings.account.credentials_path.clone().map(PathBuf::from))
    {
        Some(path) => Some(Credentials::load(path)?),
        None => None,
    };

    let handle = CancelHandle::new();
    let cancel = handle.token();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, cancelling");
        handle.cancel();
    });

    match &cli.command {
        Commands::Submit {
            data,
            file,
            previous_tx,
            previous_block,
            wait,
        } => {
            let content = match (data, file) {
                (Some(data), _) => data.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read certificate file: {:?}", path))?,
                (None, None) => anyhow::bail!("either --data or --file is required"),
            };
            let account = open_account(&settings, credentials.as_ref(), &cancel).await?;
            let key = resolve_private_key(credentials.as_ref(), account.network())
                .context("No private key: set CERTNOTARY_PRIVATE_KEY or use a credential file")?;

            let mut certificate =
                Certificate::new().with_previous(previous_tx.as_str(), previous_block.as_str());
            certificate.set_data(&content);

            account.refresh_nonce(&cancel).await?;
            let submission = account.submit_certificate(&certificate, &key, &cancel).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "tx_id": submission.tx_id(),
                    "nonce": submission.request.nonce,
                    "accepted": submission.accepted(),
                    "response": submission.response.raw,
                }))?
            );

            if *wait && submission.accepted() {
                let timeout = Duration::from_secs(settings.account.outcome_timeout_secs);
                let outcome = account
                    .wait_for_outcome(submission.tx_id(), timeout, &cancel)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&outcome.raw)?);
            }
        }
        Commands::Nonce => {
            let account = open_account(&settings, credentials.as_ref(), &cancel).await?;
            let next = account.refresh_nonce(&cancel).await?;
            println!("{}", json!({ "address": account.address(), "next_nonce": next }));
        }
        Commands::Outcome {
            tx_id,
            timeout_secs,
        } => {
            let account = open_account(&settings, credentials.as_ref(), &cancel).await?;
            let timeout = Duration::from_secs(
                timeout_secs.unwrap_or(settings.account.outcome_timeout_secs),
            );
            let outcome = account.wait_for_outcome(tx_id, timeout, &cancel).await?;
            info!(tx_id = %outcome.id, status = %outcome.status, "Outcome received");
            println!("{}", serde_json::to_string_pretty(&outcome.raw)?);
        }
        Commands::Verify {
            public_key,
            message,
            signature,
        } => {
            let valid = certnotary::crypto::verify(public_key, message.as_bytes(), signature);
            println!("{}", json!({ "valid": valid }));
        }
    }

    Ok(())
}

async fn open_account(
    settings: &Settings,
    credentials: Option<&Credentials>,
    cancel: &CancelToken,
) -> Result<Account> {
    let network = settings.account.network.as_str();
    let transport = Arc::new(HttpTransport::from_config(&settings.client)?);

    let mut fallback = settings.discovery.fallback.clone();
    if let Some(url) = credentials.and_then(|c| c.nag_url(network)) {
        fallback
            .entry(network.to_string())
            .or_insert_with(|| url.to_string());
    }
    let resolver = DiscoveryResolver::new(transport.clone(), settings.discovery.url.clone())
        .with_fallback(fallback);

    let mut account = Account::builder(transport)
        .resolver(Arc::new(resolver))
        .build();

    let address = settings
        .account
        .address
        .clone()
        .filter(|a| !a.is_empty())
        .or_else(|| {
            credentials
                .and_then(|c| c.network(network))
                .map(|n| n.main_account.address.clone())
                .filter(|a| !a.is_empty())
        })
        .context("No account address configured")?;

    account.open(&address)?;
    if let Some(chain) = &settings.account.chain_id {
        account.set_blockchain(chain)?;
    }
    account.set_network_node(settings.account.network_node.clone());
    account.set_poll_interval(Duration::from_millis(settings.account.poll_interval_ms));
    account.set_network(network, cancel).await?;

    info!(
        "Starting certnotary v{} for {} on {}",
        env!("CARGO_PKG_VERSION"),
        account.address(),
        account.network()
    );
    Ok(account)
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,certnotary=debug,hyper=warn,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
