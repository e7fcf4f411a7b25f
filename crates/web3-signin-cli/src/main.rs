/*
[INPUT]:  CLI arguments, YAML configuration file, environment overrides
[OUTPUT]: Wallet sign-in, session status or sign-out against the auth service
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use web3_signin_adapter::WalletKind;
use web3_signin_cli::{RejectStage, commands, load_config, local_wallet};

#[derive(Parser, Debug)]
#[command(name = "web3-signin", version, about = "Sign in to a hosted auth service with a wallet")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with a local wallet standing in for a browser extension
    SignIn {
        #[arg(long, value_name = "ethereum|solana")]
        wallet: WalletKind,
        /// Hex key for Ethereum, base58 for Solana
        #[arg(long, value_name = "KEY", env = "WEB3_SIGNIN_WALLET_KEY", hide_env_values = true)]
        key: String,
        /// Decline the connect or sign popup
        #[arg(long, value_enum)]
        reject: Option<RejectStage>,
        /// Inject the wallet only after this many milliseconds
        #[arg(long, value_name = "MS")]
        inject_after_ms: Option<u64>,
    },
    /// Show the user behind an access token
    Status {
        #[arg(long, value_name = "TOKEN")]
        access_token: String,
    },
    /// Revoke the session behind an access token
    SignOut {
        #[arg(long, value_name = "TOKEN")]
        access_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = load_config(args.config_path.as_deref())?;
    info!(url = ?config.service.url, "configuration loaded");

    match args.command {
        Command::SignIn {
            wallet,
            key,
            reject,
            inject_after_ms,
        } => {
            let provider = local_wallet(wallet, &key, reject)?;
            let (state, token) = commands::sign_in(
                config,
                provider,
                inject_after_ms.map(Duration::from_millis),
            )
            .await?;
            info!(authenticated = state.is_authenticated(), "sign-in finished");
            if let Some(token) = token {
                println!("{} {token}", style("access token:").bold());
            }
        }
        Command::Status { access_token } => {
            commands::status(&config, &access_token).await?;
        }
        Command::SignOut { access_token } => {
            commands::sign_out(config, &access_token).await?;
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}
