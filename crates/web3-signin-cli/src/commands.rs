/*
[INPUT]:  Parsed CLI arguments and the sign-in configuration
[OUTPUT]: Completed sign-in, status and sign-out runs
[POS]:    CLI command layer - drives SigninContext from the terminal
[UPDATE]: When adding commands or changing their flow
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use tracing::{info, warn};
use web3_signin_adapter::{
    ApprovalPolicy, HttpAuthService, InjectedHost, LocalEthereumWallet, LocalSolanaWallet,
    ProfileView, Session, SessionObserver, SessionState, SigninConfig, SigninContext, UiReflector,
    WalletKind, WalletProvider,
};

use crate::terminal::TerminalReflector;

/// Extra wait on top of the settle delay for the session re-poll to land
const REPOLL_MARGIN: Duration = Duration::from_millis(250);

/// Wallet popup the local wallet should decline
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RejectStage {
    Connect,
    Sign,
}

impl From<RejectStage> for ApprovalPolicy {
    fn from(stage: RejectStage) -> Self {
        match stage {
            RejectStage::Connect => ApprovalPolicy::RejectConnect,
            RejectStage::Sign => ApprovalPolicy::RejectSign,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("web3-signin").join("config.yaml"))
}

/// Load config from `path` (or the per-user default), then apply env overrides
pub fn load_config(path: Option<&Path>) -> Result<SigninConfig> {
    let config = match path {
        Some(path) => SigninConfig::from_file(path)
            .with_context(|| format!("load config from {}", path.display()))?,
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => SigninConfig::from_file(&path)
                .with_context(|| format!("load config from {}", path.display()))?,
            None => SigninConfig::default(),
        },
    };

    let config = config.apply_env();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Build the in-process wallet that stands in for a browser extension
pub fn local_wallet(
    kind: WalletKind,
    key: &str,
    reject: Option<RejectStage>,
) -> Result<Arc<dyn WalletProvider>> {
    let approval = reject.map(ApprovalPolicy::from).unwrap_or_default();
    let wallet: Arc<dyn WalletProvider> = match kind {
        WalletKind::Ethereum => Arc::new(
            LocalEthereumWallet::new(key)
                .context("invalid Ethereum private key")?
                .with_approval(approval),
        ),
        WalletKind::Solana => Arc::new(
            LocalSolanaWallet::new(key)
                .context("invalid Solana private key")?
                .with_approval(approval),
        ),
    };
    Ok(wallet)
}

fn session_from_token(access_token: &str) -> Session {
    Session {
        access_token: access_token.trim().to_string(),
        token_type: Some("bearer".to_string()),
        expires_in: None,
        expires_at: None,
        refresh_token: None,
        user: None,
    }
}

/// Run the full sign-in flow with a local wallet injected into the host
///
/// Returns the final state and the issued access token.
pub async fn sign_in(
    config: SigninConfig,
    wallet: Arc<dyn WalletProvider>,
    inject_after: Option<Duration>,
) -> Result<(SessionState, Option<String>)> {
    let kind = wallet.kind();
    let namespace = kind
        .namespaces()
        .first()
        .copied()
        .context("wallet kind has no host namespace")?;

    let service = Arc::new(HttpAuthService::from_config(&config).context("create auth client")?);
    let host = Arc::new(InjectedHost::new());
    match inject_after {
        None => host.inject(namespace, wallet),
        Some(delay) => {
            let host = host.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                info!(namespace, "injecting wallet");
                host.inject(namespace, wallet);
            });
        }
    }

    let settle_delay = config.settle_delay();
    let ui = Arc::new(TerminalReflector::new());
    let context = SigninContext::new(config, host, service.clone(), ui);
    context.start().await.context("initial session check")?;

    let result = tokio::select! {
        result = context.sign_in(kind) => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(error = %err, "failed to listen for SIGINT");
            }
            context.shutdown();
            bail!("sign-in interrupted");
        }
    };
    let state = match result {
        Ok(state) => state,
        Err(err) => {
            context.shutdown();
            return Err(err).with_context(|| format!("{kind} sign-in failed"));
        }
    };

    tokio::time::sleep(settle_delay + REPOLL_MARGIN).await;
    let state = context.observer().current().unwrap_or(state);
    context.shutdown();

    Ok((state, service.session_slot().access_token()))
}

/// Show who `access_token` belongs to
pub async fn status(config: &SigninConfig, access_token: &str) -> Result<SessionState> {
    let service = HttpAuthService::from_config(config)
        .context("create auth client")?
        .with_session(session_from_token(access_token));
    let observer = SessionObserver::new(Arc::new(service));
    let state = observer.refresh().await.context("query session")?;

    TerminalReflector::new().show_profile(ProfileView::from_state(&state).as_ref());
    Ok(state)
}

/// End the session behind `access_token`
pub async fn sign_out(config: SigninConfig, access_token: &str) -> Result<SessionState> {
    let service = HttpAuthService::from_config(&config)
        .context("create auth client")?
        .with_session(session_from_token(access_token));
    let ui = Arc::new(TerminalReflector::new());
    let context = SigninContext::new(config, Arc::new(InjectedHost::new()), Arc::new(service), ui);

    let state = context.sign_out().await.context("sign out");
    context.shutdown();
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_reject_stage_maps_to_policy() {
        assert_eq!(
            ApprovalPolicy::from(RejectStage::Connect),
            ApprovalPolicy::RejectConnect
        );
        assert_eq!(ApprovalPolicy::from(RejectStage::Sign), ApprovalPolicy::RejectSign);
    }

    #[test]
    fn test_local_wallet_kinds() {
        let wallet = local_wallet(WalletKind::Ethereum, ETH_KEY, None).unwrap();
        assert_eq!(wallet.kind(), WalletKind::Ethereum);
        assert!(local_wallet(WalletKind::Solana, ETH_KEY, None).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = load_config(Some(Path::new("/nonexistent/web3-signin.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("load config"));
    }
}
