/*
[INPUT]:  Method names, params and message bytes from the flow
[OUTPUT]: Raw wallet responses, signatures and change notifications
[POS]:    Wallet layer - injected wallet abstraction
[UPDATE]: When adding provider methods or notification types
*/

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::types::WalletKind;

/// Notifications an injected wallet emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect,
    Disconnect,
    AccountsChanged(Vec<String>),
}

/// Options for the Solana-style `connect()` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Only connect silently if the site was approved before
    pub only_if_trusted: bool,
}

/// Stand-in for the user's answer to wallet popups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalPolicy {
    #[default]
    ApproveAll,
    RejectConnect,
    RejectSign,
}

impl ApprovalPolicy {
    pub(crate) fn check_connect(&self) -> Result<(), ProviderError> {
        match self {
            ApprovalPolicy::RejectConnect => Err(ProviderError::user_rejected()),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_sign(&self) -> Result<(), ProviderError> {
        match self {
            ApprovalPolicy::RejectSign => Err(ProviderError::user_rejected()),
            _ => Ok(()),
        }
    }
}

/// Capability exposed by an injected wallet
///
/// Ethereum wallets speak EIP-1193 `request`; Solana wallets additionally
/// expose `connect` and `sign_message`. Errors are returned raw and only
/// classified by [`crate::error::classify_provider_error`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn kind(&self) -> WalletKind;

    fn is_connected(&self) -> bool;

    /// Address of the connected account, if any
    fn public_identifier(&self) -> Option<String>;

    /// Generic JSON-RPC style request
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Solana-style connect returning the public key
    async fn connect(&self, _options: ConnectOptions) -> Result<Option<String>, ProviderError> {
        Err(ProviderError::unsupported("connect"))
    }

    /// Sign raw message bytes
    async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::unsupported("signMessage"))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
