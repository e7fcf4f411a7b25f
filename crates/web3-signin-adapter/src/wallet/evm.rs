/*
[INPUT]:  EVM private key (hex string) and EIP-1193 requests
[OUTPUT]: Account lists, chain id and EIP-191 signatures
[POS]:    Wallet layer - key-backed Ethereum provider
[UPDATE]: When supported RPC methods or signing format change
*/

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{ProviderError, Result, SigninError};
use crate::types::WalletKind;
use crate::wallet::{ApprovalPolicy, ProviderEvent, WalletProvider};

const EVENT_CAPACITY: usize = 16;

/// Ethereum provider backed by a local private key
///
/// Behaves like an injected EIP-1193 wallet: accounts are only exposed
/// after `eth_requestAccounts` was approved.
pub struct LocalEthereumWallet {
    signer: PrivateKeySigner,
    address: String,
    chain_id: u64,
    approval: ApprovalPolicy,
    connected: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalEthereumWallet {
    /// Create a wallet from a hex-encoded private key
    ///
    /// Supports both "0x"-prefixed and non-prefixed hex strings.
    pub fn new(private_key_hex: &str) -> Result<Self> {
        let private_key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());
        let signer = PrivateKeySigner::from_str(private_key_hex)
            .map_err(|e| SigninError::Config(format!("Invalid EVM private key: {e}")))?;

        let address = signer.address().to_checksum(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            signer,
            address,
            chain_id: 1,
            approval: ApprovalPolicy::default(),
            connected: AtomicBool::new(false),
            events,
        })
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = approval;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn accounts(&self) -> Value {
        if self.is_connected() {
            json!([self.address])
        } else {
            json!([])
        }
    }

    async fn personal_sign(&self, params: &Value) -> std::result::Result<Value, ProviderError> {
        let message = params
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::new(Some(-32602), "personal_sign: missing message"))?;
        let account = params
            .get(1)
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::new(Some(-32602), "personal_sign: missing account"))?;

        if !self.is_connected() || !account.eq_ignore_ascii_case(&self.address) {
            return Err(ProviderError::unauthorized(format!(
                "account {account} has not been authorized"
            )));
        }
        self.approval.check_sign()?;

        let bytes = decode_message_param(message);
        let signature = self.sign_bytes(&bytes).await?;
        Ok(Value::String(format!("0x{}", hex::encode(signature))))
    }

    async fn sign_bytes(&self, message: &[u8]) -> std::result::Result<Vec<u8>, ProviderError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| ProviderError::new(Some(-32603), format!("Failed to sign message: {e}")))?;

        // r, s, v
        Ok(signature.as_bytes().to_vec())
    }
}

/// `personal_sign` carries hex-encoded bytes; plain text is accepted too.
fn decode_message_param(message: &str) -> Vec<u8> {
    message
        .strip_prefix("0x")
        .and_then(|hex_body| hex::decode(hex_body).ok())
        .unwrap_or_else(|| message.as_bytes().to_vec())
}

#[async_trait]
impl WalletProvider for LocalEthereumWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Ethereum
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn public_identifier(&self) -> Option<String> {
        self.is_connected().then(|| self.address.clone())
    }

    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderError> {
        debug!(method, "ethereum wallet request");
        match method {
            "eth_requestAccounts" => {
                self.approval.check_connect()?;
                if !self.connected.swap(true, Ordering::SeqCst) {
                    let _ = self.events.send(ProviderEvent::Connect);
                    let _ = self
                        .events
                        .send(ProviderEvent::AccountsChanged(vec![self.address.clone()]));
                }
                Ok(self.accounts())
            }
            "eth_accounts" => Ok(self.accounts()),
            "eth_chainId" => Ok(Value::String(format!("0x{:x}", self.chain_id))),
            "personal_sign" => self.personal_sign(&params).await,
            other => Err(ProviderError::unsupported(other)),
        }
    }

    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Vec<u8>, ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::unauthorized("wallet is not connected"));
        }
        self.approval.check_sign()?;
        self.sign_bytes(message).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
