/*
[INPUT]:  Solana private key (base58) and connect/sign calls
[OUTPUT]: Public key on connect and raw ed25519 signatures
[POS]:    Wallet layer - key-backed Solana provider
[UPDATE]: When Solana key formats or wallet methods change
*/

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use solana_keypair::Keypair;
use solana_signer::Signer;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{ProviderError, Result, SigninError};
use crate::types::WalletKind;
use crate::wallet::{ApprovalPolicy, ConnectOptions, ProviderEvent, WalletProvider};

const EVENT_CAPACITY: usize = 16;

/// Solana provider backed by a local keypair, shaped like an injected
/// Phantom-style wallet.
pub struct LocalSolanaWallet {
    keypair: Keypair,
    address: String,
    approval: ApprovalPolicy,
    trusted: bool,
    connected: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalSolanaWallet {
    /// Create a wallet from a base58-encoded private key
    /// Supports 64-byte keypair or 32-byte seed
    pub fn new(private_key_base58: &str) -> Result<Self> {
        let bytes = bs58::decode(private_key_base58.trim())
            .into_vec()
            .map_err(|e| SigninError::Config(format!("Invalid base58 private key: {e}")))?;

        let keypair = match bytes.len() {
            64 => Keypair::try_from(bytes.as_slice())
                .map_err(|e| SigninError::Config(format!("Invalid keypair bytes: {e}")))?,
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                Keypair::new_from_array(seed)
            }
            len => {
                return Err(SigninError::Config(format!(
                    "Invalid private key length: expected 32 or 64 bytes, got {len}"
                )));
            }
        };

        let address = keypair.pubkey().to_string();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            keypair,
            address,
            approval: ApprovalPolicy::default(),
            trusted: false,
            connected: AtomicBool::new(false),
            events,
        })
    }

    pub fn with_approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = approval;
        self
    }

    /// Mark the site as previously approved, enabling silent connects
    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn open(&self, options: ConnectOptions) -> std::result::Result<String, ProviderError> {
        if options.only_if_trusted && !self.trusted {
            return Err(ProviderError::user_rejected());
        }
        self.approval.check_connect()?;
        if !self.connected.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(ProviderEvent::Connect);
        }
        Ok(self.address.clone())
    }
}

#[async_trait]
impl WalletProvider for LocalSolanaWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Solana
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn public_identifier(&self) -> Option<String> {
        self.is_connected().then(|| self.address.clone())
    }

    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderError> {
        debug!(method, "solana wallet request");
        match method {
            "connect" => {
                let only_if_trusted = params
                    .get("onlyIfTrusted")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let public_key = self.open(ConnectOptions { only_if_trusted })?;
                Ok(json!({ "publicKey": public_key }))
            }
            "disconnect" => {
                if self.connected.swap(false, Ordering::SeqCst) {
                    let _ = self.events.send(ProviderEvent::Disconnect);
                }
                Ok(Value::Null)
            }
            other => Err(ProviderError::unsupported(other)),
        }
    }

    async fn connect(&self, options: ConnectOptions) -> std::result::Result<Option<String>, ProviderError> {
        self.open(options).map(Some)
    }

    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Vec<u8>, ProviderError> {
        if !self.is_connected() {
            return Err(ProviderError::unauthorized("wallet is not connected"));
        }
        self.approval.check_sign()?;
        let signature = self.keypair.sign_message(message);
        Ok(signature.as_ref().to_vec())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
