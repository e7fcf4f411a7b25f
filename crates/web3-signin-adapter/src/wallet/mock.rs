/*
[INPUT]:  Scripted responses per wallet method
[OUTPUT]: Deterministic provider behaviour and a call log
[POS]:    Wallet layer - test double for flows and integrations
[UPDATE]: When the provider trait gains methods
*/

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::types::WalletKind;
use crate::wallet::{ConnectOptions, ProviderEvent, WalletProvider};

/// Key used in the call log and response script for `connect()`
pub const CONNECT_CALL: &str = "connect()";
/// Key used in the call log and response script for `sign_message()`
pub const SIGN_CALL: &str = "sign_message()";

const MOCK_SIGNATURE: &[u8] = b"mock-signature";

type Script = HashMap<String, VecDeque<Result<Value, ProviderError>>>;

/// Mock wallet provider for testing
///
/// Unscripted calls behave like an approving wallet that owns
/// `identifier`. Scripted responses are consumed in order.
pub struct MockWalletProvider {
    kind: WalletKind,
    identifier: Mutex<Option<String>>,
    connected: AtomicBool,
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWalletProvider {
    pub fn new(kind: WalletKind, identifier: Option<&str>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            kind,
            identifier: Mutex::new(identifier.map(str::to_string)),
            connected: AtomicBool::new(false),
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Queue a response for `method` (or [`CONNECT_CALL`] / [`SIGN_CALL`])
    pub fn push_response(&self, method: &str, response: Result<Value, ProviderError>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Switch the active account, as a user would in the extension
    pub fn switch_account(&self, identifier: &str) {
        *self.identifier.lock().unwrap_or_else(PoisonError::into_inner) = Some(identifier.to_string());
        let _ = self
            .events
            .send(ProviderEvent::AccountsChanged(vec![identifier.to_string()]));
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    /// Methods invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, method: &str) -> Option<Result<Value, ProviderError>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(method.to_string());
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(method)
            .and_then(VecDeque::pop_front)
    }

    fn current_identifier(&self) -> Option<String> {
        self.identifier.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn default_response(&self, method: &str) -> Result<Value, ProviderError> {
        let identifier = self.current_identifier();
        match method {
            "eth_requestAccounts" | "eth_accounts" => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(json!(identifier.into_iter().collect::<Vec<_>>()))
            }
            "connect" | CONNECT_CALL => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(identifier.map_or(Value::Null, |id| json!({ "publicKey": id })))
            }
            "personal_sign" => Ok(json!(format!("0x{}", hex::encode(MOCK_SIGNATURE)))),
            other => Err(ProviderError::unsupported(other)),
        }
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn public_identifier(&self) -> Option<String> {
        self.current_identifier()
    }

    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        match self.record(method) {
            Some(response) => response,
            None => self.default_response(method),
        }
    }

    async fn connect(&self, _options: ConnectOptions) -> Result<Option<String>, ProviderError> {
        let value = match self.record(CONNECT_CALL) {
            Some(response) => response?,
            None => self.default_response(CONNECT_CALL)?,
        };
        self.connected.store(true, Ordering::SeqCst);
        Ok(match value {
            Value::String(public_key) => Some(public_key),
            other => other
                .get("publicKey")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        match self.record(SIGN_CALL) {
            Some(response) => response.map(|value| {
                value
                    .as_str()
                    .map(|text| text.as_bytes().to_vec())
                    .unwrap_or_default()
            }),
            None => Ok(MOCK_SIGNATURE.to_vec()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
