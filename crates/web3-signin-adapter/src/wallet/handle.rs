/*
[INPUT]:  Provider located in the host environment
[OUTPUT]: Non-owning handle valid while the host keeps the provider
[POS]:    Wallet layer - reference held by the flow
[UPDATE]: When handle attributes change
*/

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{Result, SigninError};
use crate::types::WalletKind;
use crate::wallet::WalletProvider;

/// Reference to an injected wallet
///
/// The host owns the provider. Once the host drops it (page unload,
/// extension removed) every call through the handle reports `NotFound`.
#[derive(Clone)]
pub struct ProviderHandle {
    kind: WalletKind,
    namespace: String,
    provider: Weak<dyn WalletProvider>,
}

impl ProviderHandle {
    pub fn new(namespace: impl Into<String>, provider: &Arc<dyn WalletProvider>) -> Self {
        Self {
            kind: provider.kind(),
            namespace: namespace.into(),
            provider: Arc::downgrade(provider),
        }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    /// Host namespace the provider was found under
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_connected(&self) -> bool {
        self.provider
            .upgrade()
            .is_some_and(|provider| provider.is_connected())
    }

    pub fn public_identifier(&self) -> Option<String> {
        self.provider.upgrade()?.public_identifier()
    }

    /// Borrow the live provider for one call
    pub fn provider(&self) -> Result<Arc<dyn WalletProvider>> {
        self.provider
            .upgrade()
            .ok_or(SigninError::NotFound { kind: self.kind })
    }

    /// Whether both handles point at the same injected object
    pub fn same_provider(&self, other: &ProviderHandle) -> bool {
        Weak::ptr_eq(&self.provider, &other.provider)
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("alive", &(self.provider.strong_count() > 0))
            .finish()
    }
}
