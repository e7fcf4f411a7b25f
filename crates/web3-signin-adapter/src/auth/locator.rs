/*
[INPUT]:  Host environment, wallet kind and a deadline
[OUTPUT]: Handle to the first injected provider found, or NotFound
[POS]:    Auth layer - wallet detection with bounded polling
[UPDATE]: When namespace precedence or polling behaviour changes
*/

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{Result, SigninError};
use crate::types::WalletKind;
use crate::wallet::{ProviderHandle, WalletProvider};

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Global scope the wallets get injected into
pub trait HostEnvironment: Send + Sync {
    fn lookup(&self, namespace: &str) -> Option<Arc<dyn WalletProvider>>;
}

/// In-memory host; providers can be injected or removed at any time
#[derive(Default)]
pub struct InjectedHost {
    slots: RwLock<HashMap<String, Arc<dyn WalletProvider>>>,
}

impl InjectedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, namespace: &str, provider: Arc<dyn WalletProvider>) {
        debug!(namespace, kind = %provider.kind(), "wallet injected");
        self.slots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(namespace.to_string(), provider);
    }

    pub fn remove(&self, namespace: &str) -> Option<Arc<dyn WalletProvider>> {
        self.slots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(namespace)
    }
}

impl HostEnvironment for InjectedHost {
    fn lookup(&self, namespace: &str) -> Option<Arc<dyn WalletProvider>> {
        self.slots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(namespace)
            .cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCATE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Walk the kind's namespaces in precedence order.
///
/// A provider of the wrong kind under a namespace is skipped.
fn scan(host: &dyn HostEnvironment, kind: WalletKind) -> Option<ProviderHandle> {
    kind.namespaces().iter().find_map(|namespace| {
        host.lookup(namespace)
            .filter(|provider| provider.kind() == kind)
            .map(|provider| ProviderHandle::new(*namespace, &provider))
    })
}

/// Find an injected provider, polling until `options.timeout` elapses
pub async fn locate(
    host: &dyn HostEnvironment,
    kind: WalletKind,
    options: LocateOptions,
) -> Result<ProviderHandle> {
    if let Some(handle) = scan(host, kind) {
        debug!(%kind, namespace = handle.namespace(), "wallet found immediately");
        return Ok(handle);
    }

    if options.timeout.is_zero() {
        info!(%kind, "wallet not found, no wait configured");
        return Err(SigninError::NotFound { kind });
    }

    let poll_interval = options.poll_interval.max(Duration::from_millis(1));
    let poll = async {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately and the host was just checked
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Some(handle) = scan(host, kind) {
                return handle;
            }
        }
    };

    match time::timeout(options.timeout, poll).await {
        Ok(handle) => {
            info!(%kind, namespace = handle.namespace(), "wallet located");
            Ok(handle)
        }
        Err(_) => {
            info!(%kind, timeout_ms = options.timeout.as_millis() as u64, "wallet not found");
            Err(SigninError::NotFound { kind })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MockWalletProvider;
    use tokio::time::Instant;

    fn mock(kind: WalletKind, id: &str) -> Arc<dyn WalletProvider> {
        Arc::new(MockWalletProvider::new(kind, Some(id)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_returns_immediately_when_present() {
        let host = InjectedHost::new();
        host.inject("ethereum", mock(WalletKind::Ethereum, "0xabc"));

        let start = Instant::now();
        let handle = locate(&host, WalletKind::Ethereum, LocateOptions::default())
            .await
            .unwrap();
        assert_eq!(handle.kind(), WalletKind::Ethereum);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_times_out() {
        let host = InjectedHost::new();
        let start = Instant::now();
        let err = locate(&host, WalletKind::Solana, LocateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SigninError::NotFound {
                kind: WalletKind::Solana
            }
        ));
        assert!(start.elapsed() >= DEFAULT_LOCATE_TIMEOUT);
        assert!(start.elapsed() < DEFAULT_LOCATE_TIMEOUT + DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_picks_up_late_injection_within_one_interval() {
        let host = Arc::new(InjectedHost::new());
        let injector = host.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(1250)).await;
            injector.inject("solana", mock(WalletKind::Solana, "So1"));
        });

        let start = Instant::now();
        let handle = locate(host.as_ref(), WalletKind::Solana, LocateOptions::default())
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert_eq!(handle.namespace(), "solana");
        assert!(elapsed >= Duration::from_millis(1250));
        assert!(elapsed <= Duration::from_millis(1250) + DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vendor_namespace_wins_over_generic() {
        let host = InjectedHost::new();
        let generic = mock(WalletKind::Solana, "generic");
        let vendor = mock(WalletKind::Solana, "vendor");
        host.inject("solana", generic);
        host.inject("phantom.solana", vendor);

        let handle = locate(&host, WalletKind::Solana, LocateOptions::default())
            .await
            .unwrap();
        assert_eq!(handle.namespace(), "phantom.solana");
        assert_eq!(handle.public_identifier().as_deref(), Some("vendor"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_kind_in_namespace_is_ignored() {
        let host = InjectedHost::new();
        host.inject("solana", mock(WalletKind::Ethereum, "0xabc"));

        let options = LocateOptions {
            timeout: Duration::from_millis(300),
            ..LocateOptions::default()
        };
        assert!(locate(&host, WalletKind::Solana, options).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_checks_once() {
        let options = LocateOptions {
            timeout: Duration::ZERO,
            ..LocateOptions::default()
        };

        let host = InjectedHost::new();
        let start = Instant::now();
        let err = locate(&host, WalletKind::Ethereum, options).await.unwrap_err();
        assert!(matches!(err, SigninError::NotFound { kind: WalletKind::Ethereum }));
        assert_eq!(start.elapsed(), Duration::ZERO);

        host.inject("ethereum", mock(WalletKind::Ethereum, "0xabc"));
        let handle = locate(&host, WalletKind::Ethereum, options).await.unwrap();
        assert_eq!(handle.namespace(), "ethereum");
    }
}
