/*
[INPUT]:  Signed statement or delegated provider handle
[OUTPUT]: SessionState from the auth service, plus a delayed re-poll
[POS]:    Auth layer - hands wallet credentials to the auth service
[UPDATE]: When credential shapes or post-sign-in behaviour change
*/

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{AuthService, SessionObserver, StatementTemplate};
use crate::error::{Result, SigninError, classify_service_error};
use crate::types::{SessionState, SignedStatement, WalletKind};
use crate::wallet::ProviderHandle;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// What the bridge submits on behalf of a wallet
#[derive(Debug)]
pub enum Credentials {
    /// Statement already signed by the caller
    Signed(SignedStatement),
    /// The bridge connects and signs through the provider itself
    Delegated(ProviderHandle),
}

impl Credentials {
    fn kind(&self) -> WalletKind {
        match self {
            Credentials::Signed(statement) => statement.kind(),
            Credentials::Delegated(handle) => handle.kind(),
        }
    }
}

/// Submits wallet credentials to the auth service
#[derive(Clone)]
pub struct AuthBridge {
    service: Arc<dyn AuthService>,
    observer: SessionObserver,
    template: StatementTemplate,
    settle_delay: Duration,
}

impl AuthBridge {
    pub fn new(service: Arc<dyn AuthService>, observer: SessionObserver) -> Self {
        Self {
            service,
            observer,
            template: StatementTemplate::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Statement used for delegated sign-ins
    pub fn with_template(mut self, template: StatementTemplate) -> Self {
        self.template = template;
        self
    }

    /// Wait before re-polling the session after a successful sign-in
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Authenticate a `kind` wallet with the given credentials
    pub async fn authenticate(&self, kind: WalletKind, credentials: Credentials) -> Result<SessionState> {
        if credentials.kind() != kind {
            return Err(SigninError::KindMismatch {
                expected: kind,
                actual: credentials.kind(),
            });
        }

        let (session, identifier) = match credentials {
            Credentials::Signed(signed) => {
                let identifier = signed.identifier().to_string();
                let session = self
                    .service
                    .sign_in_with_web3(signed.into_credentials())
                    .await
                    .map_err(|err| classify_service_error(err, Some(kind)))?;
                (session, identifier)
            }
            Credentials::Delegated(handle) => {
                debug!(%kind, "delegated sign-in, the service drives the wallet");
                self.service
                    .sign_in_with_provider(&handle, &self.template)
                    .await?
            }
        };
        info!(%kind, "auth service issued a session");

        let state = match session.user.as_ref() {
            Some(user) => {
                let mut state = SessionState::from(user);
                if let SessionState::Authenticated { wallet_address, .. } = &mut state {
                    wallet_address.get_or_insert(identifier);
                }
                state
            }
            None => self.observer.refresh().await?,
        };

        self.schedule_refresh();
        Ok(state)
    }

    /// Re-poll the session once the service has had time to settle
    pub fn schedule_refresh(&self) -> JoinHandle<()> {
        let observer = self.observer.clone();
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = observer.refresh().await {
                warn!(error = %err, "session re-poll after sign-in failed");
            }
        })
    }
}
