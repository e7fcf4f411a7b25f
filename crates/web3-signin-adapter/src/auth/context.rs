/*
[INPUT]:  Configuration, host environment, auth service and UI reflector
[OUTPUT]: Sign-in / sign-out flows with UI updates and error banner
[POS]:    Auth layer - explicit context tying every component together
[UPDATE]: When flow orchestration or UI wiring changes
*/

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::{
    AuthBridge, AuthService, Credentials, HostEnvironment, SessionObserver, locator, negotiator,
    statement,
};
use crate::config::SigninConfig;
use crate::error::{Result, SigninError, classify_service_error};
use crate::types::{IntegrationShape, SessionState, WalletKind};
use crate::ui::{Control, ErrorBanner, UiReflector, reflect};
use crate::wallet::ProviderHandle;

struct ContextInner {
    config: SigninConfig,
    kinds: Vec<WalletKind>,
    host: Arc<dyn HostEnvironment>,
    service: Arc<dyn AuthService>,
    observer: SessionObserver,
    bridge: AuthBridge,
    ui: Arc<dyn UiReflector>,
    banner: ErrorBanner,
    in_flight: Mutex<HashSet<WalletKind>>,
    watched: Mutex<Vec<ProviderHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ContextInner {
    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }
}

/// Marks a wallet kind busy for the lifetime of one flow
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<WalletKind>>,
    kind: WalletKind,
}

impl<'a> FlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<WalletKind>>, kind: WalletKind) -> Result<Self> {
        let mut busy = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !busy.insert(kind) {
            return Err(SigninError::FlowInProgress(kind));
        }
        Ok(Self { in_flight, kind })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

/// Application-wide sign-in context
///
/// Created once at startup; clones share the same state. Call
/// [`SigninContext::shutdown`] when the page goes away.
#[derive(Clone)]
pub struct SigninContext {
    inner: Arc<ContextInner>,
}

impl SigninContext {
    pub fn new(
        config: SigninConfig,
        host: Arc<dyn HostEnvironment>,
        service: Arc<dyn AuthService>,
        ui: Arc<dyn UiReflector>,
    ) -> Self {
        let observer = SessionObserver::new(service.clone());
        let bridge = AuthBridge::new(service.clone(), observer.clone())
            .with_template(config.statement.clone())
            .with_settle_delay(config.settle_delay());
        let banner = ErrorBanner::new(ui.clone(), config.error_dismiss());
        let kinds = config.wallet.kinds.clone();

        Self {
            inner: Arc::new(ContextInner {
                config,
                kinds,
                host,
                service,
                observer,
                bridge,
                ui,
                banner,
                in_flight: Mutex::new(HashSet::new()),
                watched: Mutex::new(Vec::new()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn observer(&self) -> &SessionObserver {
        &self.inner.observer
    }

    pub fn config(&self) -> &SigninConfig {
        &self.inner.config
    }

    /// Initial session check, then keep the page in sync with the session
    pub async fn start(&self) -> Result<SessionState> {
        let mut rx = self.inner.observer.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else { break };
                if let Some(state) = state {
                    reflect(inner.ui.as_ref(), &state, &inner.kinds);
                }
            }
        });
        self.inner.track(task);

        match self.inner.observer.refresh().await {
            Ok(state) => {
                reflect(self.inner.ui.as_ref(), &state, &self.inner.kinds);
                Ok(state)
            }
            Err(err) => {
                self.present_error(&err);
                Err(err)
            }
        }
    }

    /// Run the full sign-in flow for one wallet kind
    pub async fn sign_in(&self, kind: WalletKind) -> Result<SessionState> {
        let _guard = FlightGuard::acquire(&self.inner.in_flight, kind).inspect_err(|err| {
            debug!(%kind, error = %err, "sign-in ignored");
        })?;

        let control = Control::SignIn(kind);
        self.inner.banner.hide();
        self.inner.ui.set_loading(control, true);
        let result = self.run_sign_in(kind).await;
        self.inner.ui.set_loading(control, false);

        match &result {
            Ok(_) => info!(%kind, "sign-in completed"),
            Err(err) => {
                if matches!(err, SigninError::NotFound { .. }) {
                    self.inner.ui.set_control_visible(control, false);
                }
                self.present_error(err);
            }
        }
        result
    }

    async fn run_sign_in(&self, kind: WalletKind) -> Result<SessionState> {
        let inner = &self.inner;
        let handle =
            locator::locate(inner.host.as_ref(), kind, inner.config.locate_options()).await?;
        self.watch_provider(&handle);

        let credentials = match inner.config.integration_shape(kind) {
            IntegrationShape::Signed => {
                let connected = negotiator::connect(&handle).await?;
                let signed = statement::sign(&connected, &inner.config.statement).await?;
                statement::verify_identifier(&signed, &connected)?;
                Credentials::Signed(signed)
            }
            IntegrationShape::Delegated => Credentials::Delegated(handle),
        };

        inner.bridge.authenticate(kind, credentials).await
    }

    /// Sign out with the service and refresh the session
    pub async fn sign_out(&self) -> Result<SessionState> {
        let inner = &self.inner;
        inner.banner.hide();
        inner.ui.set_loading(Control::SignOut, true);
        let result = inner
            .service
            .sign_out()
            .await
            .map_err(|err| classify_service_error(err, None));
        inner.ui.set_loading(Control::SignOut, false);

        if let Err(err) = result {
            self.present_error(&err);
            return Err(err);
        }
        info!("signed out");

        self.inner.observer.refresh().await.inspect_err(|err| {
            self.present_error(err);
        })
    }

    /// The single place flow errors reach the user
    pub fn present_error(&self, err: &SigninError) {
        if err.is_user_cancelled() {
            info!(error = %err, "flow cancelled by user");
        } else {
            error!(error = %err, kind = ?err.kind(), "sign-in flow error");
        }
        self.inner.banner.show(&err.user_message());
    }

    /// Re-check the session whenever the wallet reports a change
    fn watch_provider(&self, handle: &ProviderHandle) {
        {
            let mut watched = self
                .inner
                .watched
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            watched.retain(|known| known.provider().is_ok());
            if watched.iter().any(|known| known.same_provider(handle)) {
                return;
            }
            watched.push(handle.clone());
        }

        let Ok(provider) = handle.provider() else {
            return;
        };
        let mut events = provider.subscribe();
        drop(provider);

        let weak: Weak<ContextInner> = Arc::downgrade(&self.inner);
        let kind = handle.kind();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => debug!(%kind, ?event, "wallet notification, refreshing session"),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%kind, skipped, "missed wallet notifications, refreshing session");
                    }
                    Err(RecvError::Closed) => break,
                }
                let Some(inner) = weak.upgrade() else { break };
                let context = SigninContext { inner };
                if let Err(err) = context.inner.observer.refresh().await {
                    context.present_error(&err);
                }
            }
        });
        self.inner.track(task);
    }

    /// Stop background tasks
    pub fn shutdown(&self) {
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        debug!("sign-in context shut down");
    }
}
