/*
[INPUT]:  Auth service session and user queries
[OUTPUT]: Published SessionState (watch channel) for UI and callers
[POS]:    Auth layer - single source of authentication truth
[UPDATE]: When session-to-state mapping or publication rules change
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::auth::AuthService;
use crate::error::{Result, classify_service_error};
use crate::types::SessionState;

struct ObserverInner {
    service: Arc<dyn AuthService>,
    /// `None` until the first refresh completes
    state_tx: watch::Sender<Option<SessionState>>,
    next_ticket: AtomicU64,
    published_ticket: Mutex<u64>,
}

/// Queries the auth service and republishes the result
#[derive(Clone)]
pub struct SessionObserver {
    inner: Arc<ObserverInner>,
}

impl SessionObserver {
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(ObserverInner {
                service,
                state_tx,
                next_ticket: AtomicU64::new(0),
                published_ticket: Mutex::new(0),
            }),
        }
    }

    /// Last published state, `None` while still unknown
    pub fn current(&self) -> Option<SessionState> {
        self.inner.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionState>> {
        self.inner.state_tx.subscribe()
    }

    /// Re-query the service and publish the result
    ///
    /// "No session" answers map to `Unauthenticated`; any other service
    /// failure is returned and nothing is published. When calls overlap,
    /// the one started last decides the published state.
    pub async fn refresh(&self) -> Result<SessionState> {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let state = self.query().await?;
        self.publish(ticket, state.clone());
        Ok(state)
    }

    async fn query(&self) -> Result<SessionState> {
        let service = &self.inner.service;

        let session = match service.get_session().await {
            Ok(session) => session,
            Err(err) if err.is_no_session() => None,
            Err(err) => return Err(classify_service_error(err, None)),
        };
        if session.is_none() {
            return Ok(SessionState::Unauthenticated);
        }

        match service.get_user().await {
            Ok(Some(user)) => Ok(SessionState::from(&user)),
            Ok(None) => Ok(SessionState::Unauthenticated),
            Err(err) if err.is_no_session() => Ok(SessionState::Unauthenticated),
            Err(err) => Err(classify_service_error(err, None)),
        }
    }

    fn publish(&self, ticket: u64, state: SessionState) {
        let mut published = self
            .inner
            .published_ticket
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if ticket < *published {
            debug!(ticket, latest = *published, "discarding stale session result");
            return;
        }
        *published = ticket;

        let changed = self.inner.state_tx.send_if_modified(|current| {
            if current.as_ref() == Some(&state) {
                false
            } else {
                *current = Some(state.clone());
                true
            }
        });
        if changed {
            info!(authenticated = state.is_authenticated(), "session state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ServiceError};
    use crate::types::{Session, UserProfile, Web3Credentials};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Service whose answers are set by the test
    #[derive(Default)]
    struct ScriptedService {
        session: Mutex<Option<std::result::Result<Option<Session>, ServiceError>>>,
        user: Mutex<Option<UserProfile>>,
        user_delay: Mutex<Option<Duration>>,
    }

    impl ScriptedService {
        fn signed_in(user_id: &str) -> Self {
            let service = Self::default();
            service.set_user(Some(user_id));
            service
        }

        fn set_user(&self, user_id: Option<&str>) {
            *self.session.lock().unwrap() = Some(Ok(user_id.map(|_| Session {
                access_token: "jwt".to_string(),
                token_type: None,
                expires_in: Some(3600),
                expires_at: None,
                refresh_token: None,
                user: None,
            })));
            *self.user.lock().unwrap() = user_id.map(|id| UserProfile {
                id: id.to_string(),
                email: None,
                user_metadata: serde_json::json!({"wallet_address": "0xabc"}),
                identities: Vec::new(),
            });
        }
    }

    #[async_trait]
    impl AuthService for ScriptedService {
        async fn get_session(&self) -> std::result::Result<Option<Session>, ServiceError> {
            self.session.lock().unwrap().clone().unwrap_or(Ok(None))
        }

        async fn get_user(&self) -> std::result::Result<Option<UserProfile>, ServiceError> {
            let user = self.user.lock().unwrap().clone();
            let delay = *self.user_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(user)
        }

        async fn sign_in_with_web3(
            &self,
            _credentials: Web3Credentials,
        ) -> std::result::Result<Session, ServiceError> {
            Err(ServiceError::new("unused"))
        }

        async fn sign_out(&self) -> std::result::Result<(), ServiceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unknown_until_first_refresh() {
        let observer = SessionObserver::new(Arc::new(ScriptedService::default()));
        assert_eq!(observer.current(), None);

        let state = observer.refresh().await.unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
        assert_eq!(observer.current(), Some(SessionState::Unauthenticated));
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let observer = SessionObserver::new(Arc::new(ScriptedService::signed_in("user-1")));
        let mut rx = observer.subscribe();

        let first = observer.refresh().await.unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        let second = observer.refresh().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.wallet_address(), Some("0xabc"));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_no_session_error_is_silent() {
        let service = ScriptedService::default();
        *service.session.lock().unwrap() = Some(Err(ServiceError::no_session()));
        let observer = SessionObserver::new(Arc::new(service));

        assert_eq!(
            observer.refresh().await.unwrap(),
            SessionState::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_unexpected_failure_surfaces_and_keeps_state() {
        let service = Arc::new(ScriptedService::signed_in("user-1"));
        let observer = SessionObserver::new(service.clone());
        observer.refresh().await.unwrap();

        *service.session.lock().unwrap() =
            Some(Err(ServiceError::new("Database error").with_status(500)));
        let err = observer.refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(observer.current().unwrap().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_refresh_wins_over_slower_earlier_one() {
        let service = Arc::new(ScriptedService::signed_in("user-1"));
        *service.user_delay.lock().unwrap() = Some(Duration::from_millis(500));
        let observer = SessionObserver::new(service.clone());

        let slow = {
            let observer = observer.clone();
            tokio::spawn(async move { observer.refresh().await })
        };
        tokio::task::yield_now().await;

        *service.user_delay.lock().unwrap() = None;
        service.set_user(None);
        let fast = observer.refresh().await.unwrap();
        assert_eq!(fast, SessionState::Unauthenticated);

        let slow = slow.await.unwrap().unwrap();
        assert!(slow.is_authenticated());
        assert_eq!(observer.current(), Some(SessionState::Unauthenticated));
    }
}
