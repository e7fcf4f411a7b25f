/*
[INPUT]:  Sessions returned by the auth service
[OUTPUT]: Current access token and expiry status
[POS]:    HTTP layer - in-memory holder for the service session
[UPDATE]: When session fields or expiry rules change
*/

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::types::Session;

const FALLBACK_LIFETIME_SECONDS: i64 = 60 * 60;

/// `now + expires_in`, or the fallback lifetime when that is out of range
fn expiry_from_lifetime(now: DateTime<Utc>, expires_in: Option<u64>) -> DateTime<Utc> {
    let fallback = TimeDelta::seconds(FALLBACK_LIFETIME_SECONDS);
    expires_in
        .and_then(|seconds| i64::try_from(seconds).ok())
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(now + fallback)
}

/// Session plus the instant it stops being valid
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub session: Session,
    pub expires_at: DateTime<Utc>,
}

/// Thread-safe holder for the session the service handed out
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    data: Arc<RwLock<Option<StoredSession>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session, deriving its expiry from `expires_at` or `expires_in`
    pub fn set(&self, session: Session) {
        let expires_at = session
            .expires_at
            .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
            .unwrap_or_else(|| expiry_from_lifetime(Utc::now(), session.expires_in));

        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(StoredSession {
            session,
            expires_at,
        });
    }

    pub fn access_token(&self) -> Option<String> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|data| data.session.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .and_then(|data| data.session.refresh_token.clone())
    }

    /// True when empty or past expiry
    pub fn is_expired(&self) -> bool {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(data) => Utc::now() > data.expires_at,
            None => true,
        }
    }

    pub fn session(&self) -> Option<Session> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|data| data.session.clone())
    }

    pub fn clear(&self) {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: Option<u64>, expires_at: Option<i64>) -> Session {
        Session {
            access_token: "token".to_string(),
            token_type: Some("bearer".to_string()),
            expires_in,
            expires_at,
            refresh_token: Some("refresh".to_string()),
            user: None,
        }
    }

    #[test]
    fn test_new_slot_is_empty() {
        let slot = SessionSlot::new();
        assert!(slot.access_token().is_none());
        assert!(slot.is_expired());
    }

    #[test]
    fn test_set_and_clear() {
        let slot = SessionSlot::new();
        slot.set(session(Some(3600), None));
        assert_eq!(slot.access_token(), Some("token".to_string()));
        assert_eq!(slot.refresh_token(), Some("refresh".to_string()));
        assert!(!slot.is_expired());

        slot.clear();
        assert!(slot.session().is_none());
        assert!(slot.is_expired());
    }

    #[test]
    fn test_absolute_expiry_in_the_past() {
        let slot = SessionSlot::new();
        slot.set(session(Some(3600), Some(1_000)));
        assert!(slot.is_expired());
    }

    #[test]
    fn test_out_of_range_lifetime_falls_back() {
        let slot = SessionSlot::new();
        slot.set(session(Some(100_000_000_000_000_000), None));
        assert!(!slot.is_expired());

        let now = Utc::now();
        let expiry = expiry_from_lifetime(now, Some(u64::MAX));
        assert_eq!(expiry, now + TimeDelta::seconds(FALLBACK_LIFETIME_SECONDS));
    }
}
