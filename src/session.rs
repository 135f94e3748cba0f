//! Typed browser session records with a sliding expiry.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::types::Viewer;

pub const SESSION_COOKIE: &str = "linear_roadmap_session";
pub const SESSION_TTL_DAYS: i64 = 7;

/// Where a session is in the OAuth login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Anonymous,
    AwaitingCallback,
    Authenticated,
}

/// Identity and tokens of a logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub identity: Viewer,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Danger,
}

/// One-shot message shown by the next rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Danger,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub oauth_state: Option<String>,
    pub user: Option<SessionUser>,
    pub notice: Option<Notice>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            oauth_state: None,
            user: None,
            notice: None,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }

    pub fn auth_state(&self) -> AuthState {
        if self.user.is_some() {
            AuthState::Authenticated
        } else if self.oauth_state.is_some() {
            AuthState::AwaitingCallback
        } else {
            AuthState::Anonymous
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.access_token.as_str())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.expires_at = now + Duration::days(SESSION_TTL_DAYS);
    }

    /// Drop every field, keeping only the expiry.
    pub fn clear(&mut self) {
        self.oauth_state = None;
        self.user = None;
        self.notice = None;
    }

    /// Nothing worth keeping: no login in progress, no user, no notice.
    pub fn is_blank(&self) -> bool {
        self.oauth_state.is_none() && self.user.is_none() && self.notice.is_none()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

/// In-memory session store keyed by the opaque id in the session cookie.
#[derive(Default)]
pub struct SessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a live session and push its expiry forward.
    ///
    /// Expired records are removed and reported as missing.
    pub fn load(&self, id: &str, now: DateTime<Utc>) -> Option<SessionRecord> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        match records.get_mut(id) {
            Some(record) if record.is_expired(now) => {
                debug!("Session expired, discarding");
                records.remove(id);
                None
            }
            Some(record) => {
                record.touch(now);
                Some(record.clone())
            }
            None => None,
        }
    }

    pub fn save(&self, id: &str, record: SessionRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(id.to_string(), record);
    }

    /// Remove every expired record.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Random hex string from `bytes` bytes of entropy.
pub fn random_token(bytes: usize) -> String {
    (0..bytes)
        .map(|_| format!("{:02x}", rand::random::<u8>()))
        .collect()
}

pub fn new_session_id() -> String {
    random_token(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            identity: Viewer::unknown(),
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
        }
    }

    #[test]
    fn test_auth_state_transitions() {
        let now = Utc::now();
        let mut record = SessionRecord::new(now);
        assert_eq!(record.auth_state(), AuthState::Anonymous);

        record.oauth_state = Some("abc".to_string());
        assert_eq!(record.auth_state(), AuthState::AwaitingCallback);

        record.oauth_state = None;
        record.user = Some(user());
        assert_eq!(record.auth_state(), AuthState::Authenticated);
        assert_eq!(record.access_token(), Some("access"));

        record.clear();
        assert_eq!(record.auth_state(), AuthState::Anonymous);
    }

    #[test]
    fn test_load_slides_expiry() {
        let store = SessionStore::new();
        let start = Utc::now();
        store.save("s1", SessionRecord::new(start));

        let later = start + Duration::days(6);
        let record = store.load("s1", later).unwrap();
        assert_eq!(record.expires_at, later + Duration::days(SESSION_TTL_DAYS));

        // Still alive 6 more days on because the first load pushed it forward
        assert!(store.load("s1", later + Duration::days(6)).is_some());
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let store = SessionStore::new();
        let start = Utc::now();
        store.save("s1", SessionRecord::new(start));

        assert!(store.load("s1", start + Duration::days(8)).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let store = SessionStore::new();
        let now = Utc::now();
        store.save("old", SessionRecord::new(now - Duration::days(10)));
        store.save("fresh", SessionRecord::new(now));

        assert_eq!(store.purge_expired(now), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_take_notice_is_one_shot() {
        let mut record = SessionRecord::new(Utc::now());
        record.notice = Some(Notice::success("Logged in"));
        assert_eq!(record.take_notice(), Some(Notice::success("Logged in")));
        assert_eq!(record.take_notice(), None);
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token(16);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, random_token(16));
    }
}
