//! Issue and comment mutations that tolerate Linear's inconsistent
//! acceptance of request shapes and expired user tokens.

mod comment;
mod update;

pub use comment::add_comment;
pub use update::{update_issue, IssueUpdate};

use crate::oauth::TokenPair;
use crate::session::SessionRecord;

/// Credentials of whoever triggered a mutation.
///
/// With no access token, requests use the process API key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerAuth {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl CallerAuth {
    pub fn api_key() -> Self {
        Self::default()
    }

    pub fn from_session(session: &SessionRecord) -> Self {
        match &session.user {
            Some(user) => Self {
                access_token: Some(user.access_token.clone()),
                refresh_token: user.refresh_token.clone(),
            },
            None => Self::default(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Adopt refreshed tokens, keeping the old refresh token if none was issued.
    pub fn apply(&mut self, tokens: TokenPair) {
        self.access_token = Some(tokens.access_token);
        if let Some(refresh) = tokens.refresh_token {
            self.refresh_token = Some(refresh);
        }
    }

    /// Copy (possibly refreshed) tokens back onto the session's user.
    pub fn write_back(&self, session: &mut SessionRecord) {
        if let (Some(user), Some(access)) = (session.user.as_mut(), self.access_token.as_ref()) {
            user.access_token = access.clone();
            user.refresh_token = self.refresh_token.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;
    use crate::types::Viewer;
    use chrono::Utc;

    #[test]
    fn test_apply_keeps_refresh_token_when_not_rotated() {
        let mut auth = CallerAuth {
            access_token: Some("old".to_string()),
            refresh_token: Some("r1".to_string()),
        };
        auth.apply(TokenPair {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: None,
        });
        assert_eq!(auth.token(), Some("new"));
        assert_eq!(auth.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_session_round_trip() {
        let mut session = SessionRecord::new(Utc::now());
        assert_eq!(CallerAuth::from_session(&session), CallerAuth::api_key());

        session.user = Some(SessionUser {
            identity: Viewer::unknown(),
            access_token: "old".to_string(),
            refresh_token: Some("r1".to_string()),
        });
        let mut auth = CallerAuth::from_session(&session);
        auth.access_token = Some("new".to_string());
        auth.refresh_token = Some("r2".to_string());
        auth.write_back(&mut session);

        let user = session.user.unwrap();
        assert_eq!(user.access_token, "new");
        assert_eq!(user.refresh_token.as_deref(), Some("r2"));
    }
}
