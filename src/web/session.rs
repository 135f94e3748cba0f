//! Cookie plumbing between axum requests and the session store.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use super::AppState;
use crate::session::{new_session_id, SessionRecord, SESSION_COOKIE, SESSION_TTL_DAYS};

/// Value of the cookie called `name`, if the request carries one.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// The session of the browser behind one request.
pub struct BrowserSession {
    id: String,
    /// Whether the request named a live stored session.
    resumed: bool,
    pub record: SessionRecord,
}

impl BrowserSession {
    /// Resume the session named by the request cookie or start a new one.
    pub fn open(state: &AppState, headers: &HeaderMap) -> Self {
        let now = Utc::now();
        if let Some(id) = cookie_value(headers, SESSION_COOKIE) {
            if let Some(record) = state.sessions.load(id, now) {
                return Self {
                    id: id.to_string(),
                    resumed: true,
                    record,
                };
            }
        }
        Self {
            id: new_session_id(),
            resumed: false,
            record: SessionRecord::new(now),
        }
    }

    /// Store the record and attach the session cookie to `response`.
    ///
    /// A new session that holds nothing is dropped without a cookie.
    pub fn finish(self, state: &AppState, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if !self.resumed && self.record.is_blank() {
            return response;
        }

        let cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.id,
            SESSION_TTL_DAYS * 24 * 60 * 60
        );
        state.sessions.save(&self.id, self.record);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
        response
    }

    /// Finish a request that held the record across slow remote calls.
    ///
    /// `merge` is applied to the record as stored now, so changes made by
    /// other requests in the meantime (a logout, say) are kept.
    pub fn finish_merged(
        mut self,
        state: &AppState,
        response: impl IntoResponse,
        merge: impl FnOnce(&mut SessionRecord),
    ) -> Response {
        if self.resumed {
            let now = Utc::now();
            self.record = state
                .sessions
                .load(&self.id, now)
                .unwrap_or_else(|| SessionRecord::new(now));
        }
        merge(&mut self.record);
        self.finish(state, response)
    }
}
