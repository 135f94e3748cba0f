//! HTTP front end: JSON views over the Linear queries and mutations.

mod handlers;
mod session;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::client::LinearClient;
use crate::oauth::OAuthManager;
use crate::session::SessionStore;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Everything the handlers share. The client is immutable after start-up.
pub struct AppState {
    pub client: LinearClient,
    pub oauth: OAuthManager,
    pub sessions: SessionStore,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(client: LinearClient, oauth: OAuthManager) -> Self {
        Self {
            client,
            oauth,
            sessions: SessionStore::new(),
        }
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::index))
        .route("/projects", get(handlers::projects))
        .route("/roadmap", get(handlers::roadmap))
        .route("/issue/{id}", get(handlers::issue_detail))
        .route("/api/update_issue/{id}", post(handlers::update_issue))
        .route("/api/add_comment/{id}", post(handlers::add_comment))
        .route("/login", get(handlers::login))
        .route("/auth/callback", get(handlers::auth_callback))
        .route("/logout", get(handlers::logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl+C.
pub async fn serve(state: SharedState, port: u16) -> Result<()> {
    if !state.oauth.is_configured() {
        info!("OAuth credentials not set, login is disabled");
    }
    tokio::spawn(purge_sessions(state.clone()));

    let app = build_router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Linear roadmap running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn purge_sessions(state: SharedState) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;
        let purged = state.sessions.purge_expired(Utc::now());
        if purged > 0 {
            debug!(purged, remaining = state.sessions.len(), "Dropped expired sessions");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::{OAuthConfig, AUTHORIZE_URL};
    use crate::session::{SessionUser, SESSION_COOKIE};
    use crate::types::Viewer;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, Response, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    fn oauth_config(server: &MockServer, configured: bool) -> OAuthConfig {
        OAuthConfig {
            client_id: configured.then(|| "client-123".to_string()),
            client_secret: configured.then(|| "secret-456".to_string()),
            redirect_uri: "http://localhost:5000/auth/callback".to_string(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: format!("{}/oauth/token", server.uri()),
        }
    }

    fn test_state(server: &MockServer, oauth_configured: bool) -> SharedState {
        let client = LinearClient::new(Some("lin_api_app".into()), Duration::from_secs(5))
            .unwrap()
            .with_endpoint(server.uri());
        let oauth = OAuthManager::new(client.clone(), oauth_config(server, oauth_configured));
        Arc::new(AppState::new(client, oauth))
    }

    async fn send(state: &SharedState, request: Request<Body>) -> Response<Body> {
        build_router(state.clone()).oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` part of the session cookie set on `response`.
    fn session_cookie(response: &Response<Body>) -> String {
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        header.split(';').next().unwrap().to_string()
    }

    fn location(response: &Response<Body>) -> &str {
        response.headers()[LOCATION].to_str().unwrap()
    }

    async fn mount_teams(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_string_contains("query Teams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "teams": { "nodes": [{ "id": "t1", "name": "Engineering", "key": "ENG" }] } }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        let state = test_state(&server, false);
        let response = send(&state, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_index_lists_teams() {
        let server = MockServer::start().await;
        mount_teams(&server).await;
        let state = test_state(&server, false);

        let response = send(&state, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["teams"][0]["key"], "ENG");
        assert!(body["user"].is_null());
        assert_eq!(body["auth"], "anonymous");
        assert!(body["notice"].is_null());
    }

    #[tokio::test]
    async fn test_cookieless_views_store_no_session() {
        let server = MockServer::start().await;
        mount_teams(&server).await;
        let state = test_state(&server, false);

        for _ in 0..20 {
            let response = send(&state, get("/")).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(SET_COOKIE).is_none());
        }
        assert_eq!(state.sessions.len(), 0);
    }

    #[tokio::test]
    async fn test_projects_without_team_redirects_with_notice() {
        let server = MockServer::start().await;
        mount_teams(&server).await;
        let state = test_state(&server, false);

        let response = send(&state, get("/projects")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let cookie = session_cookie(&response);
        assert!(cookie.starts_with(SESSION_COOKIE));

        let home = Request::builder()
            .uri("/")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let body = json_body(send(&state, home).await).await;
        assert_eq!(body["notice"]["message"], "Please select a team first");

        // The notice is shown once
        let again = Request::builder()
            .uri("/")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let body = json_body(send(&state, again).await).await;
        assert!(body["notice"].is_null());
    }

    #[tokio::test]
    async fn test_roadmap_builds_sorted_columns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("WorkflowStates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "team": { "states": { "nodes": [
                    { "id": "done", "name": "Done", "color": "#0f0", "position": 3.0, "type": "completed" },
                    { "id": "todo", "name": "Todo", "color": "#ccc", "position": 1.0, "type": "unstarted" }
                ] } } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("query Issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "issues": { "nodes": [{
                    "id": "i1",
                    "identifier": "ENG-1",
                    "title": "Ship it",
                    "description": null,
                    "state": { "id": "done", "name": "Done", "color": "#0f0" },
                    "assignee": null,
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": "2024-01-02T00:00:00Z"
                }] } }
            })))
            .mount(&server)
            .await;
        let state = test_state(&server, false);

        let response = send(&state, get("/roadmap?team_id=t1&project_id=p1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["team_id"], "t1");
        assert_eq!(body["project_id"], "p1");
        assert_eq!(body["columns"][0]["state"]["id"], "todo");
        assert_eq!(body["columns"][1]["issues"][0]["identifier"], "ENG-1");
    }

    #[tokio::test]
    async fn test_missing_issue_redirects_home() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "issue": null } })),
            )
            .mount(&server)
            .await;
        let state = test_state(&server, false);

        let response = send(&state, get("/issue/ENG-404")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_update_with_no_fields_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        let state = test_state(&server, false);

        let response = send(&state, post_json("/api/update_issue/ENG-1", json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No valid fields to update");
    }

    #[tokio::test]
    async fn test_update_requires_json_body() {
        let server = MockServer::start().await;
        let state = test_state(&server, false);

        let request = Request::builder()
            .method("POST")
            .uri("/api/update_issue/ENG-1")
            .body(Body::from("title=x"))
            .unwrap();
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_update_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("VerifyIssue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "issue": { "id": "internal-1", "identifier": "ENG-1", "title": "Bug" } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("IssueUpdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "issueUpdate": { "success": true, "issue": null } }
            })))
            .expect(1)
            .mount(&server)
            .await;
        let state = test_state(&server, false);

        let response = send(
            &state,
            post_json("/api/update_issue/ENG-1", json!({ "assigneeId": null })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_comment_requires_text() {
        let server = MockServer::start().await;
        let state = test_state(&server, false);

        let response = send(&state, post_json("/api/add_comment/ENG-1", json!({ "comment": "" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Comment is required");
    }

    #[tokio::test]
    async fn test_comment_on_missing_issue_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("VerifyIssue"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "issue": null } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("commentCreate"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let state = test_state(&server, false);

        let response = send(&state, post_json("/api/add_comment/ENG-9", json!({ "comment": "hi" }))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Issue with ID ENG-9 not found");
    }

    #[tokio::test]
    async fn test_comment_refresh_is_written_back_to_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "INVALID_TOKEN" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("VerifyIssue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "issue": { "id": "internal-1", "identifier": "ENG-1", "title": "Bug" } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("AddCommentInline"))
            .and(wiremock::matchers::header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "INVALID_TOKEN" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("AddCommentInline"))
            .and(wiremock::matchers::header("Authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "commentCreate": { "success": true, "comment": { "id": "c1", "body": "hi" } } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "refresh_token": "r2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_state(&server, true);
        let mut record = crate::session::SessionRecord::new(Utc::now());
        record.user = Some(SessionUser {
            identity: Viewer::unknown(),
            access_token: "stale".to_string(),
            refresh_token: Some("r1".to_string()),
        });
        state.sessions.save("sid", record);

        let request = Request::builder()
            .method("POST")
            .uri("/api/add_comment/ENG-1")
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("{SESSION_COOKIE}=sid"))
            .body(Body::from(json!({ "comment": "hi" }).to_string()))
            .unwrap();
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["commentId"], "c1");

        let stored = state.sessions.load("sid", Utc::now()).unwrap();
        assert_eq!(stored.access_token(), Some("fresh"));
        assert_eq!(stored.user.unwrap().refresh_token.as_deref(), Some("r2"));
    }

    /// Answers the comment mutation after logging the `sid` session out,
    /// as another tab would while the request is in flight.
    struct LogoutWhileCommenting(SharedState);

    impl Respond for LogoutWhileCommenting {
        fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
            let sessions = &self.0.sessions;
            if let Some(mut record) = sessions.load("sid", Utc::now()) {
                record.clear();
                sessions.save("sid", record);
            }
            ResponseTemplate::new(200).set_body_json(json!({
                "data": { "commentCreate": { "success": true, "comment": { "id": "c1", "body": "hi" } } }
            }))
        }
    }

    #[tokio::test]
    async fn test_comment_does_not_undo_concurrent_logout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("VerifyIssue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "issue": { "id": "internal-1", "identifier": "ENG-1", "title": "Bug" } }
            })))
            .mount(&server)
            .await;

        let state = test_state(&server, true);
        Mock::given(method("POST"))
            .and(body_string_contains("AddCommentInline"))
            .respond_with(LogoutWhileCommenting(state.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let mut record = crate::session::SessionRecord::new(Utc::now());
        record.user = Some(SessionUser {
            identity: Viewer::unknown(),
            access_token: "token".to_string(),
            refresh_token: None,
        });
        state.sessions.save("sid", record);

        let request = Request::builder()
            .method("POST")
            .uri("/api/add_comment/ENG-1")
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("{SESSION_COOKIE}=sid"))
            .body(Body::from(json!({ "comment": "hi" }).to_string()))
            .unwrap();
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let stored = state.sessions.load("sid", Utc::now()).unwrap();
        assert!(stored.user.is_none());
    }

    #[tokio::test]
    async fn test_login_without_oauth_config() {
        let server = MockServer::start().await;
        let state = test_state(&server, false);

        let response = send(&state, get("/login")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_login_then_bad_state_callback() {
        let server = MockServer::start().await;
        mount_teams(&server).await;
        let state = test_state(&server, true);

        let response = send(&state, get("/login")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with(AUTHORIZE_URL));
        let cookie = session_cookie(&response);

        let callback = Request::builder()
            .uri("/auth/callback?code=abc&state=forged")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&state, callback).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let home = Request::builder()
            .uri("/")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let body = json_body(send(&state, home).await).await;
        assert_eq!(body["notice"]["level"], "danger");
        assert_eq!(
            body["notice"]["message"],
            "Invalid state parameter. Please try logging in again."
        );
        assert!(body["user"].is_null());
    }

    #[tokio::test]
    async fn test_logout_clears_user() {
        let server = MockServer::start().await;
        mount_teams(&server).await;
        let state = test_state(&server, true);
        let mut record = crate::session::SessionRecord::new(Utc::now());
        record.user = Some(SessionUser {
            identity: Viewer::unknown(),
            access_token: "token".to_string(),
            refresh_token: None,
        });
        state.sessions.save("sid", record);
        let cookie = format!("{SESSION_COOKIE}=sid");

        let logout = Request::builder()
            .uri("/logout")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, logout).await.status(), StatusCode::SEE_OTHER);

        let stored = state.sessions.load("sid", Utc::now()).unwrap();
        assert!(stored.user.is_none());
        assert_eq!(
            stored.notice.map(|n| n.message).as_deref(),
            Some("You have been successfully logged out.")
        );
    }
}
