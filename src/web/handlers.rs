use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::session::BrowserSession;
use super::{AppState, SharedState};
use crate::error::LinearError;
use crate::linear::issues::IssueDetail;
use crate::linear::{issues, projects, states, teams};
use crate::oauth::CallbackParams;
use crate::resilience::{self, CallerAuth, IssueUpdate};
use crate::session::{AuthState, Notice, SessionRecord};
use crate::types::{Project, Team, Viewer};
use crate::workflow::{self, Column};

const SELECT_TEAM_FIRST: &str = "Please select a team first";

#[derive(Serialize)]
struct IndexView {
    teams: Vec<Team>,
    auth: AuthState,
    user: Option<Viewer>,
    notice: Option<Notice>,
}

#[derive(Serialize)]
struct ProjectsView {
    team_id: String,
    projects: Vec<Project>,
    user: Option<Viewer>,
    notice: Option<Notice>,
}

#[derive(Serialize)]
struct RoadmapView {
    team_id: String,
    project_id: Option<String>,
    columns: Vec<Column>,
    user: Option<Viewer>,
    notice: Option<Notice>,
}

#[derive(Serialize)]
struct IssueView {
    #[serde(flatten)]
    detail: IssueDetail,
    user: Option<Viewer>,
    notice: Option<Notice>,
}

/// Body of every `/api` response.
#[derive(Serialize, Debug, Default)]
struct Outcome {
    success: bool,
    #[serde(rename = "commentId", skip_serializing_if = "Option::is_none")]
    comment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Outcome {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                error: Some(message.into()),
                ..Self::default()
            }),
        )
    }
}

fn api_failure(err: &LinearError) -> (StatusCode, Json<Outcome>) {
    let status = match err {
        LinearError::IssueNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    Outcome::failed(status, err.user_message())
}

#[derive(Deserialize)]
pub struct TeamQuery {
    team_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RoadmapQuery {
    team_id: Option<String>,
    project_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    comment: String,
}

fn identity(record: &SessionRecord) -> Option<Viewer> {
    record.user.as_ref().map(|u| u.identity.clone())
}

/// Token for read queries: the process key when one is configured,
/// otherwise whatever the logged-in user holds.
fn read_token(state: &AppState, record: &SessionRecord) -> Option<String> {
    if state.client.has_api_key() {
        None
    } else {
        record.access_token().map(String::from)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Send the browser home with a one-shot notice.
fn redirect_home(state: &AppState, mut session: BrowserSession, notice: Notice) -> Response {
    session.record.notice = Some(notice);
    session.finish(state, Redirect::to("/"))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn index(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut session = BrowserSession::open(&state, &headers);
    let token = read_token(&state, &session.record);
    let mut notice = session.record.take_notice();

    let teams = match teams::list(&state.client, token.as_deref()).await {
        Ok(teams) => teams,
        Err(e) => {
            error!(error = %e, "Failed to load teams");
            notice.get_or_insert(Notice::danger(e.user_message()));
            Vec::new()
        }
    };

    let view = IndexView {
        teams,
        auth: session.record.auth_state(),
        user: identity(&session.record),
        notice,
    };
    session.finish(&state, Json(view))
}

pub async fn projects(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<TeamQuery>,
) -> Response {
    let mut session = BrowserSession::open(&state, &headers);
    let Some(team_id) = non_empty(query.team_id) else {
        return redirect_home(&state, session, Notice::info(SELECT_TEAM_FIRST));
    };
    let token = read_token(&state, &session.record);
    let mut notice = session.record.take_notice();

    let projects = match projects::list(&state.client, token.as_deref(), Some(&team_id)).await {
        Ok(projects) => projects,
        Err(e) => {
            error!(team_id = %team_id, error = %e, "Failed to load projects");
            notice.get_or_insert(Notice::danger(e.user_message()));
            Vec::new()
        }
    };

    let view = ProjectsView {
        team_id,
        projects,
        user: identity(&session.record),
        notice,
    };
    session.finish(&state, Json(view))
}

pub async fn roadmap(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<RoadmapQuery>,
) -> Response {
    let mut session = BrowserSession::open(&state, &headers);
    let Some(team_id) = non_empty(query.team_id) else {
        return redirect_home(&state, session, Notice::info(SELECT_TEAM_FIRST));
    };
    let project_id = non_empty(query.project_id);
    let token = read_token(&state, &session.record);
    let mut notice = session.record.take_notice();

    let loaded = async {
        let states = states::for_team(&state.client, token.as_deref(), &team_id).await?;
        let issues =
            issues::list(&state.client, token.as_deref(), &team_id, project_id.as_deref()).await?;
        Ok::<_, LinearError>(workflow::build_board(states, issues))
    }
    .await;

    let columns = match loaded {
        Ok(columns) => columns,
        Err(e) => {
            error!(team_id = %team_id, error = %e, "Failed to load roadmap");
            notice.get_or_insert(Notice::danger(e.user_message()));
            Vec::new()
        }
    };

    let view = RoadmapView {
        team_id,
        project_id,
        columns,
        user: identity(&session.record),
        notice,
    };
    session.finish(&state, Json(view))
}

pub async fn issue_detail(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut session = BrowserSession::open(&state, &headers);
    let token = read_token(&state, &session.record);

    match issues::detail(&state.client, token.as_deref(), &id).await {
        Ok(detail) => {
            let view = IssueView {
                detail,
                user: identity(&session.record),
                notice: session.record.take_notice(),
            };
            session.finish(&state, Json(view))
        }
        Err(e) => {
            warn!(issue_id = %id, error = %e, "Issue lookup failed");
            redirect_home(&state, session, Notice::info("Issue not found"))
        }
    }
}

pub async fn update_issue(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<IssueUpdate>, JsonRejection>,
) -> Response {
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(issue_id = %id, "Rejected update body: {rejection}");
            return Outcome::failed(StatusCode::BAD_REQUEST, rejection.body_text())
                .into_response();
        }
    };

    let session = BrowserSession::open(&state, &headers);
    let auth = CallerAuth::from_session(&session.record);

    let result = resilience::update_issue(&state.client, &auth, &id, &update).await;
    let response = match result {
        Ok(issue) => {
            info!(issue = %issue.identifier, "Issue updated");
            (StatusCode::OK, Json(Outcome::ok()))
        }
        Err(e) => {
            error!(issue_id = %id, error = %e, "Failed to update issue");
            api_failure(&e)
        }
    };
    session.finish_merged(&state, response, |_| {})
}

pub async fn add_comment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> Response {
    let comment = match body {
        Ok(Json(request)) if !request.comment.trim().is_empty() => request.comment,
        Ok(_) => {
            return Outcome::failed(StatusCode::BAD_REQUEST, "Comment is required").into_response();
        }
        Err(rejection) => {
            warn!(issue_id = %id, "Rejected comment body: {rejection}");
            return Outcome::failed(StatusCode::BAD_REQUEST, rejection.body_text())
                .into_response();
        }
    };

    let session = BrowserSession::open(&state, &headers);
    let mut auth = CallerAuth::from_session(&session.record);

    let result =
        resilience::add_comment(&state.client, &state.oauth, &mut auth, &id, &comment).await;

    let response = match result {
        Ok(created) => (
            StatusCode::OK,
            Json(Outcome {
                comment_id: created.id,
                ..Outcome::ok()
            }),
        ),
        Err(e) => {
            error!(issue_id = %id, error = %e, "Failed to add comment");
            api_failure(&e)
        }
    };
    session.finish_merged(&state, response, |record| auth.write_back(record))
}

pub async fn login(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut session = BrowserSession::open(&state, &headers);

    match state.oauth.begin_login(&mut session.record) {
        Ok(url) => session.finish(&state, Redirect::to(url.as_str())),
        Err(e) => {
            warn!(error = %e, "Cannot start login");
            redirect_home(&state, session, Notice::danger(e.user_message()))
        }
    }
}

pub async fn auth_callback(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut session = BrowserSession::open(&state, &headers);

    let notice = match state.oauth.handle_callback(&mut session.record, params).await {
        Ok(_) => Notice::success("Successfully logged in!"),
        Err(e) => Notice::danger(e.user_message()),
    };
    redirect_home(&state, session, notice)
}

pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let mut session = BrowserSession::open(&state, &headers);
    state.oauth.logout(&mut session.record);
    redirect_home(
        &state,
        session,
        Notice::success("You have been successfully logged out."),
    )
}
