use crate::{app_state::AppState, controllers::voting::VotingError};
use assembly_infra::web::{
    extracts::{ValidatedJson, ValidatedPath},
    IntoProblemResponse, ProblemConfig, ProblemResponse,
};
use assembly_voting::{
    ballot::BallotValue,
    session::{NewVotingSession, VoteSession},
    tally::TallySnapshot,
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SessionPathParams {
    #[serde(rename = "id")]
    session_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    commission_id: Uuid,
    #[validate(length(min = 1, max = 512))]
    subject: String,
    #[schema(value_type = Option<Vec<String>>)]
    allowed_values: Option<Vec<BallotValue>>,
    scheduled_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 10000))]
    expected_participants: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    id: Uuid,
    commission_id: Uuid,
    subject: String,
    #[schema(value_type = Vec<String>)]
    allowed_values: Vec<BallotValue>,
    created_at: DateTime<Utc>,
    scheduled_at: Option<DateTime<Utc>>,
    expected_participants: usize,
    state: String,
    ballot_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    tally: Option<TallySnapshot>,
}

impl SessionInfo {
    async fn from_session(session: &VoteSession, with_tally: bool) -> Self {
        let info = session.info();
        let snapshot = session.snapshot().await;
        Self {
            id: info.id,
            commission_id: info.commission_id,
            subject: info.subject.clone(),
            allowed_values: info.allowed_values.clone(),
            created_at: info.created_at,
            scheduled_at: info.scheduled_at,
            expected_participants: info.expected_participants,
            state: snapshot.state.to_string(),
            ballot_count: snapshot.total,
            tally: with_tally.then_some(snapshot),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "voting",
    description = "Create a new voting session in the scheduled state.",
    request_body = CreateSessionRequest,
    responses(
        (status = OK, body = SessionInfo)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Extension(problem_config): Extension<ProblemConfig>,
    ValidatedJson(body): ValidatedJson<CreateSessionRequest>,
) -> Result<Json<SessionInfo>, ProblemResponse> {
    let allowed_values = body
        .allowed_values
        .unwrap_or_else(|| state.default_allowed_values().to_vec());
    let mut params = NewVotingSession::new(body.commission_id, body.subject, body.expected_participants)
        .with_allowed_values(allowed_values);
    if let Some(scheduled_at) = body.scheduled_at {
        params = params.with_scheduled_at(scheduled_at);
    }

    let session = state
        .sessions()
        .create(params)
        .await
        .map_err(|err| VotingError::from(err).into_response(&problem_config))?;
    Ok(Json(SessionInfo::from_session(&session, true).await))
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "voting",
    description = "List the voting sessions in creation order.",
    responses(
        (status = OK, body = Vec<SessionInfo>)
    )
)]
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    let mut infos = Vec::new();
    for session in state.sessions().list().await {
        infos.push(SessionInfo::from_session(&session, false).await);
    }
    Json(infos)
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "voting",
    description = "Get a voting session with its current tally.",
    params(
        SessionPathParams
    ),
    responses(
        (status = OK, body = SessionInfo)
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Extension(problem_config): Extension<ProblemConfig>,
    ValidatedPath(path): ValidatedPath<SessionPathParams>,
) -> Result<Json<SessionInfo>, ProblemResponse> {
    let session = state
        .sessions()
        .get(&path.session_id)
        .await
        .map_err(|err| VotingError::from(err).into_response(&problem_config))?;
    Ok(Json(SessionInfo::from_session(&session, true).await))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/open",
    tag = "voting",
    description = "Open a scheduled voting session.",
    params(
        SessionPathParams
    ),
    responses(
        (status = OK, body = SessionInfo)
    )
)]
pub async fn open_session(
    State(state): State<AppState>,
    Extension(problem_config): Extension<ProblemConfig>,
    ValidatedPath(path): ValidatedPath<SessionPathParams>,
) -> Result<Json<SessionInfo>, ProblemResponse> {
    let session = state
        .sessions()
        .get(&path.session_id)
        .await
        .map_err(|err| VotingError::from(err).into_response(&problem_config))?;
    session
        .open()
        .await
        .map_err(|err| VotingError::from(err).into_response(&problem_config))?;
    Ok(Json(SessionInfo::from_session(&session, true).await))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/close",
    tag = "voting",
    description = "Close an open voting session, the final tally is published to the monitors.",
    params(
        SessionPathParams
    ),
    responses(
        (status = OK, body = SessionInfo)
    )
)]
pub async fn close_session(
    State(state): State<AppState>,
    Extension(problem_config): Extension<ProblemConfig>,
    ValidatedPath(path): ValidatedPath<SessionPathParams>,
) -> Result<Json<SessionInfo>, ProblemResponse> {
    let session = state
        .sessions()
        .get(&path.session_id)
        .await
        .map_err(|err| VotingError::from(err).into_response(&problem_config))?;
    session
        .close()
        .await
        .map_err(|err| VotingError::from(err).into_response(&problem_config))?;
    Ok(Json(SessionInfo::from_session(&session, true).await))
}
