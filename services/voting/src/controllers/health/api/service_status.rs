use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use assembly_voting::session::SessionState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub session_count: usize,
    pub open_session_count: usize,
    pub monitor_count: usize,
    pub participant_label_count: usize,
}

#[utoipa::path(
    get,
    path = "/api/info/status",
    tag = "health",
    responses(
        (status = OK, body = ServiceStatus)
    )
)]
pub async fn get_service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let sessions = state.sessions().list().await;

    let mut open_session_count = 0;
    let mut monitor_count = 0;
    for session in &sessions {
        if session.state().await == SessionState::Open {
            open_session_count += 1;
        }
        monitor_count += state.hub().subscriber_count(session.id()).await;
    }

    Json(ServiceStatus {
        session_count: sessions.len(),
        open_session_count,
        monitor_count,
        participant_label_count: state.roster().len(),
    })
}
