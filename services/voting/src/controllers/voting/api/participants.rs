use crate::{app_state::AppState, controllers::voting::VotingError};
use assembly_infra::web::{
    extracts::{ValidatedJson, ValidatedPath},
    IntoProblemResponse, ProblemConfig, ProblemResponse,
};
use assembly_voting::{identity::ClientIdentity, tally::ParticipantDirectory};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPathParams {
    token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLabelRequest {
    #[validate(length(max = 128))]
    label: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    token: String,
    label: String,
}

#[utoipa::path(
    put,
    path = "/api/participants/{token}",
    tag = "voting",
    description = "Set the display label of a participant, an empty label restores the default one.",
    params(
        ParticipantPathParams
    ),
    request_body = ParticipantLabelRequest,
    responses(
        (status = OK, body = Participant)
    )
)]
pub async fn put_participant(
    State(state): State<AppState>,
    Extension(problem_config): Extension<ProblemConfig>,
    ValidatedPath(path): ValidatedPath<ParticipantPathParams>,
    ValidatedJson(body): ValidatedJson<ParticipantLabelRequest>,
) -> Result<Json<Participant>, ProblemResponse> {
    let identity = ClientIdentity::parse(&path.token)
        .ok_or_else(|| VotingError::InvalidToken(path.token.clone()).into_response(&problem_config))?;

    state.roster().set_label(identity, &body.label);
    log::info!("Label of participant {identity} updated");

    Ok(Json(Participant {
        token: identity.to_string(),
        label: state.roster().label_or_default(&identity),
    }))
}
