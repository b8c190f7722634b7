use assembly_infra::web::{problems, Problem};
use assembly_voting::session::SessionError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum VotingError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Invalid identity token: {0:?}")]
    InvalidToken(String),
}

impl From<VotingError> for Problem {
    fn from(value: VotingError) -> Self {
        match value {
            VotingError::Session(SessionError::NotFound(id)) => Problem::not_found()
                .with_detail(format!("Voting session {id} not found"))
                .with_extension(id),
            VotingError::Session(err @ SessionError::InvalidTransition { .. }) => {
                Problem::conflict("invalid-session-transition").with_detail(err.to_string())
            }
            VotingError::Session(err @ SessionError::NoAllowedValues) => {
                Problem::bad_request(problems::INPUT_VALIDATION).with_detail(err.to_string())
            }
            err @ VotingError::InvalidToken(_) => {
                Problem::bad_request(problems::INPUT_PATH).with_detail(err.to_string())
            }
        }
    }
}
