use crate::{ballot::BallotValue, identity::ClientIdentity};
use thiserror::Error as ThisError;
use uuid::Uuid;

use super::SessionState;

/// Reasons a ballot is not accepted. These are returned as values to the (remote) caller,
/// the session is never modified by a rejected ballot.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum BallotRejection {
    #[error("Invalid ballot value: {0:?}")]
    InvalidValue(String),
    #[error("The ballot value {0} is not allowed in this session")]
    ValueNotAllowed(BallotValue),
    #[error("Voting has not started yet")]
    NotOpen,
    #[error("Voting is closed")]
    Closed,
    #[error("You have already voted in this session")]
    DuplicateVote,
    #[error("Identity handshake is required before voting")]
    IdentityRequired,
    #[error("Malformed identity token: {0:?}")]
    InvalidIdentity(String),
    #[error("Identity {0} is not bound to this connection")]
    IdentityMismatch(ClientIdentity),
    #[error("Voting session {0} not found")]
    SessionNotFound(Uuid),
}

impl BallotRejection {
    /// Validation errors are caused by a malformed request, all others by the state of the session or connection.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BallotRejection::InvalidValue(_) | BallotRejection::ValueNotAllowed(_) | BallotRejection::InvalidIdentity(_)
        )
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum SessionError {
    #[error("Voting session {0} not found")]
    NotFound(Uuid),
    #[error("Cannot {action} a voting session in state {state}")]
    InvalidTransition { action: &'static str, state: SessionState },
    #[error("At least one ballot value must be allowed")]
    NoAllowedValues,
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    #[test]
    fn malformed_requests_are_validation_errors() {
        assert!(BallotRejection::InvalidValue("300".into()).is_validation());
        assert!(BallotRejection::InvalidIdentity("abc".into()).is_validation());
        assert!(!BallotRejection::IdentityRequired.is_validation());
        assert!(!BallotRejection::DuplicateVote.is_validation());
        assert_eq!(
            BallotRejection::InvalidIdentity("abc".into()).to_string(),
            "Malformed identity token: \"abc\""
        );
    }
}
