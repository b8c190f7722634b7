use crate::{ballot::BallotValue, identity::ClientIdentity, session::SessionState};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyCounts {
    pub in_favor: usize,
    pub against: usize,
    pub abstain: usize,
}

impl TallyCounts {
    pub fn add(&mut self, value: BallotValue) {
        match value {
            BallotValue::InFavor => self.in_favor += 1,
            BallotValue::Against => self.against += 1,
            BallotValue::Abstain => self.abstain += 1,
        }
    }

    pub fn get(&self, value: BallotValue) -> usize {
        match value {
            BallotValue::InFavor => self.in_favor,
            BallotValue::Against => self.against,
            BallotValue::Abstain => self.abstain,
        }
    }

    pub fn total(&self) -> usize {
        self.in_favor + self.against + self.abstain
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantVote {
    pub label: String,
    pub identity: ClientIdentity,
    pub value: BallotValue,
}

/// Point in time view of the tally of a session. A snapshot is never changed,
/// a newer one (with a higher sequence) supersedes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub sequence: u64,
    pub counts: TallyCounts,
    pub total: usize,
    /// Expected number of participants, for display only.
    pub expected: usize,
    pub votes: Vec<ParticipantVote>,
}

impl TallySnapshot {
    /// Number of expected participants without a ballot.
    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.total)
    }

    pub fn is_final(&self) -> bool {
        self.state == SessionState::Closed
    }
}
