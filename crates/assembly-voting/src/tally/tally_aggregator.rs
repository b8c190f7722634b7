use crate::{
    ballot::VoteLedger,
    session::{SessionState, VotingSessionInfo},
};

use super::{ParticipantDirectory, ParticipantVote, TallyCounts, TallySnapshot};

/// Derives the tally snapshots of a session from its ledger.
/// The sequence counter is owned by the session, the computation itself is pure.
#[derive(Debug, Default)]
pub struct TallyAggregator {
    sequence: u64,
}

impl TallyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    /// Compute the snapshot superseding the last one.
    pub fn next_snapshot(
        &mut self,
        info: &VotingSessionInfo,
        state: SessionState,
        ledger: &VoteLedger,
        directory: &dyn ParticipantDirectory,
    ) -> TallySnapshot {
        self.sequence += 1;
        Self::compute(info, state, ledger, directory, self.sequence)
    }

    /// Compute the snapshot of the ledger with the given sequence number.
    pub fn compute(
        info: &VotingSessionInfo,
        state: SessionState,
        ledger: &VoteLedger,
        directory: &dyn ParticipantDirectory,
        sequence: u64,
    ) -> TallySnapshot {
        let mut counts = TallyCounts::default();
        let votes = ledger
            .all()
            .iter()
            .map(|ballot| {
                counts.add(ballot.value);
                ParticipantVote {
                    label: directory.label_or_default(&ballot.voter),
                    identity: ballot.voter,
                    value: ballot.value,
                }
            })
            .collect::<Vec<_>>();

        let total = counts.total();
        if total > info.expected_participants {
            log::warn!(
                "Session {} has more ballots ({}) than expected participants ({})",
                info.id,
                total,
                info.expected_participants
            );
        }

        TallySnapshot {
            session_id: info.id,
            state,
            sequence,
            counts,
            total,
            expected: info.expected_participants,
            votes,
        }
    }
}
