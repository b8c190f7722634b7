use crate::identity::ClientIdentity;
use std::collections::HashMap;
use thiserror::Error as ThisError;

use super::Ballot;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Participant {0} has already voted")]
    AlreadyRecorded(ClientIdentity),
    #[error("Ledger is closed for new ballots")]
    Frozen,
}

/// Append-only record of the ballots of a single session in receipt order.
/// It holds at most one ballot per identity.
#[derive(Debug, Default)]
pub struct VoteLedger {
    ballots: Vec<Ballot>,
    index: HashMap<ClientIdentity, usize>,
    frozen: bool,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The only mutator. The first ballot of an identity wins, later ones are rejected.
    pub fn record(&mut self, ballot: Ballot) -> Result<&Ballot, LedgerError> {
        if self.frozen {
            return Err(LedgerError::Frozen);
        }
        if self.index.contains_key(&ballot.voter) {
            return Err(LedgerError::AlreadyRecorded(ballot.voter));
        }

        let position = self.ballots.len();
        self.index.insert(ballot.voter, position);
        self.ballots.push(ballot);
        Ok(&self.ballots[position])
    }

    pub fn contains(&self, identity: &ClientIdentity) -> bool {
        self.index.contains_key(identity)
    }

    pub fn get(&self, identity: &ClientIdentity) -> Option<&Ballot> {
        self.index.get(identity).map(|position| &self.ballots[*position])
    }

    /// All the ballots in the order they were recorded.
    pub fn all(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    /// Make the ledger read-only.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ballot::BallotValue;
    use assembly_test::test;
    use uuid::Uuid;

    #[test]
    fn first_ballot_wins() {
        let session_id = Uuid::new_v4();
        let voter = ClientIdentity::new_random();
        let mut ledger = VoteLedger::new();

        ledger.record(Ballot::new(session_id, voter, BallotValue::InFavor)).unwrap();
        assert_eq!(
            ledger.record(Ballot::new(session_id, voter, BallotValue::Against)),
            Err(LedgerError::AlreadyRecorded(voter))
        );

        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&voter));
        assert_eq!(ledger.get(&voter).map(|b| b.value), Some(BallotValue::InFavor));
    }

    #[test]
    fn ballots_keep_receipt_order() {
        let session_id = Uuid::new_v4();
        let voters = (0..5).map(|_| ClientIdentity::new_random()).collect::<Vec<_>>();
        let mut ledger = VoteLedger::new();

        for (i, voter) in voters.iter().enumerate() {
            let value = BallotValue::ALL[i % 3];
            ledger.record(Ballot::new(session_id, *voter, value)).unwrap();
        }

        let recorded = ledger.all().iter().map(|b| b.voter).collect::<Vec<_>>();
        assert_eq!(recorded, voters);
    }

    #[test]
    fn frozen_ledger_is_read_only() {
        let session_id = Uuid::new_v4();
        let mut ledger = VoteLedger::new();
        ledger
            .record(Ballot::new(session_id, ClientIdentity::new_random(), BallotValue::Abstain))
            .unwrap();
        ledger.freeze();

        assert!(ledger.is_frozen());
        assert_eq!(
            ledger.record(Ballot::new(session_id, ClientIdentity::new_random(), BallotValue::InFavor)),
            Err(LedgerError::Frozen)
        );
        assert_eq!(ledger.len(), 1);
    }
}
