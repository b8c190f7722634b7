use crate::{
    ballot::{Ballot, BallotValue, LedgerError, VoteLedger},
    broadcast::{BroadcastHub, Subscriber, SubscriberHandle},
    identity::ClientIdentity,
    tally::{ParticipantDirectory, TallyAggregator, TallySnapshot},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BallotRejection, SessionError, SessionState, VotingSessionInfo};

/// Result of an accepted ballot.
#[derive(Clone, Debug)]
pub struct BallotReceipt {
    pub ballot: Ballot,
    /// Sequence of the snapshot that first includes the ballot.
    pub sequence: u64,
}

impl BallotReceipt {
    pub fn message(&self) -> String {
        format!("Vote registered: {}", self.ballot.value)
    }
}

struct SessionCore {
    state: SessionState,
    ledger: VoteLedger,
    aggregator: TallyAggregator,
    snapshot: TallySnapshot,
}

/// A single voting instance: `Scheduled -> Open -> Closed`.
///
/// Every mutation (and the tally computation with its publishing) is serialized by the session lock,
/// thus ballots are applied in receipt order and the snapshots of the session are published with
/// strictly increasing sequence numbers.
pub struct VoteSession {
    info: VotingSessionInfo,
    core: Mutex<SessionCore>,
    hub: BroadcastHub,
    directory: Arc<dyn ParticipantDirectory>,
}

impl VoteSession {
    pub fn new(info: VotingSessionInfo, hub: BroadcastHub, directory: Arc<dyn ParticipantDirectory>) -> Self {
        let state = SessionState::Scheduled;
        let ledger = VoteLedger::new();
        let aggregator = TallyAggregator::new();
        let snapshot = TallyAggregator::compute(&info, state, &ledger, &*directory, aggregator.last_sequence());

        Self {
            info,
            core: Mutex::new(SessionCore {
                state,
                ledger,
                aggregator,
                snapshot,
            }),
            hub,
            directory,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.info.id
    }

    pub fn info(&self) -> &VotingSessionInfo {
        &self.info
    }

    pub async fn state(&self) -> SessionState {
        self.core.lock().await.state
    }

    /// The latest published snapshot.
    pub async fn snapshot(&self) -> TallySnapshot {
        self.core.lock().await.snapshot.clone()
    }

    pub async fn ballot_count(&self) -> usize {
        self.core.lock().await.ledger.len()
    }

    pub async fn ballots(&self) -> Vec<Ballot> {
        self.core.lock().await.ledger.all().to_vec()
    }

    pub async fn has_voted(&self, identity: &ClientIdentity) -> bool {
        self.core.lock().await.ledger.contains(identity)
    }

    pub async fn open(&self) -> Result<TallySnapshot, SessionError> {
        let mut core = self.core.lock().await;
        if core.state != SessionState::Scheduled {
            return Err(SessionError::InvalidTransition {
                action: "open",
                state: core.state,
            });
        }

        core.state = SessionState::Open;
        log::info!("Voting session {} is open", self.info.id);
        Ok(self.publish_next(&mut core).await)
    }

    /// Close the session: the ledger becomes read-only, the final tally is published once and
    /// no further updates are delivered for the session.
    pub async fn close(&self) -> Result<TallySnapshot, SessionError> {
        let mut core = self.core.lock().await;
        if core.state != SessionState::Open {
            return Err(SessionError::InvalidTransition {
                action: "close",
                state: core.state,
            });
        }

        core.state = SessionState::Closed;
        core.ledger.freeze();
        log::info!(
            "Voting session {} is closed with {} ballot(s)",
            self.info.id,
            core.ledger.len()
        );

        let snapshot = self.publish_next(&mut core).await;
        self.hub.seal(self.info.id).await;
        Ok(snapshot)
    }

    /// Record the ballot of a participant. The first ballot of a participant wins, any later attempt is rejected
    /// and the session is left unchanged.
    pub async fn cast_ballot(
        &self,
        identity: ClientIdentity,
        value: BallotValue,
    ) -> Result<BallotReceipt, BallotRejection> {
        if !self.info.is_allowed(value) {
            return Err(BallotRejection::ValueNotAllowed(value));
        }

        let mut core = self.core.lock().await;
        match core.state {
            SessionState::Scheduled => return Err(BallotRejection::NotOpen),
            SessionState::Closed => return Err(BallotRejection::Closed),
            SessionState::Open => {}
        }

        let ballot = match core.ledger.record(Ballot::new(self.info.id, identity, value)) {
            Ok(ballot) => ballot.clone(),
            Err(LedgerError::AlreadyRecorded(_)) => {
                log::info!("Duplicate ballot of {identity} in session {} ignored", self.info.id);
                return Err(BallotRejection::DuplicateVote);
            }
            Err(LedgerError::Frozen) => return Err(BallotRejection::Closed),
        };
        log::debug!("Ballot of {identity} recorded in session {}: {value}", self.info.id);

        let snapshot = self.publish_next(&mut core).await;
        Ok(BallotReceipt {
            ballot,
            sequence: snapshot.sequence,
        })
    }

    /// Subscribe a monitor to the tally of this session. The current snapshot is delivered to the new
    /// monitor first, followed by every later update.
    pub async fn attach_monitor<S>(&self, subscriber: S) -> SubscriberHandle
    where
        S: Subscriber,
    {
        // holding the session lock no snapshot can be published between the subscription and the catch up
        let core = self.core.lock().await;
        let handle = self.hub.subscribe(self.info.id, subscriber).await;
        if let Err(err) = self.hub.publish_to(&handle, &core.snapshot).await {
            log::warn!("Failed to send the current tally to {handle}: {err}");
        }
        handle
    }

    pub async fn detach_monitor(&self, handle: &SubscriberHandle) -> bool {
        self.hub.unsubscribe(handle).await
    }

    async fn publish_next(&self, core: &mut SessionCore) -> TallySnapshot {
        let SessionCore {
            state,
            ledger,
            aggregator,
            snapshot,
        } = core;

        *snapshot = aggregator.next_snapshot(&self.info, *state, ledger, &*self.directory);
        self.hub.publish(&self.info.id, snapshot).await;
        snapshot.clone()
    }
}
