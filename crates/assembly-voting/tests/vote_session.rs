use assembly_test::test;
use assembly_voting::{
    ballot::BallotValue,
    broadcast::{BroadcastHub, ChannelSubscriber},
    identity::ClientIdentity,
    session::{BallotRejection, NewVotingSession, SessionError, SessionState, VoteSession, VotingSessions},
    tally::{ParticipantRoster, TallyCounts, TallySnapshot},
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn create_sessions() -> VotingSessions {
    VotingSessions::new(BroadcastHub::new(), Arc::new(ParticipantRoster::new()))
}

async fn create_open_session(sessions: &VotingSessions, expected: usize) -> Arc<VoteSession> {
    let session = sessions
        .create(NewVotingSession::new(Uuid::new_v4(), "Resolution 1", expected))
        .await
        .unwrap();
    session.open().await.unwrap();
    session
}

fn drain(receiver: &mut UnboundedReceiver<TallySnapshot>) -> Vec<TallySnapshot> {
    let mut snapshots = Vec::new();
    while let Ok(snapshot) = receiver.try_recv() {
        snapshots.push(snapshot);
    }
    snapshots
}

fn counts(in_favor: usize, against: usize, abstain: usize) -> TallyCounts {
    TallyCounts {
        in_favor,
        against,
        abstain,
    }
}

#[test]
async fn duplicate_vote_keeps_the_first_ballot() {
    let sessions = create_sessions();
    let session = create_open_session(&sessions, 10).await;
    let (monitor, mut updates) = ChannelSubscriber::channel();
    session.attach_monitor(monitor).await;
    let voter = ClientIdentity::new_random();

    log::info!("Casting the first ballot...");
    let receipt = session.cast_ballot(voter, BallotValue::InFavor).await.unwrap();
    let snapshots = drain(&mut updates);
    let last = snapshots.last().unwrap();
    assert_eq!(last.sequence, receipt.sequence);
    assert_eq!(last.counts, counts(1, 0, 0));

    log::info!("Casting a second ballot with the same identity...");
    let rejection = session.cast_ballot(voter, BallotValue::Against).await.unwrap_err();
    assert_eq!(rejection, BallotRejection::DuplicateVote);
    assert!(drain(&mut updates).is_empty());

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.counts, counts(1, 0, 0));
    assert_eq!(snapshot.sequence, receipt.sequence);
    assert_eq!(session.ballot_count().await, 1);
}

#[test]
async fn closed_session_rejects_ballots() {
    let sessions = create_sessions();
    let session = create_open_session(&sessions, 10).await;
    session
        .cast_ballot(ClientIdentity::new_random(), BallotValue::Abstain)
        .await
        .unwrap();

    session.close().await.unwrap();
    assert_eq!(session.state().await, SessionState::Closed);

    let rejection = session
        .cast_ballot(ClientIdentity::new_random(), BallotValue::InFavor)
        .await
        .unwrap_err();
    assert_eq!(rejection, BallotRejection::Closed);
    assert_eq!(session.ballot_count().await, 1);
}

#[test]
async fn scheduled_session_rejects_ballots() {
    let sessions = create_sessions();
    let session = sessions
        .create(NewVotingSession::new(Uuid::new_v4(), "Resolution 2", 3))
        .await
        .unwrap();
    assert_eq!(session.state().await, SessionState::Scheduled);

    let rejection = session
        .cast_ballot(ClientIdentity::new_random(), BallotValue::InFavor)
        .await
        .unwrap_err();
    assert_eq!(rejection, BallotRejection::NotOpen);
    assert!(!rejection.is_validation());
    assert_eq!(session.ballot_count().await, 0);
}

#[test]
async fn disallowed_value_is_a_validation_error() {
    let sessions = create_sessions();
    let session = sessions
        .create(
            NewVotingSession::new(Uuid::new_v4(), "Yes or no", 3)
                .with_allowed_values(vec![BallotValue::InFavor, BallotValue::Against]),
        )
        .await
        .unwrap();
    session.open().await.unwrap();

    let rejection = session
        .cast_ballot(ClientIdentity::new_random(), BallotValue::Abstain)
        .await
        .unwrap_err();
    assert_eq!(rejection, BallotRejection::ValueNotAllowed(BallotValue::Abstain));
    assert!(rejection.is_validation());
    assert_eq!(session.ballot_count().await, 0);
}

#[test]
async fn session_requires_allowed_values() {
    let sessions = create_sessions();
    let result = sessions
        .create(NewVotingSession::new(Uuid::new_v4(), "Nothing to choose", 3).with_allowed_values(vec![]))
        .await;
    assert!(matches!(result, Err(SessionError::NoAllowedValues)));
}

#[test]
async fn transitions_are_linear() {
    let sessions = create_sessions();
    let session = sessions
        .create(NewVotingSession::new(Uuid::new_v4(), "Resolution 3", 3))
        .await
        .unwrap();

    assert_eq!(
        session.close().await.unwrap_err(),
        SessionError::InvalidTransition {
            action: "close",
            state: SessionState::Scheduled
        }
    );
    session.open().await.unwrap();
    assert_eq!(
        session.open().await.unwrap_err(),
        SessionError::InvalidTransition {
            action: "open",
            state: SessionState::Open
        }
    );
    session.close().await.unwrap();
    assert!(session.open().await.is_err());
    assert!(session.close().await.is_err());
}

#[test]
async fn two_monitors_receive_identical_snapshots() {
    let sessions = create_sessions();
    let session = create_open_session(&sessions, 10).await;

    let (monitor_a, mut updates_a) = ChannelSubscriber::channel();
    let (monitor_b, mut updates_b) = ChannelSubscriber::channel();
    session.attach_monitor(monitor_a).await;
    session.attach_monitor(monitor_b).await;
    drain(&mut updates_a);
    drain(&mut updates_b);

    session
        .cast_ballot(ClientIdentity::new_random(), BallotValue::Against)
        .await
        .unwrap();

    let snapshots_a = drain(&mut updates_a);
    let snapshots_b = drain(&mut updates_b);
    assert_eq!(snapshots_a.len(), 1);
    assert_eq!(snapshots_a, snapshots_b);
    assert_eq!(snapshots_a[0].counts, counts(0, 1, 0));
}

#[test]
async fn close_publishes_the_final_tally_once() {
    let sessions = create_sessions();
    let session = create_open_session(&sessions, 2).await;
    let (monitor, mut updates) = ChannelSubscriber::channel();
    session.attach_monitor(monitor).await;

    session
        .cast_ballot(ClientIdentity::new_random(), BallotValue::InFavor)
        .await
        .unwrap();
    let final_snapshot = session.close().await.unwrap();
    assert!(final_snapshot.is_final());
    assert_eq!(final_snapshot.missing(), 1);

    let snapshots = drain(&mut updates);
    assert_eq!(snapshots.last(), Some(&final_snapshot));
    assert_eq!(snapshots.iter().filter(|s| s.is_final()).count(), 1);
    assert!(sessions.hub().is_sealed(session.id()).await);

    log::info!("A monitor attaching after close gets the final tally...");
    let (late_monitor, mut late_updates) = ChannelSubscriber::channel();
    session.attach_monitor(late_monitor).await;
    assert_eq!(drain(&mut late_updates), vec![final_snapshot]);
    assert!(drain(&mut updates).is_empty());
}

#[test]
async fn concurrent_ballots_produce_gap_free_sequences() {
    const VOTERS: usize = 64;

    let sessions = create_sessions();
    let session = create_open_session(&sessions, VOTERS).await;
    let (monitor, mut updates) = ChannelSubscriber::channel();
    session.attach_monitor(monitor).await;

    let voters = (0..VOTERS).map(|_| ClientIdentity::new_random()).collect::<Vec<_>>();
    let tasks = voters
        .iter()
        .enumerate()
        .flat_map(|(i, voter)| {
            // every voter tries twice with different values
            [BallotValue::ALL[i % 3], BallotValue::ALL[(i + 1) % 3]]
                .into_iter()
                .map(move |value| (*voter, value))
        })
        .map(|(voter, value)| {
            let session = session.clone();
            tokio::spawn(async move { session.cast_ballot(voter, value).await })
        })
        .collect::<Vec<_>>();

    let mut accepted = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(BallotRejection::DuplicateVote) => duplicates += 1,
            Err(err) => panic!("unexpected rejection: {err}"),
        }
    }
    assert_eq!(accepted, VOTERS);
    assert_eq!(duplicates, VOTERS);

    let snapshots = drain(&mut updates);
    // the current snapshot at attach, then one per accepted ballot
    assert_eq!(snapshots.len(), VOTERS + 1);
    for pair in snapshots.windows(2) {
        assert_eq!(pair[1].sequence, pair[0].sequence + 1);
        assert!(pair[1].total >= pair[0].total);
    }
    for snapshot in &snapshots {
        assert_eq!(snapshot.counts.total(), snapshot.total);
        assert_eq!(snapshot.votes.len(), snapshot.total);
    }

    let ballots = session.ballots().await;
    assert_eq!(ballots.len(), VOTERS);
    let mut distinct = ballots.iter().map(|b| b.voter).collect::<Vec<_>>();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), VOTERS);
}
