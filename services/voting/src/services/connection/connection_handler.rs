use crate::app_state::AppState;
use assembly_voting::{
    broadcast::SubscriberHandle,
    identity::{ClientIdentity, ConnectionId},
    session::BallotRejection,
};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BallotInput, ConnectionMonitor, OutboundQueue, RequestMessage, ResponseMessage};

/// Protocol state of a single client connection.
pub struct ConnectionHandler {
    id: ConnectionId,
    state: AppState,
    outbound: OutboundQueue,
    monitors: Mutex<HashMap<Uuid, SubscriberHandle>>,
}

impl ConnectionHandler {
    pub fn with_id(id: ConnectionId, state: AppState, outbound: OutboundQueue) -> Self {
        Self {
            id,
            state,
            outbound,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Handle a text frame of the client. The response is queued to the outbound queue.
    pub async fn handle_text(&self, text: &str) {
        let response = match serde_json::from_str::<RequestMessage>(text) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => {
                log::warn!("[{}] Received invalid message: {err}", self.id);
                Some(ResponseMessage::Error {
                    message: format!("Invalid message: {err}"),
                })
            }
        };
        if let Some(response) = response {
            self.outbound.send(response);
        }
    }

    /// Process a request, the returned acknowledgment is not queued yet. Acknowledgments that
    /// have to precede other messages are queued directly and `None` is returned.
    pub async fn handle_request(&self, request: RequestMessage) -> Option<ResponseMessage> {
        let response = match request {
            RequestMessage::Hello { request_id, label } => self.resolve_identity(request_id, None, label).await,
            RequestMessage::Resume {
                request_id,
                token,
                label,
            } => self.resolve_identity(request_id, Some(token), label).await,
            RequestMessage::CastBallot {
                request_id,
                session_id,
                identity,
                value,
            } => match self.cast_ballot(session_id, identity.as_deref(), &value).await {
                Ok((message, sequence)) => ResponseMessage::BallotResult {
                    request_id,
                    success: true,
                    message,
                    sequence: Some(sequence),
                },
                Err(rejection) => {
                    log::info!("[{}] Ballot rejected in session {session_id}: {rejection}", self.id);
                    ResponseMessage::BallotResult {
                        request_id,
                        success: false,
                        message: rejection.to_string(),
                        sequence: None,
                    }
                }
            },
            RequestMessage::AttachMonitor { request_id, session_id } => {
                return self.attach_monitor(request_id, session_id).await;
            }
            RequestMessage::DetachMonitor { request_id, session_id } => {
                let (success, message) = self.detach_monitor(session_id).await;
                ResponseMessage::MonitorResult {
                    request_id,
                    session_id,
                    success,
                    message,
                }
            }
        };
        Some(response)
    }

    async fn resolve_identity(
        &self,
        request_id: Option<String>,
        token: Option<String>,
        label: Option<String>,
    ) -> ResponseMessage {
        let resolution = self.state.identities().resolve(self.id, token.as_deref()).await;
        if let Some(displaced) = resolution.displaced() {
            log::info!(
                "[{}] Identity {} taken over from {displaced}",
                self.id,
                resolution.identity
            );
        }
        if let Some(label) = label {
            self.state.roster().set_label(resolution.identity, &label);
        }

        ResponseMessage::Identity {
            request_id,
            token: resolution.identity.to_string(),
            resumed: resolution.is_resumed(),
            must_persist: resolution.must_persist(),
        }
    }

    async fn cast_ballot(
        &self,
        session_id: Uuid,
        identity: Option<&str>,
        value: &BallotInput,
    ) -> Result<(String, u64), BallotRejection> {
        let bound = self
            .state
            .identities()
            .identity_of(self.id)
            .await
            .ok_or(BallotRejection::IdentityRequired)?;
        if let Some(identity) = identity {
            match ClientIdentity::parse(identity) {
                Some(identity) if identity == bound => {}
                Some(identity) => return Err(BallotRejection::IdentityMismatch(identity)),
                None => return Err(BallotRejection::InvalidIdentity(identity.to_string())),
            }
        }

        let value = value.to_value()?;
        let session = self
            .state
            .sessions()
            .find(&session_id)
            .await
            .ok_or(BallotRejection::SessionNotFound(session_id))?;
        let receipt = session.cast_ballot(bound, value).await?;
        Ok((receipt.message(), receipt.sequence))
    }

    async fn attach_monitor(&self, request_id: Option<String>, session_id: Uuid) -> Option<ResponseMessage> {
        let rejected = |message: String| {
            Some(ResponseMessage::MonitorResult {
                request_id: request_id.clone(),
                session_id,
                success: false,
                message,
            })
        };

        let Some(session) = self.state.sessions().find(&session_id).await else {
            return rejected(format!("Voting session {session_id} not found"));
        };

        let mut monitors = self.monitors.lock().await;
        if monitors.contains_key(&session_id) {
            return rejected("Already monitoring this session".to_string());
        }

        // the acknowledgment precedes the current tally sent on attach
        self.outbound.send(ResponseMessage::MonitorResult {
            request_id: request_id.clone(),
            session_id,
            success: true,
            message: "Monitor attached".to_string(),
        });
        let handle = session
            .attach_monitor(ConnectionMonitor::new(self.outbound.clone()))
            .await;
        log::debug!("[{}] Monitor {handle} attached", self.id);
        monitors.insert(session_id, handle);
        None
    }

    async fn detach_monitor(&self, session_id: Uuid) -> (bool, String) {
        let handle = self.monitors.lock().await.remove(&session_id);
        match handle {
            Some(handle) => {
                self.state.hub().unsubscribe(&handle).await;
                log::debug!("[{}] Monitor {handle} detached", self.id);
                (true, "Monitor detached".to_string())
            }
            None => (false, "Not monitoring this session".to_string()),
        }
    }

    /// Release every resource of the connection: the monitors are unsubscribed and the identity is unbound.
    pub async fn close(&self) {
        let monitors = std::mem::take(&mut *self.monitors.lock().await);
        for handle in monitors.values() {
            self.state.hub().unsubscribe(handle).await;
        }

        match self.state.identities().release(self.id).await {
            Some(identity) => log::info!(
                "[{}] Connection of {identity} closed, {} monitor(s) detached",
                self.id,
                monitors.len()
            ),
            None => log::info!(
                "[{}] Anonymous connection closed, {} monitor(s) detached",
                self.id,
                monitors.len()
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{app_config::AppConfig, services::connection::OutboundReceiver};
    use assembly_test::test;
    use assembly_voting::{
        ballot::BallotValue,
        session::{NewVotingSession, VoteSession},
        tally::TallyCounts,
    };
    use std::sync::Arc;

    fn create_state() -> AppState {
        AppState::from_config(&AppConfig::default()).unwrap()
    }

    fn connect(state: &AppState) -> (ConnectionHandler, OutboundReceiver) {
        let id = state.identities().new_connection();
        let (outbound, receiver) = OutboundQueue::new(id, 16, 1024);
        let handler = ConnectionHandler::with_id(id, state.clone(), outbound);
        (handler, receiver)
    }

    fn drain(receiver: &mut OutboundReceiver) -> Vec<ResponseMessage> {
        let mut messages = Vec::new();
        while let Some(message) = receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    async fn create_open_session(state: &AppState) -> Arc<VoteSession> {
        let session = state
            .sessions()
            .create(NewVotingSession::new(Uuid::new_v4(), "Budget", 5))
            .await
            .unwrap();
        session.open().await.unwrap();
        session
    }

    async fn hello(handler: &ConnectionHandler) -> String {
        match handler.handle_request(RequestMessage::Hello {
            request_id: None,
            label: Some("Delegate A".into()),
        })
        .await
        {
            Some(ResponseMessage::Identity {
                token,
                resumed,
                must_persist,
                ..
            }) => {
                assert!(!resumed);
                assert!(must_persist);
                token
            }
            msg => panic!("unexpected response: {msg:?}"),
        }
    }

    fn cast(session_id: Uuid, value: &str) -> RequestMessage {
        RequestMessage::CastBallot {
            request_id: Some("cast".into()),
            session_id,
            identity: None,
            value: BallotInput::Name(value.into()),
        }
    }

    fn ballot_result(response: Option<ResponseMessage>) -> (bool, String, Option<u64>) {
        match response {
            Some(ResponseMessage::BallotResult {
                request_id,
                success,
                message,
                sequence,
            }) => {
                assert_eq!(request_id.as_deref(), Some("cast"));
                (success, message, sequence)
            }
            msg => panic!("unexpected response: {msg:?}"),
        }
    }

    #[test]
    async fn ballot_requires_identity_handshake() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (handler, _receiver) = connect(&state);

        let (success, message, _) = ballot_result(handler.handle_request(cast(*session.id(), "inFavor")).await);
        assert!(!success);
        assert_eq!(message, BallotRejection::IdentityRequired.to_string());
        assert_eq!(session.ballot_count().await, 0);
    }

    #[test]
    async fn monitor_sees_first_vote_only() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (voter, _voter_receiver) = connect(&state);
        let (monitor, mut monitor_receiver) = connect(&state);
        hello(&voter).await;

        let response = monitor
            .handle_request(RequestMessage::AttachMonitor {
                request_id: Some("m".into()),
                session_id: *session.id(),
            })
            .await;
        assert!(response.is_none());
        let messages = drain(&mut monitor_receiver);
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &messages[0],
            ResponseMessage::MonitorResult { success: true, request_id: Some(id), .. } if id == "m"
        ));
        assert!(matches!(&messages[1], ResponseMessage::Tally { snapshot, .. } if snapshot.total == 0));

        let (success, message, sequence) =
            ballot_result(voter.handle_request(cast(*session.id(), "inFavor")).await);
        assert!(success);
        assert_eq!(message, "Vote registered: inFavor");

        let messages = drain(&mut monitor_receiver);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ResponseMessage::Tally { snapshot, .. } => {
                assert_eq!(Some(snapshot.sequence), sequence);
                assert_eq!(
                    snapshot.counts,
                    TallyCounts {
                        in_favor: 1,
                        against: 0,
                        abstain: 0
                    }
                );
                assert_eq!(snapshot.votes[0].label, "Delegate A");
            }
            msg => panic!("unexpected message: {msg:?}"),
        }

        let (success, message, _) = ballot_result(voter.handle_request(cast(*session.id(), "against")).await);
        assert!(!success);
        assert_eq!(message, BallotRejection::DuplicateVote.to_string());
        assert!(drain(&mut monitor_receiver).is_empty());
        assert_eq!(session.snapshot().await.counts.in_favor, 1);
    }

    #[test]
    async fn resume_displaces_the_stale_connection() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (first, _first_receiver) = connect(&state);
        let token = hello(&first).await;

        let (second, _second_receiver) = connect(&state);
        match second
            .handle_request(RequestMessage::Resume {
                request_id: None,
                token: token.clone(),
                label: None,
            })
            .await
        {
            Some(ResponseMessage::Identity {
                token: resumed_token,
                resumed,
                must_persist,
                ..
            }) => {
                assert_eq!(resumed_token, token);
                assert!(resumed);
                assert!(!must_persist);
            }
            msg => panic!("unexpected response: {msg:?}"),
        }

        let (success, message, _) = ballot_result(first.handle_request(cast(*session.id(), "abstain")).await);
        assert!(!success);
        assert_eq!(message, BallotRejection::IdentityRequired.to_string());

        let (success, _, _) = ballot_result(second.handle_request(cast(*session.id(), "abstain")).await);
        assert!(success);
    }

    #[test]
    async fn mismatching_identity_is_rejected() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (handler, _receiver) = connect(&state);
        hello(&handler).await;

        let other = ClientIdentity::new_random();
        let (success, message, _) = ballot_result(
            handler
                .handle_request(RequestMessage::CastBallot {
                    request_id: Some("cast".into()),
                    session_id: *session.id(),
                    identity: Some(other.to_string()),
                    value: BallotInput::Code(BallotValue::Against.code()),
                })
                .await,
        );
        assert!(!success);
        assert_eq!(message, BallotRejection::IdentityMismatch(other).to_string());
        assert_eq!(session.ballot_count().await, 0);
    }

    #[test]
    async fn unknown_session_and_invalid_frames() {
        let state = create_state();
        let (handler, mut receiver) = connect(&state);
        hello(&handler).await;

        let missing = Uuid::new_v4();
        let (success, message, _) = ballot_result(handler.handle_request(cast(missing, "inFavor")).await);
        assert!(!success);
        assert_eq!(message, BallotRejection::SessionNotFound(missing).to_string());

        handler.handle_text("{ not json").await;
        handler.handle_text(r#"{ "type": "castBallot" }"#).await;
        let messages = drain(&mut receiver);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| matches!(m, ResponseMessage::Error { .. })));
    }

    #[test]
    async fn close_releases_monitors_and_identity() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (handler, mut receiver) = connect(&state);
        let token = hello(&handler).await;
        let identity = ClientIdentity::parse(&token).unwrap();

        handler.handle_text(&format!(r#"{{ "type": "attachMonitor", "sessionId": "{}" }}"#, session.id())).await;
        assert_eq!(state.hub().subscriber_count(session.id()).await, 1);
        drain(&mut receiver);

        let duplicate = handler
            .handle_request(RequestMessage::AttachMonitor {
                request_id: None,
                session_id: *session.id(),
            })
            .await;
        assert!(matches!(duplicate, Some(ResponseMessage::MonitorResult { success: false, .. })));
        assert_eq!(state.hub().subscriber_count(session.id()).await, 1);

        handler.close().await;
        assert_eq!(state.hub().subscriber_count(session.id()).await, 0);
        assert_eq!(state.identities().identity_of(handler.id()).await, None);
        assert!(state.identities().is_known(&identity).await);
    }

    #[test]
    async fn out_of_range_ballot_values_are_acknowledged() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (handler, mut receiver) = connect(&state);
        hello(&handler).await;

        for value in ["300", "-1", "1.5", "null"] {
            handler
                .handle_text(&format!(
                    r#"{{ "type": "castBallot", "requestId": "r", "sessionId": "{}", "value": {value} }}"#,
                    session.id()
                ))
                .await;
            match drain(&mut receiver).as_slice() {
                [ResponseMessage::BallotResult {
                    request_id,
                    success,
                    message,
                    ..
                }] => {
                    assert_eq!(request_id.as_deref(), Some("r"));
                    assert!(!success);
                    assert_eq!(message, &BallotRejection::InvalidValue(value.to_string()).to_string());
                }
                msg => panic!("unexpected messages for {value}: {msg:?}"),
            }
        }

        handler
            .handle_text(&format!(
                r#"{{ "type": "castBallot", "requestId": "r", "sessionId": "{}" }}"#,
                session.id()
            ))
            .await;
        assert!(matches!(
            drain(&mut receiver).as_slice(),
            [ResponseMessage::BallotResult { success: false, request_id: Some(id), .. }] if id == "r"
        ));
        assert_eq!(session.ballot_count().await, 0);
    }

    #[test]
    async fn malformed_identity_is_rejected() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (handler, _receiver) = connect(&state);
        hello(&handler).await;

        let (success, message, _) = ballot_result(
            handler
                .handle_request(RequestMessage::CastBallot {
                    request_id: Some("cast".into()),
                    session_id: *session.id(),
                    identity: Some("not-a-token".into()),
                    value: BallotInput::Name("inFavor".into()),
                })
                .await,
        );
        assert!(!success);
        assert_eq!(message, BallotRejection::InvalidIdentity("not-a-token".into()).to_string());
        assert_eq!(session.ballot_count().await, 0);
    }

    #[test]
    async fn stalled_monitor_is_dropped() {
        let state = create_state();
        let session = create_open_session(&state).await;
        let (voter, _voter_receiver) = connect(&state);
        hello(&voter).await;

        let id = state.identities().new_connection();
        let (outbound, _receiver) = OutboundQueue::new(id, 1, 2);
        let overflow = outbound.clone();
        let monitor = ConnectionHandler::with_id(id, state.clone(), outbound);
        monitor
            .handle_request(RequestMessage::AttachMonitor {
                request_id: None,
                session_id: *session.id(),
            })
            .await;
        assert_eq!(state.hub().subscriber_count(session.id()).await, 1);
        assert!(!overflow.is_overflowed());

        let (success, _, _) = ballot_result(voter.handle_request(cast(*session.id(), "inFavor")).await);
        assert!(success);
        assert!(overflow.is_overflowed());
        assert_eq!(state.hub().subscriber_count(session.id()).await, 0);
    }
}
