use crate::{broadcast::BroadcastHub, tally::ParticipantDirectory};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewVotingSession, SessionError, VoteSession, VotingSessionInfo};

/// Registry of the live voting sessions of the process.
pub struct VotingSessions {
    sessions: RwLock<HashMap<Uuid, Arc<VoteSession>>>,
    hub: BroadcastHub,
    directory: Arc<dyn ParticipantDirectory>,
}

impl VotingSessions {
    pub fn new(hub: BroadcastHub, directory: Arc<dyn ParticipantDirectory>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            hub,
            directory,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub async fn create(&self, params: NewVotingSession) -> Result<Arc<VoteSession>, SessionError> {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let id = Uuid::new_v4();
            if !sessions.contains_key(&id) {
                break id;
            }
        };

        let info = VotingSessionInfo::new(id, params)?;
        let session = Arc::new(VoteSession::new(info, self.hub.clone(), self.directory.clone()));
        sessions.insert(id, session.clone());

        log::info!(
            "Voting session {id} created for commission {}",
            session.info().commission_id
        );
        Ok(session)
    }

    pub async fn find(&self, id: &Uuid) -> Option<Arc<VoteSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    pub async fn get(&self, id: &Uuid) -> Result<Arc<VoteSession>, SessionError> {
        self.find(id).await.ok_or(SessionError::NotFound(*id))
    }

    /// All the sessions ordered by creation time.
    pub async fn list(&self) -> Vec<Arc<VoteSession>> {
        let sessions = self.sessions.read().await;
        let mut list = sessions.values().cloned().collect::<Vec<_>>();
        list.sort_by_key(|session| session.info().created_at);
        list
    }
}
