use crate::ballot::BallotValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::SessionError;

/// Lifecycle of a voting session. The transitions are linear, a closed session is never reopened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Scheduled,
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Scheduled => f.write_str("scheduled"),
            SessionState::Open => f.write_str("open"),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// Parameters of a session created by the management subsystem.
#[derive(Clone, Debug)]
pub struct NewVotingSession {
    pub commission_id: Uuid,
    pub subject: String,
    pub allowed_values: Vec<BallotValue>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Size of the commission, an external fact.
    pub expected_participants: usize,
}

impl NewVotingSession {
    pub fn new(commission_id: Uuid, subject: impl Into<String>, expected_participants: usize) -> Self {
        Self {
            commission_id,
            subject: subject.into(),
            allowed_values: BallotValue::ALL.to_vec(),
            scheduled_at: None,
            expected_participants,
        }
    }

    pub fn with_allowed_values(self, allowed_values: Vec<BallotValue>) -> Self {
        Self { allowed_values, ..self }
    }

    pub fn with_scheduled_at(self, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            scheduled_at: Some(scheduled_at),
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSessionInfo {
    pub id: Uuid,
    pub commission_id: Uuid,
    pub subject: String,
    pub allowed_values: Vec<BallotValue>,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expected_participants: usize,
}

impl VotingSessionInfo {
    pub fn new(id: Uuid, params: NewVotingSession) -> Result<Self, SessionError> {
        let mut allowed_values = params.allowed_values;
        allowed_values.sort();
        allowed_values.dedup();
        if allowed_values.is_empty() {
            return Err(SessionError::NoAllowedValues);
        }

        Ok(Self {
            id,
            commission_id: params.commission_id,
            subject: params.subject,
            allowed_values,
            created_at: Utc::now(),
            scheduled_at: params.scheduled_at,
            expected_participants: params.expected_participants,
        })
    }

    pub fn is_allowed(&self, value: BallotValue) -> bool {
        self.allowed_values.contains(&value)
    }
}
