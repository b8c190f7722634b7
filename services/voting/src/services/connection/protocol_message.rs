use assembly_voting::{ballot::BallotValue, session::BallotRejection, tally::TallySnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Ballot value as sent by the clients: the name or the numeric code of the value.
/// Any other json value is kept to be rejected with the acknowledgment of the request.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum BallotInput {
    Code(u8),
    Name(String),
    Other(JsonValue),
}

impl Default for BallotInput {
    fn default() -> Self {
        BallotInput::Other(JsonValue::Null)
    }
}

impl BallotInput {
    pub fn to_value(&self) -> Result<BallotValue, BallotRejection> {
        match self {
            BallotInput::Code(code) => {
                BallotValue::from_code(*code).ok_or_else(|| BallotRejection::InvalidValue(code.to_string()))
            }
            BallotInput::Name(name) => name
                .parse::<BallotValue>()
                .map_err(|err| BallotRejection::InvalidValue(err.0)),
            BallotInput::Other(value) => Err(BallotRejection::InvalidValue(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RequestMessage {
    Hello {
        request_id: Option<String>,
        label: Option<String>,
    },
    Resume {
        request_id: Option<String>,
        token: String,
        label: Option<String>,
    },
    CastBallot {
        request_id: Option<String>,
        session_id: Uuid,
        identity: Option<String>,
        #[serde(default)]
        value: BallotInput,
    },
    AttachMonitor {
        request_id: Option<String>,
        session_id: Uuid,
    },
    DetachMonitor {
        request_id: Option<String>,
        session_id: Uuid,
    },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ResponseMessage {
    Identity {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        token: String,
        resumed: bool,
        must_persist: bool,
    },
    BallotResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        success: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sequence: Option<u64>,
    },
    MonitorResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        session_id: Uuid,
        success: bool,
        message: String,
    },
    Tally {
        session_id: Uuid,
        snapshot: TallySnapshot,
    },
    Error {
        message: String,
    },
}
