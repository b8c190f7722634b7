use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Durable token of one logical participant. It is kept by the client across reconnects,
/// and it is not tied to any physical connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(Uuid);

impl ClientIdentity {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client provided token. Anything that is not a well formed token is treated as absent.
    pub fn parse(token: &str) -> Option<Self> {
        Uuid::parse_str(token.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short, human readable label used when the directory has no name for the participant.
    pub fn short_label(&self) -> String {
        let mut buffer = Uuid::encode_buffer();
        let simple = self.0.simple().encode_lower(&mut buffer);
        format!("participant-{}", &simple[..8])
    }
}

impl From<Uuid> for ClientIdentity {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for ClientIdentity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Process unique id of one physical duplex connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    #[test]
    fn malformed_tokens_are_absent() {
        assert!(ClientIdentity::parse("").is_none());
        assert!(ClientIdentity::parse("not-a-token").is_none());
        assert!(ClientIdentity::parse("1234").is_none());

        let identity = ClientIdentity::new_random();
        assert_eq!(ClientIdentity::parse(&identity.to_string()), Some(identity));
        assert_eq!(ClientIdentity::parse(&format!(" {identity} ")), Some(identity));
    }

    #[test]
    fn short_label_is_stable() {
        let identity = ClientIdentity::from(Uuid::parse_str("8f14e45f-ceea-467f-a0e6-1f0e2d3c4b5a").unwrap());
        assert_eq!(identity.short_label(), "participant-8f14e45f");
    }
}
