use crate::identity::ClientIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(Debug, ThisError)]
#[error("Unknown ballot value: {0:?}")]
pub struct InvalidBallotValue(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BallotValue {
    InFavor,
    Against,
    Abstain,
}

impl BallotValue {
    pub const ALL: [BallotValue; 3] = [BallotValue::InFavor, BallotValue::Against, BallotValue::Abstain];

    pub fn as_str(&self) -> &'static str {
        match self {
            BallotValue::InFavor => "inFavor",
            BallotValue::Against => "against",
            BallotValue::Abstain => "abstain",
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            BallotValue::InFavor => 0,
            BallotValue::Against => 1,
            BallotValue::Abstain => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BallotValue::InFavor),
            1 => Some(BallotValue::Against),
            2 => Some(BallotValue::Abstain),
            _ => None,
        }
    }
}

impl fmt::Display for BallotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the wire names (`inFavor`, `against`, `abstain`, case insensitive) and the numeric codes.
impl FromStr for BallotValue {
    type Err = InvalidBallotValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Ok(code) = value.parse::<u8>() {
            return BallotValue::from_code(code).ok_or_else(|| InvalidBallotValue(s.to_owned()));
        }

        match value.to_ascii_lowercase().as_str() {
            "infavor" | "in_favor" | "in-favor" => Ok(BallotValue::InFavor),
            "against" => Ok(BallotValue::Against),
            "abstain" => Ok(BallotValue::Abstain),
            _ => Err(InvalidBallotValue(s.to_owned())),
        }
    }
}

/// One recorded vote. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub session_id: Uuid,
    pub voter: ClientIdentity,
    pub value: BallotValue,
    pub cast_at: DateTime<Utc>,
}

impl Ballot {
    pub fn new(session_id: Uuid, voter: ClientIdentity, value: BallotValue) -> Self {
        Self {
            session_id,
            voter,
            value,
            cast_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    #[test]
    fn parse_ballot_values() {
        assert_eq!("inFavor".parse::<BallotValue>().unwrap(), BallotValue::InFavor);
        assert_eq!("in-favor".parse::<BallotValue>().unwrap(), BallotValue::InFavor);
        assert_eq!("AGAINST".parse::<BallotValue>().unwrap(), BallotValue::Against);
        assert_eq!(" abstain ".parse::<BallotValue>().unwrap(), BallotValue::Abstain);
        assert_eq!("1".parse::<BallotValue>().unwrap(), BallotValue::Against);

        assert!("3".parse::<BallotValue>().is_err());
        assert!("-1".parse::<BallotValue>().is_err());
        assert!("maybe".parse::<BallotValue>().is_err());
        assert!("".parse::<BallotValue>().is_err());
    }

    #[test]
    fn wire_names_match_display() {
        for value in BallotValue::ALL {
            let json = serde_json::to_string(&value).unwrap();
            assert_eq!(json, format!("\"{value}\""));
            assert_eq!(BallotValue::from_code(value.code()), Some(value));
        }
    }
}
