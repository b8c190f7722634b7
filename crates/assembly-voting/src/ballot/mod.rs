#![allow(clippy::module_inception)]

mod ballot;
pub use self::ballot::*;
mod vote_ledger;
pub use self::vote_ledger::*;
