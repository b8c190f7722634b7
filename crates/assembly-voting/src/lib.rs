//! Real-time voting coordination: participant identities that survive reconnects,
//! one ballot per participant and session, and a live tally fanned out to monitors.

pub mod ballot;
pub mod broadcast;
pub mod identity;
pub mod session;
pub mod tally;
