mod session_error;
pub use self::session_error::*;
mod voting_session;
pub use self::voting_session::*;
mod vote_session;
pub use self::vote_session::*;
mod voting_sessions;
pub use self::voting_sessions::*;
