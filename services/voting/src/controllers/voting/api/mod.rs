mod connect;
pub use self::connect::*;
mod participants;
pub use self::participants::*;
mod sessions;
pub use self::sessions::*;
