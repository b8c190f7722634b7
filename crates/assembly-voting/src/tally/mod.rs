mod participant_directory;
pub use self::participant_directory::*;
mod tally_snapshot;
pub use self::tally_snapshot::*;
mod tally_aggregator;
pub use self::tally_aggregator::*;
