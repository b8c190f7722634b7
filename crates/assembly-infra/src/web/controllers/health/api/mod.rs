mod ready;
pub use self::ready::*;
mod telemetry_config;
pub use self::telemetry_config::*;
mod version;
pub use self::version::*;
