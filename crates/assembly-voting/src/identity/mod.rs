mod client_identity;
pub use self::client_identity::*;
mod identity_registry;
pub use self::identity_registry::*;
