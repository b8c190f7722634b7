mod subscriber;
pub use self::subscriber::*;
mod broadcast_hub;
pub use self::broadcast_hub::*;
