mod connection_handler;
pub use self::connection_handler::*;
mod connection_monitor;
pub use self::connection_monitor::*;
mod outbound_queue;
pub use self::outbound_queue::*;
mod protocol_message;
pub use self::protocol_message::*;
