use assembly_voting::{
    broadcast::{DeliveryError, Subscriber},
    tally::TallySnapshot,
};

use super::{OutboundQueue, ResponseMessage};

/// Forwards the tally of a session to a connection.
pub struct ConnectionMonitor {
    outbound: OutboundQueue,
}

impl ConnectionMonitor {
    pub fn new(outbound: OutboundQueue) -> Self {
        Self { outbound }
    }
}

impl Subscriber for ConnectionMonitor {
    async fn deliver(&self, snapshot: &TallySnapshot) -> Result<(), DeliveryError> {
        let message = ResponseMessage::Tally {
            session_id: snapshot.session_id,
            snapshot: snapshot.clone(),
        };
        if self.outbound.send(message) {
            Ok(())
        } else {
            Err(DeliveryError::Closed)
        }
    }
}
