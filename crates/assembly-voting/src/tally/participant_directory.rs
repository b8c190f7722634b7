use crate::identity::ClientIdentity;
use std::{collections::HashMap, sync::RwLock};

/// Lookup of the display label of a participant. The directory of delegates is owned by an external system.
pub trait ParticipantDirectory: Send + Sync + 'static {
    fn label(&self, identity: &ClientIdentity) -> Option<String>;

    /// The label to display, falls back to a short form of the identity.
    fn label_or_default(&self, identity: &ClientIdentity) -> String {
        self.label(identity).unwrap_or_else(|| identity.short_label())
    }
}

/// In-process participant directory, filled by the identity handshake and the management api.
#[derive(Default)]
pub struct ParticipantRoster {
    labels: RwLock<HashMap<ClientIdentity, String>>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = (ClientIdentity, String)>,
    {
        Self {
            labels: RwLock::new(labels.into_iter().collect()),
        }
    }

    /// Set the label of a participant. Blank labels remove the entry.
    pub fn set_label(&self, identity: ClientIdentity, label: &str) {
        let label = label.trim();
        let mut labels = self.labels.write().unwrap_or_else(|err| err.into_inner());
        if label.is_empty() {
            labels.remove(&identity);
        } else {
            labels.insert(identity, label.to_owned());
        }
    }

    pub fn len(&self) -> usize {
        self.labels.read().unwrap_or_else(|err| err.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ParticipantDirectory for ParticipantRoster {
    fn label(&self, identity: &ClientIdentity) -> Option<String> {
        let labels = self.labels.read().unwrap_or_else(|err| err.into_inner());
        labels.get(identity).cloned()
    }
}
