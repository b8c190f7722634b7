use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;

use super::{ClientIdentity, ConnectionId};

/// How a connection got bound to its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityBinding {
    /// No usable token was presented, a new identity was issued.
    Minted,
    /// A known token was presented. If it was bound to another connection, that binding is dropped.
    Resumed { displaced: Option<ConnectionId> },
    /// A well formed but unknown token was presented (ex. the registry was restarted).
    Adopted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityResolution {
    pub identity: ClientIdentity,
    pub binding: IdentityBinding,
}

impl IdentityResolution {
    /// The client has to store the token as it was not known to it before.
    pub fn must_persist(&self) -> bool {
        !matches!(self.binding, IdentityBinding::Resumed { .. })
    }

    pub fn is_resumed(&self) -> bool {
        matches!(self.binding, IdentityBinding::Resumed { .. })
    }

    /// The connection that lost its binding because of this resolution.
    pub fn displaced(&self) -> Option<ConnectionId> {
        match self.binding {
            IdentityBinding::Resumed { displaced } => displaced,
            _ => None,
        }
    }
}

#[derive(Default)]
struct Bindings {
    by_connection: HashMap<ConnectionId, ClientIdentity>,
    // every identity issued or adopted during the process lifetime, with its active connection
    by_identity: HashMap<ClientIdentity, Option<ConnectionId>>,
}

impl Bindings {
    fn unbind_connection(&mut self, connection: ConnectionId) -> Option<ClientIdentity> {
        let identity = self.by_connection.remove(&connection)?;
        if let Some(active) = self.by_identity.get_mut(&identity) {
            if *active == Some(connection) {
                *active = None;
            }
        }
        Some(identity)
    }

    fn bind(&mut self, connection: ConnectionId, identity: ClientIdentity) -> Option<ConnectionId> {
        let previous = self.by_identity.insert(identity, Some(connection)).flatten();
        let displaced = previous.filter(|previous| *previous != connection);
        if let Some(displaced) = displaced {
            self.by_connection.remove(&displaced);
        }
        self.by_connection.insert(connection, identity);
        displaced
    }
}

/// Issues client identities and keeps the connection -> identity association across reconnects.
/// A token is bound to at most one connection at a time.
pub struct IdentityRegistry {
    next_connection_id: AtomicU64,
    bindings: RwLock<Bindings>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            next_connection_id: AtomicU64::new(1),
            bindings: RwLock::new(Bindings::default()),
        }
    }

    /// Allocate the id of a newly accepted connection.
    pub fn new_connection(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Resolve the identity of a connection from the (optional) token presented by the client.
    pub async fn resolve(&self, connection: ConnectionId, candidate_token: Option<&str>) -> IdentityResolution {
        let candidate = candidate_token.and_then(ClientIdentity::parse);
        if candidate_token.is_some() && candidate.is_none() {
            log::warn!("[{connection}] Malformed identity token, issuing a new identity");
        }

        let mut bindings = self.bindings.write().await;

        // a connection speaks for a single participant, switching identity drops the old binding
        if let Some(previous) = bindings.by_connection.get(&connection).copied() {
            if Some(previous) != candidate {
                log::info!("[{connection}] Dropping binding to {previous}");
                bindings.unbind_connection(connection);
            }
        }

        let resolution = match candidate {
            Some(identity) if bindings.by_identity.contains_key(&identity) => {
                let displaced = bindings.bind(connection, identity);
                IdentityResolution {
                    identity,
                    binding: IdentityBinding::Resumed { displaced },
                }
            }
            Some(identity) => {
                bindings.bind(connection, identity);
                IdentityResolution {
                    identity,
                    binding: IdentityBinding::Adopted,
                }
            }
            None => {
                let identity = loop {
                    let identity = ClientIdentity::new_random();
                    if !bindings.by_identity.contains_key(&identity) {
                        break identity;
                    }
                };
                bindings.bind(connection, identity);
                IdentityResolution {
                    identity,
                    binding: IdentityBinding::Minted,
                }
            }
        };

        log::debug!(
            "[{connection}] Resolved identity {} ({:?})",
            resolution.identity,
            resolution.binding
        );
        resolution
    }

    /// Forget the binding of a closed connection. The identity remains known and can be resumed later.
    pub async fn release(&self, connection: ConnectionId) -> Option<ClientIdentity> {
        let mut bindings = self.bindings.write().await;
        let identity = bindings.unbind_connection(connection);
        if let Some(identity) = &identity {
            log::debug!("[{connection}] Released identity {identity}");
        }
        identity
    }

    pub async fn identity_of(&self, connection: ConnectionId) -> Option<ClientIdentity> {
        let bindings = self.bindings.read().await;
        bindings.by_connection.get(&connection).copied()
    }

    pub async fn connection_of(&self, identity: &ClientIdentity) -> Option<ConnectionId> {
        let bindings = self.bindings.read().await;
        bindings.by_identity.get(identity).copied().flatten()
    }

    pub async fn is_known(&self, identity: &ClientIdentity) -> bool {
        let bindings = self.bindings.read().await;
        bindings.by_identity.contains_key(identity)
    }
}
