//! Registry of live client connections.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::mpsc;

use crate::{ConnId, MatchId, Msg};

/// A live client connection.
#[derive(Debug)]
pub struct Connection {
    /// Channel for sending messages to this connection.
    sender: mpsc::UnboundedSender<Msg>,
    /// Matches this connection has joined.
    matches: BTreeSet<MatchId>,
}

impl Connection {
    #[must_use]
    pub const fn matches(&self) -> &BTreeSet<MatchId> {
        &self.matches
    }

    /// Pushes a message onto this connection's outbound queue.
    ///
    /// Returns `false` if the connection's receiver is already gone.
    pub fn send(&self, msg: Msg) -> bool {
        // errors if client disconnected abruptly and hasn't been cleaned up yet
        self.sender.send(msg).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<ConnId, Connection>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and assigns it an unused random id.
    pub fn connect(&mut self, sender: mpsc::UnboundedSender<Msg>) -> ConnId {
        let id = loop {
            let id = rand::random::<ConnId>();
            if !self.connections.contains_key(&id) {
                break id;
            }
        };

        self.connections.insert(
            id,
            Connection {
                sender,
                matches: BTreeSet::new(),
            },
        );

        log::debug!("Connection count: {}", self.connections.len());

        id
    }

    /// Removes the connection, returning it so its room memberships can be
    /// cleaned up.
    pub fn disconnect(&mut self, conn: ConnId) -> Option<Connection> {
        let connection = self.connections.remove(&conn);
        log::debug!("Connection count: {}", self.connections.len());
        connection
    }

    /// Records that `conn` joined `match_id`.
    ///
    /// Returns `None` if the connection is not registered.
    pub fn add_match(&mut self, conn: ConnId, match_id: &str) -> Option<bool> {
        self.connections
            .get_mut(&conn)
            .map(|connection| connection.matches.insert(match_id.to_owned()))
    }

    #[must_use]
    pub fn get(&self, conn: ConnId) -> Option<&Connection> {
        self.connections.get(&conn)
    }

    #[must_use]
    pub fn contains(&self, conn: ConnId) -> bool {
        self.connections.contains_key(&conn)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
