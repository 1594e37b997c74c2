//! Signaling relay between the members of a match room.
//!
//! [`MatchRelay`] owns the connection registry and the room map and applies
//! inbound messages to them. It has no knowledge of chess: bodies are
//! forwarded verbatim to every other member of the addressed room.

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    ConnId, Msg,
    models::{
        AckPayload, AddressPayload, InboundMessageType, InboundPayload, OutboundPayload,
    },
    registry::ConnectionRegistry,
    rooms::Rooms,
};

#[derive(Debug, Error)]
pub enum RelayMessageError {
    #[error("Invalid payload: '{0}' ({1})")]
    InvalidPayload(String, String),
    #[error("Connection {0} not connected")]
    UnknownConnection(ConnId),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Result of applying one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message_type: InboundMessageType,
    /// Number of room members the message was forwarded to.
    pub delivered: usize,
    /// Whether an ack frame was queued for the sender.
    pub acknowledged: bool,
}

#[derive(Debug, Default)]
pub struct MatchRelay {
    connections: ConnectionRegistry,
    rooms: Rooms,
}

impl MatchRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection with no room memberships.
    pub fn connect(&mut self, sender: mpsc::UnboundedSender<Msg>) -> ConnId {
        let id = self.connections.connect(sender);
        log::info!("Connection {id} opened");
        id
    }

    /// Removes the connection and its membership in every room it joined.
    ///
    /// Unknown ids are ignored.
    pub fn disconnect(&mut self, conn: ConnId) -> bool {
        let Some(connection) = self.connections.disconnect(conn) else {
            log::debug!("disconnect: connection {conn} is not registered");
            return false;
        };

        self.rooms.leave_all(conn, connection.matches());

        log::info!(
            "Connection {conn} closed (left {} match(es))",
            connection.matches().len()
        );

        true
    }

    /// Joins `conn` to the room `match_id`.
    ///
    /// Returns `false` if it was already a member.
    ///
    /// # Errors
    ///
    /// * If `conn` is not a registered connection
    pub fn join(&mut self, conn: ConnId, match_id: &str) -> Result<bool, RelayMessageError> {
        self.connections
            .add_match(conn, match_id)
            .ok_or(RelayMessageError::UnknownConnection(conn))?;

        let joined = self.rooms.join(conn, match_id);

        if joined {
            log::debug!("Connection {conn} joined match '{match_id}'");
        } else {
            log::debug!("Connection {conn} already in match '{match_id}'");
        }

        Ok(joined)
    }

    /// Forwards `payload` to every member of `match_id` except `sender`.
    ///
    /// Returns the number of members the payload was queued for. A room with
    /// no other members yields zero deliveries.
    ///
    /// # Errors
    ///
    /// * If the payload fails to serialize
    pub fn relay(
        &self,
        sender: ConnId,
        match_id: &str,
        payload: &OutboundPayload,
    ) -> Result<usize, RelayMessageError> {
        let msg = payload.to_msg()?;
        let mut delivered = 0;

        for conn in self.rooms.members(match_id).filter(|conn| *conn != sender) {
            let Some(connection) = self.connections.get(conn) else {
                log::warn!("relay: room '{match_id}' references missing connection {conn}");
                continue;
            };

            if connection.send(msg.clone()) {
                delivered += 1;
            } else {
                log::debug!("relay: connection {conn} receiver closed");
            }
        }

        log::debug!("Relayed {payload} from {sender} to {delivered} member(s) of '{match_id}'");

        Ok(delivered)
    }

    fn acknowledge(
        &self,
        conn: ConnId,
        event: InboundMessageType,
        match_id: &str,
        ack_id: Option<Value>,
    ) -> Result<bool, RelayMessageError> {
        let connection = self
            .connections
            .get(conn)
            .ok_or(RelayMessageError::UnknownConnection(conn))?;

        let ack = OutboundPayload::Ack(AckPayload {
            event,
            match_id: match_id.to_owned(),
            ack_id,
        });

        Ok(connection.send(ack.to_msg()?))
    }

    /// Decodes a text frame and applies it.
    ///
    /// # Errors
    ///
    /// * If the frame is not a valid inbound payload
    /// * If the message fails to apply
    pub fn process_message(
        &mut self,
        conn: ConnId,
        msg: &str,
    ) -> Result<Outcome, RelayMessageError> {
        let payload = serde_json::from_str::<InboundPayload>(msg)
            .map_err(|e| RelayMessageError::InvalidPayload(msg.to_owned(), e.to_string()))?;

        self.message(conn, payload)
    }

    /// Applies one inbound message sent by `conn`.
    ///
    /// # Errors
    ///
    /// * If `conn` is not a registered connection
    /// * If an outbound payload fails to serialize
    pub fn message(
        &mut self,
        conn: ConnId,
        payload: InboundPayload,
    ) -> Result<Outcome, RelayMessageError> {
        if !self.connections.contains(conn) {
            return Err(RelayMessageError::UnknownConnection(conn));
        }

        let message_type = payload.message_type();

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Received message type {message_type} from {conn}: {payload:?}");
        } else {
            log::debug!("Received message type {message_type} from {conn}");
        }

        let outcome = match payload {
            InboundPayload::ConnectionReqFromPlayer(payload) => {
                let match_id = payload.match_id.clone();
                let delivered = self.relay(
                    conn,
                    &match_id,
                    &OutboundPayload::ConnectionReqFromPlayer(payload),
                )?;

                Outcome {
                    message_type,
                    delivered,
                    acknowledged: false,
                }
            }
            InboundPayload::ConnectionReqAccepted(payload) => {
                let match_id = payload.match_id.clone();
                let ack_id = payload.ack_id.clone();
                let delivered = self.relay(
                    conn,
                    &match_id,
                    &OutboundPayload::ConnectionReqAccepted(AddressPayload::from(payload)),
                )?;
                let acknowledged = self.acknowledge(conn, message_type, &match_id, ack_id)?;

                Outcome {
                    message_type,
                    delivered,
                    acknowledged,
                }
            }
            InboundPayload::ChessPieceMoved(payload) => {
                let match_id = payload.match_id.clone();
                let delivered =
                    self.relay(conn, &match_id, &OutboundPayload::ChessPieceMoved(payload))?;

                Outcome {
                    message_type,
                    delivered,
                    acknowledged: false,
                }
            }
            InboundPayload::JoinMatch(payload) => {
                self.join(conn, &payload.match_id)?;
                let acknowledged =
                    self.acknowledge(conn, message_type, &payload.match_id, payload.ack_id)?;

                Outcome {
                    message_type,
                    delivered: 0,
                    acknowledged,
                }
            }
        };

        log::debug!("Successfully processed message type {message_type} from {conn}");

        Ok(outcome)
    }

    #[must_use]
    pub fn room_members(&self, match_id: &str) -> Vec<ConnId> {
        self.rooms.members(match_id).collect()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.room_count()
    }
}
