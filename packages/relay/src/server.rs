//! Command-driven service owning the relay state.
//!
//! [`WsServer`] is the single owner of the [`MatchRelay`]. Connection
//! handlers talk to it through a cloneable [`WsServerHandle`]; commands are
//! applied one at a time by [`WsServer::run`], so the membership map needs no
//! lock. Outbound frames are pushed onto each connection's unbounded channel
//! and written to the socket by that connection's own handler.

use std::io;

use serde::Serialize;
use strum_macros::AsRefStr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::{
    ConnId, MatchId, Msg,
    relay::{MatchRelay, Outcome, RelayMessageError},
};

/// A command received by the [`WsServer`].
#[derive(Debug, AsRefStr)]
pub enum Command {
    /// Registers a new connection.
    Connect {
        /// Channel sender for messages to this connection.
        conn_tx: mpsc::UnboundedSender<Msg>,
        /// Channel to send back the assigned connection ID.
        res_tx: oneshot::Sender<ConnId>,
    },

    /// Removes a connection and all of its room memberships.
    Disconnect {
        conn: ConnId,
        res_tx: oneshot::Sender<bool>,
    },

    /// Processes an incoming text frame from a connection.
    Message {
        msg: Msg,
        conn: ConnId,
        res_tx: oneshot::Sender<Result<Outcome, RelayMessageError>>,
    },

    RoomMembers {
        match_id: MatchId,
        res_tx: oneshot::Sender<Vec<ConnId>>,
    },

    Stats {
        res_tx: oneshot::Sender<ServerStats>,
    },
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub connections: usize,
    pub rooms: usize,
}

#[derive(Debug, Error)]
pub enum WsServerError {
    #[error("WsServer is not running")]
    Closed,
    #[error(transparent)]
    Relay(#[from] RelayMessageError),
}

impl<T> From<flume::SendError<T>> for WsServerError {
    fn from(_: flume::SendError<T>) -> Self {
        Self::Closed
    }
}

impl From<oneshot::error::RecvError> for WsServerError {
    fn from(_: oneshot::error::RecvError) -> Self {
        Self::Closed
    }
}

#[derive(Debug)]
pub struct WsServer {
    relay: MatchRelay,

    /// Command receiver.
    cmd_rx: flume::Receiver<Command>,

    token: CancellationToken,
}

impl WsServer {
    #[must_use]
    pub fn new() -> (Self, WsServerHandle) {
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let token = CancellationToken::new();
        let handle = WsServerHandle {
            cmd_tx,
            token: token.clone(),
        };

        (
            Self {
                relay: MatchRelay::new(),
                cmd_rx,
                token,
            },
            handle,
        )
    }

    fn process_command(&mut self, cmd: Command) -> io::Result<()> {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("process_command: cmd={cmd:?}");
        } else {
            log::debug!("process_command: cmd={cmd}");
        }

        match cmd {
            Command::Connect { conn_tx, res_tx } => {
                let conn_id = self.relay.connect(conn_tx);
                if res_tx.send(conn_id).is_err() {
                    // the handler went away before learning its id
                    self.relay.disconnect(conn_id);
                    return Err(io::Error::other(format!(
                        "Failed to send connection id {conn_id}"
                    )));
                }
            }

            Command::Disconnect { conn, res_tx } => {
                let _ = res_tx.send(self.relay.disconnect(conn));
            }

            Command::Message { msg, conn, res_tx } => {
                let response = self.relay.process_message(conn, &msg);
                if let Err(error) = &response {
                    log::error!("Failed to process message from {conn}: {error:?}");
                }
                let _ = res_tx.send(response);
            }

            Command::RoomMembers { match_id, res_tx } => {
                let _ = res_tx.send(self.relay.room_members(&match_id));
            }

            Command::Stats { res_tx } => {
                let _ = res_tx.send(ServerStats {
                    connections: self.relay.connection_count(),
                    rooms: self.relay.room_count(),
                });
            }
        }

        Ok(())
    }

    /// Applies commands until the server is shut down or every handle is
    /// dropped.
    ///
    /// # Errors
    ///
    /// * This does not currently return an error
    pub async fn run(mut self) -> io::Result<()> {
        let token = self.token.clone();
        let cmd_rx = self.cmd_rx.clone();

        loop {
            let cmd = tokio::select! {
                () = token.cancelled() => {
                    log::debug!("WsServer was cancelled");
                    break;
                }
                cmd = cmd_rx.recv_async() => cmd,
            };

            let Ok(cmd) = cmd else {
                log::debug!("All WsServer handles dropped");
                break;
            };

            if let Err(e) = self.process_command(cmd) {
                log::error!("Failed to process command: {e:?}");
            }
        }

        log::debug!("Stopped WsServer");

        Ok(())
    }
}

/// Handle and command sender for the [`WsServer`].
#[derive(Debug, Clone)]
pub struct WsServerHandle {
    cmd_tx: flume::Sender<Command>,
    token: CancellationToken,
}

impl WsServerHandle {
    /// Register client message sender and obtain connection ID.
    ///
    /// # Errors
    ///
    /// * If the [`WsServer`] is no longer running
    pub async fn connect(&self, conn_tx: mpsc::UnboundedSender<Msg>) -> Result<ConnId, WsServerError> {
        log::trace!("Sending Connect command");
        let (res_tx, res_rx) = oneshot::channel();
        self.cmd_tx
            .send_async(Command::Connect { conn_tx, res_tx })
            .await?;
        Ok(res_rx.await?)
    }

    /// Hands a text frame received from `conn` to the relay and waits until
    /// it has been applied.
    ///
    /// # Errors
    ///
    /// * If the [`WsServer`] is no longer running
    /// * If the frame could not be decoded or applied
    pub async fn send_message(
        &self,
        conn: ConnId,
        msg: impl Into<String> + Send,
    ) -> Result<Outcome, WsServerError> {
        log::trace!("Sending Message command");
        let (res_tx, res_rx) = oneshot::channel();
        self.cmd_tx
            .send_async(Command::Message {
                msg: msg.into(),
                conn,
                res_tx,
            })
            .await?;
        Ok(res_rx.await??)
    }

    /// Unregister the connection and drop it from every room it joined.
    ///
    /// # Errors
    ///
    /// * If the [`WsServer`] is no longer running
    pub async fn disconnect(&self, conn: ConnId) -> Result<bool, WsServerError> {
        log::trace!("Sending Disconnect command");
        let (res_tx, res_rx) = oneshot::channel();
        self.cmd_tx
            .send_async(Command::Disconnect { conn, res_tx })
            .await?;
        Ok(res_rx.await?)
    }

    /// # Errors
    ///
    /// * If the [`WsServer`] is no longer running
    pub async fn room_members(&self, match_id: &str) -> Result<Vec<ConnId>, WsServerError> {
        let (res_tx, res_rx) = oneshot::channel();
        self.cmd_tx
            .send_async(Command::RoomMembers {
                match_id: match_id.to_owned(),
                res_tx,
            })
            .await?;
        Ok(res_rx.await?)
    }

    /// # Errors
    ///
    /// * If the [`WsServer`] is no longer running
    pub async fn stats(&self) -> Result<ServerStats, WsServerError> {
        let (res_tx, res_rx) = oneshot::channel();
        self.cmd_tx.send_async(Command::Stats { res_tx }).await?;
        Ok(res_rx.await?)
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}
