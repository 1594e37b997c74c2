//! Real-time relay for peer-to-peer chess matches.
//!
//! Two anonymous clients find each other through a shared match identifier,
//! exchange a connection handshake, and then exchange moves. The relay only
//! knows about rooms: it never validates or interprets chess data.
//!
//! # Main Components
//!
//! * [`registry::ConnectionRegistry`] - Live connections and the matches each joined
//! * [`rooms::Rooms`] - Match room membership
//! * [`relay::MatchRelay`] - Applies inbound messages: forwards signals and sends acks
//! * [`server::WsServer`] - Service task owning the relay, driven through [`server::WsServerHandle`]
//! * [`models`] - Inbound and outbound wire payloads
//!
//! # Example
//!
//! ```rust
//! # async fn example() -> Result<(), chess_relay::server::WsServerError> {
//! use chess_relay::server::WsServer;
//! use tokio::sync::mpsc;
//!
//! let (server, handle) = WsServer::new();
//! tokio::spawn(server.run());
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let conn = handle.connect(tx).await?;
//! handle
//!     .send_message(conn, r#"{"type":"join-match","matchId":"match-42","ackId":1}"#)
//!     .await?;
//!
//! // {"type":"ack","event":"join-match","matchId":"match-42","ackId":1}
//! let ack = rx.recv().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod models;
pub mod registry;
pub mod relay;
pub mod rooms;
pub mod server;

/// Connection ID.
pub type ConnId = u64;

/// Match identifier naming a room. Supplied by clients, never validated.
pub type MatchId = String;

/// Text frame sent to a connection.
pub type Msg = String;
