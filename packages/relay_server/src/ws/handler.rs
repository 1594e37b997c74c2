//! Per-connection WebSocket loop.
//!
//! Forwards client frames to the [`WsServerHandle`], writes frames queued for
//! this connection back to the socket, and keeps the transport alive with
//! heartbeat pings. Any way out of the loop disconnects the connection, which
//! removes it from every match it joined.

use std::time::{Duration, Instant};

use actix_ws::AggregatedMessage;
use chess_relay::{
    ConnId,
    server::{WsServerError, WsServerHandle},
};
use futures_util::{
    StreamExt as _,
    future::{Either, select},
};
use tokio::{pin, sync::mpsc, time::interval};

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[allow(clippy::future_not_send, clippy::too_many_lines)]
pub async fn handle_ws(
    ws_server: WsServerHandle,
    mut session: actix_ws::Session,
    msg_stream: actix_ws::MessageStream,
) {
    // fragmented frames are reassembled before they reach the relay
    let mut msg_stream = msg_stream.aggregate_continuations();

    let mut last_heartbeat = Instant::now();
    let mut interval = interval(HEARTBEAT_INTERVAL);

    let (conn_tx, mut conn_rx) = mpsc::unbounded_channel();

    let conn_id = match ws_server.connect(conn_tx).await {
        Ok(conn_id) => conn_id,
        Err(e) => {
            log::error!("Failed to register connection: {e:?}");
            let _ = session.close(None).await;
            return;
        }
    };

    log::debug!("Connection id: {conn_id}");

    let close_reason = loop {
        // most of the futures we process need to be stack-pinned to work with select()

        let tick = interval.tick();
        pin!(tick);

        let msg_rx = conn_rx.recv();
        pin!(msg_rx);

        let messages = select(msg_stream.next(), msg_rx);
        pin!(messages);

        match select(messages, tick).await {
            // commands & messages received from client
            Either::Left((Either::Left((Some(Ok(msg)), _)), _)) => match msg {
                AggregatedMessage::Ping(bytes) => {
                    last_heartbeat = Instant::now();
                    if let Err(e) = session.pong(&bytes).await {
                        log::debug!("Failed to pong conn_id={conn_id}: {e:?}");
                        break None;
                    }
                }

                AggregatedMessage::Pong(_) => {
                    last_heartbeat = Instant::now();
                }

                AggregatedMessage::Text(text) => {
                    last_heartbeat = Instant::now();
                    if !process_text_msg(&ws_server, &text, conn_id).await {
                        break None;
                    }
                }

                AggregatedMessage::Binary(bytes) => {
                    last_heartbeat = Instant::now();
                    match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if !process_text_msg(&ws_server, &text, conn_id).await {
                                break None;
                            }
                        }
                        Err(e) => {
                            log::warn!("unexpected binary message: {e:?}");
                        }
                    }
                }

                AggregatedMessage::Close(reason) => break reason,
            },

            // client WebSocket stream error
            Either::Left((Either::Left((Some(Err(err)), _)), _)) => {
                log::error!("WebSocket stream error: {err}");
                break None;
            }

            // client WebSocket stream ended
            Either::Left((Either::Left((None, _)), _)) => {
                log::debug!("WebSocket stream ended");
                break None;
            }

            // messages relayed from other match participants, and acks
            Either::Left((Either::Right((Some(ws_msg), _)), _)) => {
                if let Err(err) = session.text(ws_msg).await {
                    log::error!("Failed to send text message to conn_id={conn_id}: {err:?}");
                    break None;
                }
            }

            // the ws server dropped this connection's sender
            Either::Left((Either::Right((None, _)), _)) => {
                log::debug!("WsServer released conn_id={conn_id}");
                break None;
            }

            // heartbeat internal tick
            Either::Right((_inst, _)) => {
                // if no heartbeat ping/pong received recently, close the connection
                if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
                    log::info!(
                        "client has not sent heartbeat in over {CLIENT_TIMEOUT:?}; disconnecting"
                    );
                    break None;
                }

                // send heartbeat ping
                let _ = session.ping(b"").await;
            }
        }
    };

    log::debug!("handle_ws: disconnecting conn_id={conn_id}");
    if let Err(e) = ws_server.disconnect(conn_id).await {
        log::debug!("Failed to disconnect conn_id={conn_id}: {e:?}");
    }

    // attempt to close connection gracefully
    let _ = session.close(close_reason).await;
}

/// Hands one text frame to the relay.
///
/// Returns `false` once the ws server is gone and the connection should close.
async fn process_text_msg(ws_server: &WsServerHandle, text: &str, conn: ConnId) -> bool {
    match ws_server.send_message(conn, text.trim()).await {
        Ok(outcome) => {
            log::trace!("Processed message from {conn}: {outcome:?}");
            true
        }
        // the relay never answers a bad frame; the client just gets nothing back
        Err(WsServerError::Relay(e)) => {
            log::warn!("Dropping message from {conn}: {e}");
            true
        }
        Err(e @ WsServerError::Closed) => {
            log::error!("Failed to process message from {conn}: {e:?}");
            false
        }
    }
}
