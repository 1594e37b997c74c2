use std::time::Duration;

use actix_http::ws;
use actix_web::{App, web, web::Bytes};
use chess_relay::server::WsServer;
use chess_relay_server::{api, bind_services};
use futures_util::{Sink, SinkExt as _, Stream, StreamExt as _};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn start_server() -> actix_test::TestServer {
    let (ws_server, handle) = WsServer::new();
    actix_web::rt::spawn(ws_server.run());
    let data = web::Data::new(handle);

    actix_test::start(move || {
        App::new()
            .app_data(data.clone())
            .configure(bind_services)
            .default_service(web::to(api::not_found_endpoint))
    })
}

async fn send<S>(ws: &mut S, msg: ws::Message)
where
    S: Sink<ws::Message> + Unpin,
    S::Error: std::fmt::Debug,
{
    ws.send(msg).await.unwrap();
}

fn text(value: &Value) -> ws::Message {
    ws::Message::Text(value.to_string().into())
}

async fn recv_json<S>(ws: &mut S) -> Value
where
    S: Stream<Item = Result<ws::Frame, ws::ProtocolError>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();

        match frame {
            ws::Frame::Text(bytes) => return serde_json::from_slice(&bytes).unwrap(),
            // heartbeat
            ws::Frame::Ping(_) | ws::Frame::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn wait_for_health(srv: &actix_test::TestServer, expected: &Value) {
    let mut health = Value::Null;

    for _ in 0..100 {
        health = srv
            .get("/health")
            .send()
            .await
            .unwrap()
            .json::<Value>()
            .await
            .unwrap();

        if &health == expected {
            return;
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(&health, expected);
}

#[test_log::test(actix_web::test)]
async fn match_plays_out_over_websocket_frames() {
    let mut srv = start_server();
    let mut a = srv.ws_at("/ws").await.unwrap();
    let mut b = srv.ws_at("/ws").await.unwrap();

    send(
        &mut a,
        text(&json!({"type": "join-match", "matchId": "match-42", "ackId": "cb-1"})),
    )
    .await;
    assert_eq!(
        recv_json(&mut a).await,
        json!({"type": "ack", "event": "join-match", "matchId": "match-42", "ackId": "cb-1"})
    );

    // utf-8 binary frames are read as text
    send(
        &mut b,
        ws::Message::Binary(Bytes::from(
            json!({"type": "join-match", "matchId": "match-42", "ackId": 1}).to_string(),
        )),
    )
    .await;
    assert_eq!(
        recv_json(&mut b).await,
        json!({"type": "ack", "event": "join-match", "matchId": "match-42", "ackId": 1})
    );

    wait_for_health(&srv, &json!({"healthy": true, "connections": 2, "rooms": 1})).await;

    send(
        &mut a,
        text(&json!({"type": "connection-req-from-player", "matchId": "match-42", "address": "addrA"})),
    )
    .await;
    assert_eq!(
        recv_json(&mut b).await,
        json!({"type": "connection-req-from-player", "matchId": "match-42", "address": "addrA"})
    );

    send(
        &mut b,
        text(&json!({"type": "connection-req-accepted", "matchId": "match-42", "address": "addrB", "ackId": 2})),
    )
    .await;
    // the sender never sees its own request, so the next frame for A is the accept
    assert_eq!(
        recv_json(&mut a).await,
        json!({"type": "connection-req-accepted", "matchId": "match-42", "address": "addrB"})
    );
    assert_eq!(
        recv_json(&mut b).await,
        json!({"type": "ack", "event": "connection-req-accepted", "matchId": "match-42", "ackId": 2})
    );

    let move_msg = json!({
        "type": "chess-piece-moved",
        "matchId": "match-42",
        "moveData": {"from": "e2", "to": "e4", "history": vec!["x"; 64]},
    })
    .to_string();
    let (first, last) = move_msg.split_at(move_msg.len() / 2);

    send(
        &mut a,
        ws::Message::Continuation(ws::Item::FirstText(Bytes::copy_from_slice(first.as_bytes()))),
    )
    .await;
    send(
        &mut a,
        ws::Message::Continuation(ws::Item::Last(Bytes::copy_from_slice(last.as_bytes()))),
    )
    .await;
    assert_eq!(
        recv_json(&mut b).await,
        serde_json::from_str::<Value>(&move_msg).unwrap()
    );

    send(&mut b, ws::Message::Close(None)).await;
    drop(b);

    wait_for_health(&srv, &json!({"healthy": true, "connections": 1, "rooms": 1})).await;

    send(&mut a, ws::Message::Close(None)).await;
    drop(a);

    wait_for_health(&srv, &json!({"healthy": true, "connections": 0, "rooms": 0})).await;
}

#[test_log::test(actix_web::test)]
async fn dropped_socket_is_disconnected() {
    let mut srv = start_server();
    let mut a = srv.ws_at("/ws").await.unwrap();

    send(&mut a, text(&json!({"type": "join-match", "matchId": "m"}))).await;
    assert_eq!(recv_json(&mut a).await["event"], "join-match");

    wait_for_health(&srv, &json!({"healthy": true, "connections": 1, "rooms": 1})).await;

    // no close frame: the stream just ends
    drop(a);

    wait_for_health(&srv, &json!({"healthy": true, "connections": 0, "rooms": 0})).await;
}
