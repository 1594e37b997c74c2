//! Wire models for the match relay protocol.
//!
//! Every WebSocket frame is a single JSON object tagged by `type`. Inbound
//! frames are decoded into [`InboundPayload`]; frames pushed to clients are
//! [`OutboundPayload`]s. The `address` and `moveData` bodies are opaque
//! [`Value`]s and are forwarded verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, EnumString};

use crate::{MatchId, Msg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InboundMessageType {
    ConnectionReqFromPlayer,
    ConnectionReqAccepted,
    ChessPieceMoved,
    JoinMatch,
}

impl std::fmt::Display for InboundMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InboundPayload {
    ConnectionReqFromPlayer(AddressPayload),
    ConnectionReqAccepted(AcceptPayload),
    ChessPieceMoved(MovePayload),
    JoinMatch(JoinMatchPayload),
}

impl std::fmt::Display for InboundPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl InboundPayload {
    #[must_use]
    pub const fn message_type(&self) -> InboundMessageType {
        match self {
            Self::ConnectionReqFromPlayer(_) => InboundMessageType::ConnectionReqFromPlayer,
            Self::ConnectionReqAccepted(_) => InboundMessageType::ConnectionReqAccepted,
            Self::ChessPieceMoved(_) => InboundMessageType::ChessPieceMoved,
            Self::JoinMatch(_) => InboundMessageType::JoinMatch,
        }
    }

    /// The match (room) this message is addressed to.
    #[must_use]
    pub fn match_id(&self) -> &str {
        match self {
            Self::ConnectionReqFromPlayer(payload) => &payload.match_id,
            Self::ConnectionReqAccepted(payload) => &payload.match_id,
            Self::ChessPieceMoved(payload) => &payload.match_id,
            Self::JoinMatch(payload) => &payload.match_id,
        }
    }
}

/// Handshake body carrying a player's opaque address information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub match_id: MatchId,
    #[serde(default)]
    pub address: Value,
}

/// `ackId` is an opaque client token echoed back unchanged in the ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptPayload {
    pub match_id: MatchId,
    #[serde(default)]
    pub address: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<Value>,
}

impl From<AcceptPayload> for AddressPayload {
    fn from(value: AcceptPayload) -> Self {
        Self {
            match_id: value.match_id,
            address: value.address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub match_id: MatchId,
    #[serde(default)]
    pub move_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMatchPayload {
    pub match_id: MatchId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OutboundPayload {
    ConnectionReqFromPlayer(AddressPayload),
    ConnectionReqAccepted(AddressPayload),
    ChessPieceMoved(MovePayload),
    Ack(AckPayload),
}

impl std::fmt::Display for OutboundPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl OutboundPayload {
    /// Serializes the payload into a text frame.
    ///
    /// # Errors
    ///
    /// * If the payload fails to serialize
    pub fn to_msg(&self) -> Result<Msg, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Completion signal sent back to the originator of a `join-match` or
/// `connection-req-accepted` once the server side effect is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub event: InboundMessageType,
    pub match_id: MatchId,
    pub ack_id: Option<Value>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test_log::test]
    fn can_decode_connection_request() {
        let payload: InboundPayload = serde_json::from_value(json!({
            "type": "connection-req-from-player",
            "matchId": "match-42",
            "address": "addrA",
        }))
        .unwrap();

        assert_eq!(
            payload,
            InboundPayload::ConnectionReqFromPlayer(AddressPayload {
                match_id: "match-42".into(),
                address: json!("addrA"),
            })
        );
        assert_eq!(payload.match_id(), "match-42");
        assert_eq!(
            payload.message_type(),
            InboundMessageType::ConnectionReqFromPlayer
        );
    }

    #[test_log::test]
    fn can_decode_accept_with_ack_id() {
        let payload: InboundPayload = serde_json::from_str(
            r#"{"type":"connection-req-accepted","matchId":"m","address":{"ip":"10.0.0.2"},"ackId":7}"#,
        )
        .unwrap();

        assert_eq!(
            payload,
            InboundPayload::ConnectionReqAccepted(AcceptPayload {
                match_id: "m".into(),
                address: json!({"ip": "10.0.0.2"}),
                ack_id: Some(json!(7)),
            })
        );
    }

    #[test_log::test]
    fn missing_opaque_body_defaults_to_null() {
        let payload: InboundPayload =
            serde_json::from_str(r#"{"type":"chess-piece-moved","matchId":"m"}"#).unwrap();

        assert_eq!(
            payload,
            InboundPayload::ChessPieceMoved(MovePayload {
                match_id: "m".into(),
                move_data: Value::Null,
            })
        );
    }

    #[test_log::test]
    fn join_match_without_ack_id() {
        let payload: InboundPayload =
            serde_json::from_str(r#"{"type":"join-match","matchId":"m"}"#).unwrap();

        assert_eq!(
            payload,
            InboundPayload::JoinMatch(JoinMatchPayload {
                match_id: "m".into(),
                ack_id: None,
            })
        );
        assert_eq!(payload.to_string(), "join-match");
    }

    #[test_log::test]
    fn rejects_unknown_type() {
        let result = serde_json::from_str::<InboundPayload>(r#"{"type":"resign","matchId":"m"}"#);

        assert!(result.is_err());
    }

    #[test_log::test]
    fn rejects_missing_match_id() {
        let result =
            serde_json::from_str::<InboundPayload>(r#"{"type":"join-match","ackId":1}"#);

        assert!(result.is_err());
    }

    #[test_log::test]
    fn relayed_accept_drops_ack_id() {
        let outbound = OutboundPayload::ConnectionReqAccepted(
            AcceptPayload {
                match_id: "m".into(),
                address: json!("addrB"),
                ack_id: Some(json!(3)),
            }
            .into(),
        );

        let value: Value = serde_json::from_str(&outbound.to_msg().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({"type": "connection-req-accepted", "matchId": "m", "address": "addrB"})
        );
    }

    #[test_log::test]
    fn ack_serializes_null_ack_id() {
        let outbound = OutboundPayload::Ack(AckPayload {
            event: InboundMessageType::JoinMatch,
            match_id: "m".into(),
            ack_id: None,
        });

        let value: Value = serde_json::from_str(&outbound.to_msg().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({"type": "ack", "event": "join-match", "matchId": "m", "ackId": null})
        );
    }

    #[test_log::test]
    fn ack_id_is_an_opaque_token() {
        for token in [json!(-1), json!(1.5), json!("cb-1"), json!({"seq": 4})] {
            let payload: InboundPayload = serde_json::from_value(json!({
                "type": "join-match",
                "matchId": "m",
                "ackId": token,
            }))
            .unwrap();

            assert_eq!(
                payload,
                InboundPayload::JoinMatch(JoinMatchPayload {
                    match_id: "m".into(),
                    ack_id: Some(token),
                })
            );
        }
    }

    #[test_log::test]
    fn message_type_round_trips_through_strum() {
        let parsed = InboundMessageType::from_str("chess-piece-moved").unwrap();

        assert_eq!(parsed, InboundMessageType::ChessPieceMoved);
        assert_eq!(parsed.to_string(), "chess-piece-moved");
    }
}
