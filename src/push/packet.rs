//! Engine.IO v4 and Socket.IO v5 text encodings, as used over HTTP long-polling.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use crate::core::{CloudError, Result};

/// Separates packets inside one polling payload
pub const RECORD_SEPARATOR: char = '\u{1e}';

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds
    pub ping_interval: u64,
    /// Milliseconds
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Binary(Bytes),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(raw: &str) -> Result<Self> {
        if let Some(encoded) = raw.strip_prefix('b') {
            let data = STANDARD
                .decode(encoded)
                .map_err(|err| CloudError::push(format!("bad binary packet: {err}")))?;
            return Ok(EnginePacket::Binary(Bytes::from(data)));
        }

        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| CloudError::push("empty packet"))?;
        let data = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(data)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(data.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(CloudError::push(format!("unknown engine packet type '{other}'"))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            // only ever sent by the server
            EnginePacket::Open(handshake) => format!("0{{\"sid\":\"{}\"}}", handshake.sid),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Binary(data) => format!("b{}", STANDARD.encode(data)),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>> {
    body.split(RECORD_SEPARATOR)
        .filter(|raw| !raw.is_empty())
        .map(EnginePacket::decode)
        .collect()
}

pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(EnginePacket::encode)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Socket.IO packet carried in an engine `Message`. Only the main namespace is used.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect { sid: Option<String> },
    Disconnect,
    Event { name: String, args: Vec<Value> },
    Ack { id: u64, args: Vec<Value> },
    ConnectError(String),
}

impl SocketPacket {
    pub fn decode(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| CloudError::push("empty socket packet"))?;
        let mut rest = chars.as_str();

        // "/admin,..." namespaces are not joined, but tolerate the prefix
        if rest.starts_with('/') {
            rest = rest.split_once(',').map(|(_, tail)| tail).unwrap_or("");
        }

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let (ack_id, data) = rest.split_at(digits);
        let ack_id = if ack_id.is_empty() { None } else { ack_id.parse::<u64>().ok() };

        match kind {
            '0' => {
                let sid = if data.is_empty() {
                    None
                } else {
                    serde_json::from_str::<Value>(data)?
                        .get("sid")
                        .and_then(Value::as_str)
                        .map(String::from)
                };
                Ok(SocketPacket::Connect { sid })
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut args = match serde_json::from_str::<Value>(data)? {
                    Value::Array(args) => args,
                    other => return Err(CloudError::push(format!("event is not an array: {other}"))),
                };
                if args.is_empty() {
                    return Err(CloudError::push("event without a name"));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => return Err(CloudError::push(format!("event name is not a string: {other}"))),
                };
                Ok(SocketPacket::Event { name, args })
            }
            '3' => {
                let id = ack_id.ok_or_else(|| CloudError::push("ack without id"))?;
                let args = match serde_json::from_str::<Value>(data)? {
                    Value::Array(args) => args,
                    other => vec![other],
                };
                Ok(SocketPacket::Ack { id, args })
            }
            '4' => {
                let message = serde_json::from_str::<Value>(data)
                    .ok()
                    .and_then(|value| value.get("message").and_then(Value::as_str).map(String::from))
                    .unwrap_or_else(|| data.to_string());
                Ok(SocketPacket::ConnectError(message))
            }
            '5' | '6' => Err(CloudError::push("binary socket packets are not supported")),
            other => Err(CloudError::push(format!("unknown socket packet type '{other}'"))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect { .. } => "0".to_string(),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                format!("2{}", Value::Array(array))
            }
            SocketPacket::Ack { id, args } => format!("3{}{}", id, Value::Array(args.clone())),
            SocketPacket::ConnectError(message) => format!("4{}", serde_json::json!({ "message": message })),
        }
    }

    /// Wraps this packet for the engine layer.
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}
