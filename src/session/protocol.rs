//! RPC message model and wire framings.
//!
//! Messages keep the editor's RPC shapes:
//!
//! ```text
//! [0, id, method, params]    request      (either direction)
//! [1, id, error, result]     response     (either direction)
//! [2, method, params]        notification (either direction)
//! ```
//!
//! On the wire each message is either a bare MessagePack array (what
//! `nvim --embed` speaks) or one JSON array per line, see [`WireFormat`].
//!
//! `params` is always an array. Payloads stay opaque [`serde_json::Value`]s;
//! interpreting them is the business of the session handler.

// Rust guideline compliant 2026-02

use std::fmt;
use std::io::{self, BufRead};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::BridgeError;

/// Message type tags (first array element).
pub mod kind {
    /// `[0, id, method, params]`.
    pub const REQUEST: u64 = 0;
    /// `[1, id, error, result]`.
    pub const RESPONSE: u64 = 1;
    /// `[2, method, params]`.
    pub const NOTIFICATION: u64 = 2;
}

/// One RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A call that expects a [`Message::Response`] with the same id.
    Request {
        /// Correlation id, unique per direction.
        id: u64,
        /// Method name.
        method: String,
        /// Positional arguments.
        params: Vec<Value>,
    },
    /// Reply to a request.
    Response {
        /// Id of the request being answered.
        id: u64,
        /// Error payload, `None` on success.
        error: Option<Value>,
        /// Result payload (`null` on error).
        result: Value,
    },
    /// Fire-and-forget event.
    Notification {
        /// Method name (e.g. `redraw`).
        method: String,
        /// Positional arguments.
        params: Vec<Value>,
    },
}

impl Message {
    /// The message as its RPC array.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Request { id, method, params } => json!([kind::REQUEST, id, method, params]),
            Self::Response { id, error, result } => {
                json!([kind::RESPONSE, id, error, result])
            }
            Self::Notification { method, params } => json!([kind::NOTIFICATION, method, params]),
        }
    }

    /// Encode as a single JSON line, including the trailing newline.
    pub fn encode(&self) -> String {
        let mut line = self.to_value().to_string();
        line.push('\n');
        line
    }

    /// Decode one line. Surrounding whitespace is ignored.
    pub fn decode(line: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| BridgeError::Protocol(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Interpret an RPC array, whatever framing it arrived in.
    pub fn from_value(value: Value) -> Result<Self, BridgeError> {
        let Value::Array(mut parts) = value else {
            return Err(BridgeError::Protocol("message is not an array".to_string()));
        };
        let tag = parts
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| BridgeError::Protocol("missing message type".to_string()))?;

        match (tag, parts.len()) {
            (kind::REQUEST, 4) => {
                let params = take_params(&mut parts[3])?;
                Ok(Self::Request {
                    id: id_of(&parts[1])?,
                    method: method_of(&parts[2])?,
                    params,
                })
            }
            (kind::RESPONSE, 4) => {
                let error = match parts[2].take() {
                    Value::Null => None,
                    other => Some(other),
                };
                Ok(Self::Response {
                    id: id_of(&parts[1])?,
                    error,
                    result: parts[3].take(),
                })
            }
            (kind::NOTIFICATION, 3) => {
                let params = take_params(&mut parts[2])?;
                Ok(Self::Notification {
                    method: method_of(&parts[1])?,
                    params,
                })
            }
            (tag, len) => Err(BridgeError::Protocol(format!(
                "unexpected message type {tag} with {len} fields"
            ))),
        }
    }
}

/// Framing of messages on the editor's stdio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireFormat {
    /// Back-to-back MessagePack arrays.
    #[default]
    #[serde(rename = "msgpack")]
    MessagePack,
    /// One JSON array per line.
    #[serde(rename = "json-lines")]
    JsonLines,
}

impl WireFormat {
    /// Name used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessagePack => "msgpack",
            Self::JsonLines => "json-lines",
        }
    }

    /// Bytes to write for `message`.
    pub fn encode(self, message: &Message) -> Result<Vec<u8>, BridgeError> {
        match self {
            Self::MessagePack => rmp_serde::to_vec(&message.to_value())
                .map_err(|e| BridgeError::Protocol(format!("cannot encode message: {e}"))),
            Self::JsonLines => Ok(message.encode().into_bytes()),
        }
    }

    /// Read the next message from `reader`.
    ///
    /// `Ok(None)` is a clean end of stream. An inner error is a frame that
    /// was read whole but is not a valid message; reading may continue.
    /// An outer error means the stream itself is unusable.
    pub fn read<R: BufRead>(
        self,
        reader: &mut R,
    ) -> io::Result<Option<Result<Message, BridgeError>>> {
        match self {
            Self::JsonLines => {
                let mut line = String::new();
                loop {
                    line.clear();
                    if reader.read_line(&mut line)? == 0 {
                        return Ok(None);
                    }
                    if !line.trim().is_empty() {
                        return Ok(Some(Message::decode(&line)));
                    }
                }
            }
            Self::MessagePack => {
                if reader.fill_buf()?.is_empty() {
                    return Ok(None);
                }
                // A bad value leaves the stream position undefined.
                let value = rmp_serde::from_read::<_, Value>(reader)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(Message::from_value(value)))
            }
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::MessagePack, Self::JsonLines]
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| format!("unknown wire format '{s}' (expected msgpack or json-lines)"))
    }
}

fn id_of(value: &Value) -> Result<u64, BridgeError> {
    value
        .as_u64()
        .ok_or_else(|| BridgeError::Protocol(format!("invalid message id: {value}")))
}

fn method_of(value: &Value) -> Result<String, BridgeError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BridgeError::Protocol(format!("invalid method name: {value}")))
}

fn take_params(value: &mut Value) -> Result<Vec<Value>, BridgeError> {
    match value.take() {
        Value::Array(params) => Ok(params),
        other => Err(BridgeError::Protocol(format!("params must be an array, got {other}"))),
    }
}
