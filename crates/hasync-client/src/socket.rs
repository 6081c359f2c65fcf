//! Home Assistant WebSocket API connection
//!
//! The server greets with `auth_required`; the client answers with its access
//! token and waits for `auth_ok`. Afterwards every command carries an
//! increasing `id` and is answered by a `result` message with the same id.
//! Event messages arriving in between are skipped.

use std::net::TcpStream;

use hasync_meta::Record;
use serde_json::{Value, json};
use tracing::debug;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use crate::{ClientError, Result};

const WEBSOCKET_PATH: &str = "api/websocket";

/// WebSocket endpoint for a Home Assistant base URL.
pub fn websocket_url(base: &Url) -> Result<Url> {
    let mut url = base.join(WEBSOCKET_PATH)?;
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|()| ClientError::protocol(format!("cannot use {scheme} for {base}")))?;
    Ok(url)
}

/// Whether `message` completes authentication.
///
/// `Ok(false)` means the server is still waiting for the token.
pub fn auth_outcome(message: &Value) -> Result<bool> {
    match message.get("type").and_then(Value::as_str) {
        Some("auth_required") => Ok(false),
        Some("auth_ok") => Ok(true),
        Some("auth_invalid") => Err(ClientError::Auth {
            message: message
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("invalid access token")
                .to_string(),
        }),
        other => Err(ClientError::protocol(format!(
            "unexpected message during authentication: {}",
            other.unwrap_or("<untyped>")
        ))),
    }
}

/// The result payload of the answer to command `id`, or `None` if `message`
/// answers something else.
pub fn take_result(command: &str, id: u64, message: Value) -> Option<Result<Value>> {
    if message.get("id").and_then(Value::as_u64) != Some(id)
        || message.get("type").and_then(Value::as_str) != Some("result")
    {
        return None;
    }
    if message.get("success").and_then(Value::as_bool) == Some(true) {
        return Some(Ok(message.get("result").cloned().unwrap_or(Value::Null)));
    }
    let error = message.get("error");
    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(Err(ClientError::Command {
        command: command.to_string(),
        code: field("code"),
        message: field("message"),
    }))
}

pub(crate) struct Socket {
    stream: WebSocket<MaybeTlsStream<TcpStream>>,
    next_id: u64,
}

impl Socket {
    pub(crate) fn connect(base: &Url, token: &str) -> Result<Self> {
        let url = websocket_url(base)?;
        debug!(url = %url, "connecting websocket");
        let (stream, _) = tungstenite::connect(url.as_str())?;
        let mut socket = Self { stream, next_id: 1 };
        socket.authenticate(token)?;
        Ok(socket)
    }

    fn authenticate(&mut self, token: &str) -> Result<()> {
        let mut sent = false;
        loop {
            let message = self.read_json()?;
            if auth_outcome(&message)? {
                debug!("websocket authenticated");
                return Ok(());
            }
            if sent {
                return Err(ClientError::protocol("server asked for authentication twice"));
            }
            self.send_json(&json!({"type": "auth", "access_token": token}))?;
            sent = true;
        }
    }

    /// Run one command and wait for its result.
    pub(crate) fn call(&mut self, command: &str, fields: Record) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let mut message = Record::new();
        message.insert("id".into(), Value::from(id));
        message.insert("type".into(), Value::String(command.to_string()));
        message.extend(fields);
        self.send_json(&Value::Object(message))?;

        loop {
            if let Some(result) = take_result(command, id, self.read_json()?) {
                return result;
            }
        }
    }

    fn send_json(&mut self, value: &Value) -> Result<()> {
        self.stream.send(Message::Text(value.to_string()))?;
        Ok(())
    }

    fn read_json(&mut self) -> Result<Value> {
        loop {
            let text = match self.stream.read()? {
                Message::Text(text) => text,
                Message::Binary(bytes) => String::from_utf8(bytes)
                    .map_err(|_| ClientError::protocol("binary frame is not UTF-8"))?,
                Message::Close(_) => return Err(ClientError::protocol("connection closed by server")),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            return serde_json::from_str(&text)
                .map_err(|e| ClientError::protocol(format!("invalid JSON message: {e}")));
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        let _ = self.stream.close(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://homeassistant.local:8123/", "ws://homeassistant.local:8123/api/websocket")]
    #[case("https://ha.example.com/", "wss://ha.example.com/api/websocket")]
    #[case("https://ha.example.com/proxy/", "wss://ha.example.com/proxy/api/websocket")]
    fn test_websocket_url(#[case] base: &str, #[case] expected: &str) {
        let url = websocket_url(&Url::parse(base).unwrap()).unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn test_auth_messages() {
        assert!(!auth_outcome(&json!({"type": "auth_required", "ha_version": "2024.6.0"})).unwrap());
        assert!(auth_outcome(&json!({"type": "auth_ok"})).unwrap());
        let err = auth_outcome(&json!({"type": "auth_invalid", "message": "Invalid password"})).unwrap_err();
        assert!(matches!(err, ClientError::Auth { message } if message == "Invalid password"));
    }

    #[test]
    fn test_results_matched_by_id() {
        assert!(take_result("x/list", 3, json!({"id": 2, "type": "result", "success": true})).is_none());
        assert!(take_result("x/list", 3, json!({"id": 3, "type": "event"})).is_none());

        let ok = take_result("x/list", 3, json!({"id": 3, "type": "result", "success": true, "result": [1]}));
        assert_eq!(ok.unwrap().unwrap(), json!([1]));

        let failed = take_result(
            "lovelace/config",
            4,
            json!({"id": 4, "type": "result", "success": false, "error": {"code": "config_not_found", "message": "No config found."}}),
        )
        .unwrap()
        .unwrap_err();
        assert!(failed.is_not_found());
        assert_eq!(failed.to_string(), "lovelace/config failed (config_not_found): No config found.");
    }
}
