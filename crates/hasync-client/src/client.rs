//! [`HaClient`]: REST and WebSocket access to one Home Assistant instance.
//!
//! Handles are cheap clones sharing one HTTP client and one lazily opened
//! WebSocket, so every remote store of a run talks over the same connection.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use hasync_meta::Record;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::socket::Socket;
use crate::{ClientError, Result};

const TIMEOUT: Duration = Duration::from_secs(30);

/// Fields of `GET /api/config` worth showing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    #[serde(default)]
    pub location_name: String,
}

#[derive(Clone)]
pub struct HaClient {
    inner: Rc<Inner>,
}

struct Inner {
    base: Url,
    token: String,
    http: Client,
    socket: RefCell<Option<Socket>>,
}

impl std::fmt::Debug for HaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaClient").field("base", &self.inner.base.as_str()).finish()
    }
}

impl HaClient {
    /// Client for the instance at `url`. Nothing is sent until the first call.
    pub fn new(url: &str, token: &str) -> Result<Self> {
        let mut base = Url::parse(url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            inner: Rc::new(Inner {
                base,
                token: token.to_string(),
                http,
                socket: RefCell::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        Ok(self.inner.http.request(method, url).bearer_auth(&self.inner.token))
    }

    /// Send `request` and return the body, failing on non-success statuses.
    fn send(&self, method: &Method, path: &str, request: RequestBuilder) -> Result<String> {
        debug!(%method, path, "request");
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ClientError::Status {
                method: method.to_string(),
                url: path.to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }

    fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut request = self.request(method.clone(), path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        let text = self.send(&method, path, request)?;
        parse_body(&text)
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.send_json(Method::GET, path, None)
    }

    /// Like [`get`](Self::get), with a missing resource as `None`.
    pub fn get_optional(&self, path: &str) -> Result<Option<Value>> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send_json(Method::POST, path, Some(body))
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.send_json(Method::DELETE, path, None).map(|_| ())
    }

    /// Run a WebSocket command, connecting first if needed.
    pub fn ws(&self, command: &str, fields: Value) -> Result<Value> {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Record::new(),
            other => {
                return Err(ClientError::protocol(format!(
                    "command fields must be a mapping, got {other}"
                )));
            }
        };
        let mut slot = self.inner.socket.borrow_mut();
        if slot.is_none() {
            *slot = Some(Socket::connect(&self.inner.base, &self.inner.token)?);
        }
        let result = match slot.as_mut() {
            Some(socket) => socket.call(command, fields),
            None => Err(ClientError::protocol("websocket is not connected")),
        };
        if matches!(result, Err(ClientError::WebSocket(_))) {
            *slot = None;
        }
        result
    }

    /// `GET /api/`: the API's status message.
    pub fn api_status(&self) -> Result<String> {
        let body = self.get("api/")?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("API running.")
            .to_string())
    }

    pub fn server_info(&self) -> Result<ServerInfo> {
        let body = self.get("api/config")?;
        serde_json::from_value(body).map_err(|e| ClientError::protocol(format!("api/config: {e}")))
    }

    /// Render `template` on the server, returning the rendered text.
    pub fn render_template(&self, template: &str) -> Result<String> {
        let path = "api/template";
        let request = self.request(Method::POST, path)?.json(&json!({"template": template}));
        self.send(&Method::POST, path, request)
    }

    pub fn call_service(&self, domain: &str, service: &str) -> Result<()> {
        self.post(&format!("api/services/{domain}/{service}"), &json!({}))
            .map(|_| ())
    }
}

/// JSON body, with an empty body as null and a non-JSON body as a string.
fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

/// Borrow a JSON array or fail with a message naming `what`.
pub(crate) fn as_array<'v>(value: &'v Value, what: &str) -> Result<&'v Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ClientError::protocol(format!("{what}: expected a list")))
}

/// Take a JSON object or fail with a message naming `what`.
pub(crate) fn into_record(value: Value, what: &str) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ClientError::protocol(format!("{what}: expected a mapping"))),
    }
}
