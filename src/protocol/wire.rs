//! Outbound frame builders.
//!
//! Every frame a client writes is a CRLF-terminated text line; PUB carries an
//! extra payload line. The CONNECT payload is a structured options value
//! serialized to a deterministic JSON map (serde_json's map keeps keys in
//! sorted order).
//!
//! # Example
//!
//! ```
//! use natslink::protocol::wire;
//!
//! assert_eq!(wire::subscribe("updates", "1"), "SUB updates 1\r\n");
//! assert_eq!(wire::publish("updates", "hello"), "PUB updates 5\r\nhello\r\n");
//! ```

use serde_json::{json, Map, Value};

/// Credentials for the CONNECT payload, sourced from the connected URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Basic `user:pass` pair embedded in the URL authority.
    UserPass {
        /// URL username.
        user: String,
        /// URL password.
        pass: String,
    },
    /// A single key/value pair taken from the URL query string.
    Token {
        /// Credential key (e.g. `auth_token`).
        key: String,
        /// Credential value.
        value: String,
    },
}

/// Options carried by the CONNECT frame.
///
/// Explicitly enumerated fields rather than a free-form map; serialization
/// order is deterministic.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Ask the server to acknowledge every operation with +OK.
    pub verbose: bool,
    /// Ask the server to reject invalid subjects strictly.
    pub pedantic: bool,
    /// Mirror of the server's TLS requirement flag.
    pub ssl_required: bool,
    /// Client name advertised to the server.
    pub name: String,
    /// Client implementation language.
    pub lang: String,
    /// Client version string.
    pub version: String,
    /// Credentials, present when the server requires authentication.
    pub credentials: Option<Credentials>,
}

impl ConnectOptions {
    /// Serialize to the JSON map the CONNECT frame carries.
    pub fn to_json(&self) -> String {
        let mut map = Map::new();
        map.insert("verbose".to_string(), json!(self.verbose));
        map.insert("pedantic".to_string(), json!(self.pedantic));
        map.insert("ssl_required".to_string(), json!(self.ssl_required));
        map.insert("name".to_string(), json!(self.name));
        map.insert("lang".to_string(), json!(self.lang));
        map.insert("version".to_string(), json!(self.version));

        match &self.credentials {
            Some(Credentials::UserPass { user, pass }) => {
                map.insert("user".to_string(), json!(user));
                map.insert("pass".to_string(), json!(pass));
            }
            Some(Credentials::Token { key, value }) => {
                map.insert(key.clone(), json!(value));
            }
            None => {}
        }

        Value::Object(map).to_string()
    }
}

/// Build a CONNECT frame.
pub fn connect(options: &ConnectOptions) -> String {
    format!("CONNECT {}\r\n", options.to_json())
}

/// Build a PUB frame: header with the payload byte count, then the payload.
pub fn publish(subject: &str, payload: &str) -> String {
    format!("PUB {} {}\r\n{}\r\n", subject, payload.len(), payload)
}

/// Build a SUB frame.
pub fn subscribe(subject: &str, sid: &str) -> String {
    format!("SUB {subject} {sid}\r\n")
}

/// Build an UNSUB frame.
pub fn unsubscribe(sid: &str) -> String {
    format!("UNSUB {sid}\r\n")
}

/// Build a PING frame.
pub fn ping() -> String {
    "PING\r\n".to_string()
}

/// Build a PONG frame.
pub fn pong() -> String {
    "PONG\r\n".to_string()
}
