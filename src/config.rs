//! Client configuration.

use std::time::Duration;

/// Default maximum connect attempts per retry pass.
pub const DEFAULT_AUTO_RETRY_MAX: u32 = 3;

/// Default delay between retry attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Configuration for a [`NatsClient`](crate::NatsClient).
///
/// Retry knobs drive [`retry_connection`](crate::NatsClient::retry_connection);
/// the remaining fields are advertised to the server in the CONNECT payload.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whether a retry pass attempts to reconnect at all.
    pub auto_retry: bool,
    /// Maximum connect attempts per retry pass.
    pub auto_retry_max: u32,
    /// Delay between failed attempts.
    pub retry_delay: Duration,
    /// Ask the server for +OK acknowledgments.
    pub verbose: bool,
    /// Ask the server for strict subject validation.
    pub pedantic: bool,
    /// Client name sent in CONNECT.
    pub name: String,
    /// Client language sent in CONNECT.
    pub lang: String,
    /// Client version sent in CONNECT.
    pub version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auto_retry: false,
            auto_retry_max: DEFAULT_AUTO_RETRY_MAX,
            retry_delay: DEFAULT_RETRY_DELAY,
            verbose: false,
            pedantic: false,
            name: "natslink".to_string(),
            lang: "rust".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
