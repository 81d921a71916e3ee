//! # natslink
//!
//! Rust client for the NATS wire protocol: a line-oriented, text-based
//! publish/subscribe protocol spoken over TCP.
//!
//! ## Architecture
//!
//! - **Protocol** (`protocol`): operation classification, stream-to-frame
//!   reassembly across arbitrary chunk boundaries, outbound frame builders
//! - **Session** (`client`): the connection state machine - candidate
//!   failover, INFO/CONNECT handshake, authentication, bounded retry
//! - **Events** (`events`): per-session bus for lifecycle notifications
//! - **Writer** (`writer`): dedicated task coalescing outbound frames
//!
//! ## Example
//!
//! ```ignore
//! use natslink::{NatsClient, NatsEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = NatsClient::builder()
//!         .url("nats://127.0.0.1:4222")
//!         .auto_retry(true)
//!         .build();
//!
//!     client.events().subscribe(&[NatsEvent::Error], |_, payload| {
//!         eprintln!("server error: {payload:?}");
//!     });
//!
//!     client.connect().await?;
//!     client.publish("updates", "hello").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod server;
pub mod transport;

mod client;
mod writer;

pub use client::{ClientBuilder, ConnectionState, NatsClient, HANDSHAKE_TIMEOUT};
pub use config::ClientConfig;
pub use error::NatsError;
pub use events::{EventBus, ListenerId, NatsEvent};
pub use server::ServerInfo;
