//! Lifecycle - observe connection events and automatic retry.
//!
//! This example demonstrates:
//! - Registering listeners for every lifecycle event
//! - Multi-server failover (the first URL is intentionally dead)
//! - The bounded retry pass after a lost connection
//!
//! # Running against a local server
//!
//! ```sh
//! nats-server -p 4222 &
//! cargo run --example lifecycle
//! ```

use std::time::Duration;

use natslink::{NatsClient, NatsEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "natslink=debug".into()),
        )
        .init();

    let mut client = NatsClient::builder()
        // Dead candidate first: connect() falls through to the second
        .url("nats://127.0.0.1:14333")
        .url("nats://127.0.0.1:4222")
        .auto_retry(true)
        .auto_retry_max(3)
        .retry_delay(Duration::from_secs(1))
        .name("lifecycle-demo")
        .build();

    client.events().subscribe(&NatsEvent::ALL, |event, payload| {
        match payload {
            Some(payload) => println!("event: {event:?} ({payload})"),
            None => println!("event: {event:?}"),
        }
    });

    client.connect().await?;
    println!(
        "connected to {}",
        client.connected_url().map(|u| u.to_string()).unwrap_or_default()
    );

    client.publish("updates", "hello from lifecycle-demo").await?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    client.disconnect().await;

    Ok(())
}
