//! Subscriber - connect to a server and print delivered messages.
//!
//! This example demonstrates:
//! - Creating a client with the builder pattern
//! - Subscribing to a subject
//! - Consuming raw MSG frames from the message stream
//!
//! # Running against a local server
//!
//! ```sh
//! nats-server -p 4222 &
//! cargo run --example subscribe
//! ```

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
        .url("nats://127.0.0.1:4222")
        .name("subscribe-demo")
        .build();

    client.events().subscribe(&[NatsEvent::Error], |_, payload| {
        eprintln!("server error: {}", payload.unwrap_or("unknown"));
    });

    // Take the stream before connecting so no frame is dropped
    let mut messages = client.messages().expect("message stream already taken");

    client.connect().await?;
    client.subscribe("updates", "1").await?;
    println!("subscribed to 'updates', waiting for messages...");

    while let Some(frame) = messages.recv().await {
        // A MSG frame is the header and payload joined by a newline
        match frame.split_once('\n') {
            Some((header, payload)) => {
                println!("{} => {}", header.trim_end(), payload.trim_end())
            }
            None => println!("{frame}"),
        }
    }

    Ok(())
}
