//! Dedicated writer task for outbound frames.
//!
//! Frames are encoded by the protocol module before they reach this layer;
//! the writer receives them over a bounded mpsc channel and a dedicated task
//! writes them to the transport write half. Queued frames are coalesced into
//! a single buffer per wakeup so a burst of sends costs one syscall.
//!
//! # Architecture
//!
//! ```text
//! session ──┐
//! read loop ─┼─► mpsc::Sender<Bytes> ─► writer task ─► TCP write half
//! app tasks ─┘
//! ```
//!
//! The bounded channel applies backpressure at `send`; dropping every
//! [`WriterHandle`] closes the channel and ends the task cleanly.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{NatsError, Result};

/// Default frame queue capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames coalesced into a single write.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for queueing frames to the writer task.
///
/// Cheaply cloneable; every part of the session that writes (the session
/// itself, the read loop's PONG reply, application publish calls) holds one.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
}

impl WriterHandle {
    /// Queue an encoded frame, waiting for channel capacity if needed.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionClosed` once the writer task is gone.
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| NatsError::ConnectionClosed)
    }
}

/// Spawn the writer task over a transport write half.
///
/// Returns the sending handle and the task's join handle.
pub fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop: drain the channel, coalesce, write.
async fn writer_loop<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut batch = BytesMut::with_capacity(8 * 1024);

    loop {
        let first = match rx.recv().await {
            Some(frame) => frame,
            // Channel closed: every handle dropped, clean shutdown.
            None => return Ok(()),
        };

        batch.clear();
        batch.extend_from_slice(&first);

        let mut queued = 1;
        while queued < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => {
                    batch.extend_from_slice(&frame);
                    queued += 1;
                }
                Err(_) => break,
            }
        }

        writer.write_all(&batch).await?;
        writer.flush().await?;
    }
}
