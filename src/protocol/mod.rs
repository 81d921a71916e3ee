//! Protocol module - operation tokens, frame reassembly, outbound frames.
//!
//! This module implements the text wire protocol:
//! - operation classification by token prefix
//! - stream-to-frame reassembly across arbitrary chunk boundaries
//! - outbound frame builders and the CONNECT options payload

mod operation;
mod reassembly;
pub mod wire;

pub use operation::Operation;
pub use reassembly::{reassemble, PendingFrame};
pub use wire::{ConnectOptions, Credentials};
