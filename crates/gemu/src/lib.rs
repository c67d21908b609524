//! Wire protocol and client session for a remote device-emulation endpoint.
//!
//! GEMU controls emulated device trees over a single byte-stream
//! connection: length-prefixed binary packets carry tree lifecycle
//! operations, opaque device messages, and continuous state/memory
//! synchronization streams, with concurrent requests correlated by
//! transaction ID.
//!
//! # Crate Structure
//!
//! - [`frame`] — Packet codec: header framing, cursor-based body decoding,
//!   TLV parameters
//! - [`peer`] — Session layer: transaction correlation, typed device-tree
//!   operations, sync-event delivery (behind the default `peer` feature)

/// Re-export packet codec types.
pub mod frame {
    pub use gemu_frame::*;
}

/// Re-export session types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use gemu_peer::*;
}
