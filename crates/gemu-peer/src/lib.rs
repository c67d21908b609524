//! Session management and request correlation for the GEMU protocol.
//!
//! This is the "just works" layer over the packet codec. A [`Session`]
//! owns one connection to a device-emulation endpoint and does the
//! bookkeeping the wire protocol leaves to callers: it allocates unique
//! in-flight transaction IDs, matches each response packet to its request
//! regardless of arrival order, queues unsolicited state/memory sync
//! events, and exposes every catalog operation as a typed method
//! (`create_dt`, `attach_device`, `start_dt`, ...).

pub mod connector;
pub mod error;
mod ops;
pub mod session;
pub mod types;

pub use connector::{connect, connect_with_config, TcpSession};
pub use error::{PeerError, Result};
pub use session::{Session, SessionConfig};
pub use types::{DeviceClass, MemRegion, Subscription, SyncEvent, SyncKind};
