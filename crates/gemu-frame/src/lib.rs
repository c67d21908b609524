//! GEMU packet codec with length-prefixed framing.
//!
//! GEMU is the binary request/response protocol controlling a remote
//! device-emulation endpoint: device trees are created and torn down,
//! devices attached and removed, execution started, stopped, and reset,
//! and state/memory synchronization streams subscribed to.
//!
//! Every message is framed as a fixed 12-byte little-endian header
//! (domain, device, type, transaction, body length) followed by exactly
//! `bodyLength` body bytes — a receiver always knows where one packet ends
//! and the next begins, with no resynchronization logic.
//!
//! Bodies are decoded through a sequential [`BodyReader`] cursor that
//! degrades silently on truncation (zero values, no errors; exhaustion is
//! observable via [`BodyReader::has_more_data`]), and may carry
//! tag/length/value [`Parameter`] lists.
//!
//! This crate knows nothing about packet semantics: it neither validates
//! operation ordering nor correlates responses to requests. See the peer
//! crate for the correlation layer.

pub mod codec;
pub mod cursor;
pub mod error;
pub mod packet;
pub mod param;
pub mod reader;
pub mod writer;

pub use codec::{decode_packet, encode_packet, HEADER_SIZE, MAX_BODY_LEN};
pub use cursor::BodyReader;
pub use error::{Result, WireError};
pub use packet::{Packet, PacketBuilder, PacketType, RESPONSE_BIT};
pub use param::{encode_parameter, Parameter, ParameterList, MAX_PARAMETER_DATA};
pub use reader::PacketReader;
pub use writer::PacketWriter;
