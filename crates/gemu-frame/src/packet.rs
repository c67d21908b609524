//! Packet model: type catalog, decoded packets, and the body builder.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::HEADER_SIZE;
use crate::cursor::BodyReader;
use crate::error::Result;
use crate::param::encode_parameter;

/// Bit set on a request's type code to form its response code.
pub const RESPONSE_BIT: u16 = 0x8000;

/// Operation or event code carried in a packet header.
///
/// Wraps the raw 16-bit code, so codes outside the known catalog survive
/// decoding untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(pub u16);

impl PacketType {
    /// Enumerate available device classes.
    pub const LIST_CLASSES: PacketType = PacketType(0x0001);
    /// Create a device tree.
    pub const CREATE_DT: PacketType = PacketType(0x0101);
    /// Tear down a device tree.
    pub const DELETE_DT: PacketType = PacketType(0x0102);
    /// Attach a device to a device tree.
    pub const ATTACH_DT_DEVICE: PacketType = PacketType(0x0103);
    /// Remove a device from a device tree.
    pub const REMOVE_DT_DEVICE: PacketType = PacketType(0x0104);
    /// Start execution.
    pub const START_DT: PacketType = PacketType(0x0105);
    /// Stop execution.
    pub const STOP_DT: PacketType = PacketType(0x0106);
    /// Reset a device tree.
    pub const RESET_DT: PacketType = PacketType(0x0107);
    /// Opaque message to one device. No response.
    pub const SEND_DEVICE_MESSAGE: PacketType = PacketType(0x0110);
    /// Subscribe to state synchronization.
    pub const REQUEST_STATE_SYNC: PacketType = PacketType(0x0120);
    /// Subscribe to memory synchronization.
    pub const REQUEST_MEM_SYNC: PacketType = PacketType(0x0121);
    /// Cancel a state synchronization subscription.
    pub const CANCEL_STATE_SYNC: PacketType = PacketType(0x0122);
    /// Cancel a memory synchronization subscription.
    pub const CANCEL_MEM_SYNC: PacketType = PacketType(0x0123);
    /// Unsolicited state synchronization event.
    pub const STATE_SYNC: PacketType = PacketType(0x0130);
    /// Unsolicited memory synchronization event.
    pub const MEM_SYNC: PacketType = PacketType(0x0131);

    /// The response code for this request code.
    pub fn response(self) -> PacketType {
        PacketType(self.0 | RESPONSE_BIT)
    }

    /// The request code underlying this code (identity for requests).
    pub fn request(self) -> PacketType {
        PacketType(self.0 & !RESPONSE_BIT)
    }

    /// Whether the response bit is set.
    pub fn is_response(self) -> bool {
        self.0 & RESPONSE_BIT != 0
    }

    /// Whether this is an unsolicited sync stream event.
    pub fn is_sync_event(self) -> bool {
        self == Self::STATE_SYNC || self == Self::MEM_SYNC
    }

    /// Whether a request of this type is answered by a response packet.
    pub fn expects_response(self) -> bool {
        !self.is_response() && !self.is_sync_event() && self != Self::SEND_DEVICE_MESSAGE
    }

    /// Human-readable name of the underlying request/event code.
    pub fn name(self) -> &'static str {
        match self.request() {
            Self::LIST_CLASSES => "ListClasses",
            Self::CREATE_DT => "CreateDT",
            Self::DELETE_DT => "DeleteDT",
            Self::ATTACH_DT_DEVICE => "AttachDTDevice",
            Self::REMOVE_DT_DEVICE => "RemoveDTDevice",
            Self::START_DT => "StartDT",
            Self::STOP_DT => "StopDT",
            Self::RESET_DT => "ResetDT",
            Self::SEND_DEVICE_MESSAGE => "SendDeviceMessage",
            Self::REQUEST_STATE_SYNC => "RequestStateSync",
            Self::REQUEST_MEM_SYNC => "RequestMemSync",
            Self::CANCEL_STATE_SYNC => "CancelStateSync",
            Self::CANCEL_MEM_SYNC => "CancelMemSync",
            Self::STATE_SYNC => "StateSync",
            Self::MEM_SYNC => "MemSync",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_response() {
            write!(f, "{}Response", self.name())
        } else {
            f.write_str(self.name())
        }
    }
}

impl fmt::Debug for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x})", self, self.0)
    }
}

impl From<u16> for PacketType {
    fn from(code: u16) -> Self {
        PacketType(code)
    }
}

impl From<PacketType> for u16 {
    fn from(packet_type: PacketType) -> Self {
        packet_type.0
    }
}

/// A single, complete protocol message.
///
/// Immutable once built; body decoding goes through a separate
/// [`BodyReader`] cursor so concurrent decodes never share position state.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Device tree / session this message applies to.
    pub domain_id: u32,
    /// Device within the domain; 0 when not applicable.
    pub device_id: u16,
    /// Operation or event being performed.
    pub packet_type: PacketType,
    /// Caller-assigned correlation token.
    pub transaction_id: u16,
    /// Opaque payload, interpreted per `packet_type`.
    pub body: Bytes,
}

impl Packet {
    /// The total wire size of this packet (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// A fresh cursor over the body, positioned at its start.
    pub fn body_reader(&self) -> BodyReader {
        BodyReader::new(self.body.clone())
    }

    /// Whether this packet answers `request` (matching type and
    /// transaction ID).
    pub fn is_response_to(&self, request: &Packet) -> bool {
        self.packet_type == request.packet_type.response()
            && self.transaction_id == request.transaction_id
    }
}

/// Accumulates an outgoing packet body incrementally.
///
/// All integer writers append their little-endian representation. The
/// 12-byte header is laid down by the codec at send time, once the body is
/// complete, so no field needs to know the total length up front.
#[derive(Debug)]
pub struct PacketBuilder {
    domain_id: u32,
    device_id: u16,
    packet_type: PacketType,
    transaction_id: u16,
    body: BytesMut,
}

impl PacketBuilder {
    /// Start a packet with an empty body.
    pub fn new(
        domain_id: u32,
        device_id: u16,
        packet_type: PacketType,
        transaction_id: u16,
    ) -> Self {
        Self {
            domain_id,
            device_id,
            packet_type,
            transaction_id,
            body: BytesMut::new(),
        }
    }

    /// Start a response to `request`: same domain, device, and transaction,
    /// type with the response bit set.
    pub fn response_to(request: &Packet) -> Self {
        Self::new(
            request.domain_id,
            request.device_id,
            request.packet_type.response(),
            request.transaction_id,
        )
    }

    /// Append one byte.
    pub fn write_u8(&mut self, val: u8) {
        self.body.put_u8(val);
    }

    /// Append a u16, little-endian.
    pub fn write_u16(&mut self, val: u16) {
        self.body.put_u16_le(val);
    }

    /// Append a u32, little-endian.
    pub fn write_u32(&mut self, val: u32) {
        self.body.put_u32_le(val);
    }

    /// Append an i32, little-endian.
    pub fn write_i32(&mut self, val: i32) {
        self.body.put_i32_le(val);
    }

    /// Append a buffer verbatim.
    pub fn write_bytes(&mut self, val: &[u8]) {
        self.body.put_slice(val);
    }

    /// Append a word buffer, each word little-endian.
    pub fn write_words(&mut self, val: &[u16]) {
        self.body.reserve(val.len() * 2);
        for word in val {
            self.body.put_u16_le(*word);
        }
    }

    /// Append a 16-bit length followed by the raw bytes.
    ///
    /// No terminator, no encoding validation. Data longer than 65535 bytes
    /// cannot fit a body anyway; sending such a packet fails with
    /// [`BodyTooLarge`](crate::WireError::BodyTooLarge).
    pub fn write_string(&mut self, val: impl AsRef<[u8]>) {
        let val = val.as_ref();
        self.body.put_u16_le(val.len() as u16);
        self.body.put_slice(val);
    }

    /// Encode one TLV parameter entry.
    pub fn write_parameter(&mut self, tag: u8, data: &[u8]) -> Result<()> {
        encode_parameter(tag, data, &mut self.body)
    }

    /// Encode a 16-bit count followed by the given TLV entries.
    pub fn write_parameter_list(&mut self, params: &[(u8, &[u8])]) -> Result<()> {
        self.body.put_u16_le(params.len() as u16);
        for (tag, data) in params {
            encode_parameter(*tag, data, &mut self.body)?;
        }
        Ok(())
    }

    /// Current body offset, for later patching.
    pub fn position(&self) -> u16 {
        self.body.len() as u16
    }

    /// Overwrite a previously written byte at `at`.
    ///
    /// `at` comes from [`position`](Self::position); panics if it lies past
    /// the current body end.
    pub fn patch_u8(&mut self, at: u16, val: u8) {
        self.body[at as usize] = val;
    }

    /// Overwrite a previously written u16 at `at`, little-endian.
    ///
    /// `at` comes from [`position`](Self::position); panics if the two
    /// bytes lie past the current body end.
    pub fn patch_u16(&mut self, at: u16, val: u16) {
        let at = at as usize;
        self.body[at..at + 2].copy_from_slice(&val.to_le_bytes());
    }

    /// Current body length in bytes.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Freeze into an immutable packet.
    pub fn finish(self) -> Packet {
        Packet {
            domain_id: self.domain_id,
            device_id: self.device_id,
            packet_type: self.packet_type,
            transaction_id: self.transaction_id,
            body: self.body.freeze(),
        }
    }
}
