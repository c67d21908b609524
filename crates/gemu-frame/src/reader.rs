use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::decode_packet;
use crate::error::{Result, WireError};
use crate::packet::Packet;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete packets from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete packets.
/// The stream needs no message boundaries of its own; the 12-byte header's
/// length field determines exactly where each packet ends.
#[derive(Debug)]
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> PacketReader<T> {
    /// Create a packet reader over a byte stream.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` when the stream ends,
    /// whether between packets or mid-frame. A peer that declared a body
    /// length it never delivers keeps this call blocked until the
    /// connection fails.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = decode_packet(&mut self.buf) {
                trace!(
                    packet_type = %packet.packet_type,
                    domain_id = packet.domain_id,
                    device_id = packet.device_id,
                    transaction_id = packet.transaction_id,
                    body_len = packet.body.len(),
                    "received packet"
                );
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(WireError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
