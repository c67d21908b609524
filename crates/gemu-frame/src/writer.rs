use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::encode_packet;
use crate::error::{Result, WireError};
use crate::packet::Packet;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete packets to any `Write` stream.
///
/// Each packet goes out as one contiguous header-plus-body frame; short
/// writes resume the same buffer, so a writer that is not shared mid-send
/// never interleaves bytes of two packets on the wire. Callers sending from
/// several threads must serialize their `send` calls.
#[derive(Debug)]
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> PacketWriter<T> {
    /// Create a packet writer over a byte stream.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send one packet (blocking), then flush.
    pub fn send(&mut self, packet: &Packet) -> Result<()> {
        self.buf.clear();
        encode_packet(packet, &mut self.buf)?;

        trace!(
            packet_type = %packet.packet_type,
            domain_id = packet.domain_id,
            device_id = packet.device_id,
            transaction_id = packet.transaction_id,
            body_len = packet.body.len(),
            "sending packet"
        );

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
