//! Sequential body decoding.

use bytes::Bytes;

use crate::param::{Parameter, ParameterList};

/// Sequential, bounds-checked reader over a packet body.
///
/// Reads never fail: a read with insufficient bytes remaining yields the
/// zero value (or an empty byte string) and leaves the cursor where it was.
/// Callers distinguish genuine zeros from exhaustion through
/// [`has_more_data`](Self::has_more_data) / [`remaining`](Self::remaining).
///
/// A fixed-width read of N bytes succeeds iff exactly N or more bytes
/// remain; the final field of a body decodes normally.
///
/// The reader holds a view of the body's backing storage, so parameters and
/// byte strings it produces stay valid independently of the `Packet` they
/// came from, without copying.
#[derive(Debug, Clone)]
pub struct BodyReader {
    body: Bytes,
    pos: usize,
}

impl BodyReader {
    /// Create a reader positioned at the start of `body`.
    pub fn new(body: Bytes) -> Self {
        Self { body, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.pos + N > self.body.len() {
            return None;
        }
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.body[self.pos..self.pos + N]);
        self.pos += N;
        Some(buf)
    }

    /// Read one byte; zero if none remain.
    pub fn read_u8(&mut self) -> u8 {
        self.take::<1>().map(|[b]| b).unwrap_or(0)
    }

    /// Read a little-endian u16; zero if fewer than two bytes remain.
    pub fn read_u16(&mut self) -> u16 {
        self.take::<2>().map(u16::from_le_bytes).unwrap_or(0)
    }

    /// Read a little-endian u32; zero if fewer than four bytes remain.
    pub fn read_u32(&mut self) -> u32 {
        self.take::<4>().map(u32::from_le_bytes).unwrap_or(0)
    }

    /// Read a little-endian i32; zero if fewer than four bytes remain.
    pub fn read_i32(&mut self) -> i32 {
        self.take::<4>().map(i32::from_le_bytes).unwrap_or(0)
    }

    /// Read a 16-bit length followed by that many raw bytes.
    ///
    /// No terminator, no encoding validation. The length prefix is consumed
    /// even when the data that follows is short; the short data itself is
    /// refused and an empty byte string returned without advancing further.
    pub fn read_string(&mut self) -> Bytes {
        let len = self.read_u16() as usize;
        if self.remaining() < len {
            return Bytes::new();
        }
        self.take_slice(len)
    }

    /// Decode one TLV parameter; `None` when no bytes remain.
    pub fn read_parameter(&mut self) -> Option<Parameter> {
        Parameter::decode(self)
    }

    /// Decode a 16-bit count followed by that many TLV parameters.
    pub fn read_parameters(&mut self) -> ParameterList {
        ParameterList::decode(self)
    }

    /// Whether any body bytes remain past the cursor.
    pub fn has_more_data(&self) -> bool {
        self.pos < self.body.len()
    }

    /// Number of body bytes remaining past the cursor.
    pub fn remaining(&self) -> usize {
        self.body.len() - self.pos
    }

    /// Current cursor offset from the start of the body.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Take `n` bytes as a shared view. Caller has checked `n <= remaining()`.
    pub(crate) fn take_slice(&mut self, n: usize) -> Bytes {
        let slice = self.body.slice(self.pos..self.pos + n);
        self.pos += n;
        slice
    }

    /// Take everything remaining as a shared view.
    pub(crate) fn take_rest(&mut self) -> Bytes {
        self.take_slice(self.remaining())
    }
}
