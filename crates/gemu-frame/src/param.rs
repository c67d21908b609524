//! Tag/length/value parameter codec.
//!
//! Bodies may carry self-describing variable-length fields encoded as
//! `[tag:1][length:1][data:length]`, preceded where applicable by a 16-bit
//! entry count. Decoded parameters are views into the owning packet's body;
//! they share its backing storage rather than copying.

use std::borrow::Cow;
use std::ops::Deref;

use bytes::{BufMut, Bytes, BytesMut};

use crate::cursor::BodyReader;
use crate::error::{Result, WireError};

/// Maximum data length of one parameter (8-bit wire length field).
pub const MAX_PARAMETER_DATA: usize = u8::MAX as usize;

/// One tag/length/value entry inside a packet body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Application-defined field identifier.
    pub tag: u8,
    /// Raw value bytes. A view into the parent body's backing storage.
    pub data: Bytes,
}

impl Parameter {
    /// Little-endian u32 from the first four data bytes; zero when shorter.
    pub fn as_u32(&self) -> u32 {
        if self.data.len() < 4 {
            return 0;
        }
        u32::from_le_bytes(self.data[..4].try_into().unwrap())
    }

    /// Little-endian u64 from the first eight data bytes; zero when shorter.
    pub fn as_u64(&self) -> u64 {
        if self.data.len() < 8 {
            return 0;
        }
        u64::from_le_bytes(self.data[..8].try_into().unwrap())
    }

    /// Value bytes as text, lossily decoded.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Decode one parameter at the cursor.
    ///
    /// Returns `None` only when no bytes remain at the tag boundary. A
    /// declared length running past the buffer end clamps the data to
    /// everything remaining and leaves the cursor at end-of-buffer; this is
    /// a degraded decode, never an error.
    pub(crate) fn decode(r: &mut BodyReader) -> Option<Parameter> {
        if !r.has_more_data() {
            return None;
        }
        let tag = r.read_u8();
        let declared = r.read_u8() as usize;
        let data = if r.remaining() < declared {
            r.take_rest()
        } else {
            r.take_slice(declared)
        };
        Some(Parameter { tag, data })
    }
}

/// Encode one TLV entry: `[tag:1][length:1][data]`.
pub fn encode_parameter(tag: u8, data: &[u8], dst: &mut BytesMut) -> Result<()> {
    if data.len() > MAX_PARAMETER_DATA {
        return Err(WireError::ParameterTooLarge {
            size: data.len(),
            max: MAX_PARAMETER_DATA,
        });
    }
    dst.reserve(2 + data.len());
    dst.put_u8(tag);
    dst.put_u8(data.len() as u8);
    dst.put_slice(data);
    Ok(())
}

/// Ordered parameter sequence decoded from a count-prefixed body region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterList(pub Vec<Parameter>);

impl ParameterList {
    /// First parameter carrying `tag`, if any.
    ///
    /// Duplicate tags are permitted on the wire; only the first is
    /// observable through lookup.
    pub fn get_tag(&self, tag: u8) -> Option<&Parameter> {
        self.0.iter().find(|p| p.tag == tag)
    }

    /// Decode a 16-bit count followed by that many parameters.
    ///
    /// Stops early, returning whatever was collected, if the buffer is
    /// exhausted at a tag boundary.
    pub(crate) fn decode(r: &mut BodyReader) -> ParameterList {
        let count = r.read_u16();
        let mut params = Vec::new();
        for _ in 0..count {
            match Parameter::decode(r) {
                Some(param) => params.push(param),
                None => break,
            }
        }
        ParameterList(params)
    }
}

impl Deref for ParameterList {
    type Target = [Parameter];

    fn deref(&self) -> &[Parameter] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
