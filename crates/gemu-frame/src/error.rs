/// Errors that can occur during packet encoding and framing I/O.
///
/// Decode degradation (running out of body bytes mid-read) is deliberately
/// not an error; see [`crate::cursor::BodyReader`].
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The packet body exceeds the 16-bit wire length field.
    #[error("packet body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A TLV parameter's data exceeds the 8-bit wire length field.
    #[error("parameter data too large ({size} bytes, max {max})")]
    ParameterTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete packet was received.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
