/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Codec or framing-level error.
    #[error("wire error: {0}")]
    Wire(#[from] gemu_frame::WireError),

    /// Failed to connect to the emulation endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The endpoint answered with a non-zero status code.
    #[error("endpoint reported error {code}")]
    Endpoint { code: u32 },

    /// No request with this transaction ID is awaiting a response.
    #[error("no request in flight with transaction ID {0}")]
    UnknownTransaction(u16),

    /// Every transaction ID is tied up by an in-flight request.
    #[error("all transaction IDs are in flight")]
    TransactionIdsExhausted,

    /// The sync event queue filled up while waiting on a response.
    #[error("sync event buffer full ({0} events)")]
    EventBufferFull(usize),
}

pub type Result<T> = std::result::Result<T, PeerError>;
