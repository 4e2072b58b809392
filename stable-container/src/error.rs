use thiserror::Error;

/// Errors from stable container schema construction, encoding, decoding,
/// merkleization and proof verification.
#[derive(Debug, Error)]
pub enum StableContainerError {
    /// The fixed and variable payload does not fit the 32-bit offset width.
    #[error("encoding too large: {len} payload bytes do not fit 32-bit offsets")]
    EncodingTooLarge {
        /// Payload length in bytes.
        len: usize,
    },
    /// Fewer bytes than the presence vector or fixed region requires.
    #[error("truncated input: needed {needed} bytes, got {available}")]
    TruncatedInput {
        /// Bytes required.
        needed: usize,
        /// Bytes supplied.
        available: usize,
    },
    /// A required field is marked absent, or a reserved bit is set.
    #[error("invalid presence bits: {0}")]
    InvalidPresenceBits(String),
    /// Offsets are decreasing, misplaced, or point outside the payload.
    #[error("malformed offsets: {0}")]
    MalformedOffsets(String),
    /// The schema declares more fields than its capacity allows.
    #[error("schema declares {fields} fields but capacity is {capacity}")]
    CapacityExceeded {
        /// Declared field or chunk count.
        fields: usize,
        /// The limit it exceeds.
        capacity: usize,
    },
    /// Bytes remain after an all-fixed payload.
    #[error("trailing bytes: expected {expected} payload bytes, got {actual}")]
    TrailingBytes {
        /// Length of the fixed region.
        expected: usize,
        /// Length of the payload.
        actual: usize,
    },
    /// Producer and consumer disagree on the type identity.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// The schema itself is malformed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The value does not have the shape the schema describes.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A leaf element failed to decode.
    #[error("invalid element: {0}")]
    InvalidElement(String),
    /// A field proof is malformed or does not match the expected root.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
}
