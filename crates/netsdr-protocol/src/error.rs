use thiserror::Error;

/// Everything that can go wrong translating bytes to/from [`crate::frame::Frame`]
/// or iterating [`crate::sample`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer was null or shorter than the 2-byte header.
    #[error("frame buffer is empty or shorter than the header")]
    Empty,

    /// The header's declared length did not match the buffer's actual length.
    #[error("declared frame length does not match buffer length")]
    LengthMismatch,

    /// A control or data-item-0 frame carried an item code outside the closed set.
    #[error("item code is not a known control item")]
    UnknownItemCode,

    /// The buffer was shorter than the sub-header its frame type requires.
    #[error("frame body is shorter than its type's required sub-header")]
    Truncated,

    /// A sample width outside `1..=32` was requested.
    #[error("sample width must be between 1 and 32 bits")]
    InvalidSampleWidth,

    /// An encode request produced a frame longer than the wire format allows.
    #[error("encoded frame would exceed the maximum frame length")]
    EncodeTooLong,
}
