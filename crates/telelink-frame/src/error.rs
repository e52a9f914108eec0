/// Errors that can occur while moving frames over a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream accepted no bytes while a frame was being written.
    #[error("connection closed (frame not written)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Block cipher failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// Ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext length {len} is not a positive multiple of {block}")]
    Length { len: usize, block: usize },

    /// Decrypted padding bytes are structurally invalid.
    #[error("invalid PKCS#7 padding")]
    Padding,

    /// Decrypted payload is not UTF-8 text.
    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
}

/// Classified, recoverable outcome of the receive-validation pipeline.
///
/// None of these end a session: the frame is dropped and the receiver goes
/// back to waiting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The read window produced nothing or too few bytes to be a frame.
    #[error("short frame ({len} bytes, need at least {min})")]
    ShortFrame { len: usize, min: usize },

    /// The trailing checksum byte does not match the ciphertext.
    #[error("CRC mismatch (received {received:#04x}, expected {expected:#04x})")]
    CrcMismatch { received: u8, expected: u8 },

    /// The ciphertext could not be decrypted to text.
    #[error("decrypt failure: {0}")]
    DecryptFailure(CipherError),

    /// The plaintext does not have the expected number of tokens.
    #[error("format error ({tokens} tokens, expected {expected})")]
    FormatError { tokens: usize, expected: usize },

    /// A token is not a valid integer literal.
    #[error("value error (token {index}: {token:?})")]
    ValueError { index: usize, token: String },
}

impl DecodeError {
    /// Stable label naming the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::ShortFrame { .. } => "short_frame",
            DecodeError::CrcMismatch { .. } => "crc_mismatch",
            DecodeError::DecryptFailure(_) => "decrypt_failure",
            DecodeError::FormatError { .. } => "format_error",
            DecodeError::ValueError { .. } => "value_error",
        }
    }
}
