//! Encrypted, checksummed telemetry frames.
//!
//! A [`Reading`] is serialized as comma-delimited decimal text, encrypted
//! with AES-128 in ECB mode under PKCS#7 padding, and followed by a single
//! CRC-8 byte computed over the ciphertext:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────┐
//! │ Ciphertext (N × 16 bytes)    │ CRC-8 (1B)   │
//! └──────────────────────────────┴──────────────┘
//! ```
//!
//! On the receive side [`Codec::decode`] runs the validation pipeline and
//! classifies every failure as a recoverable [`DecodeError`].

pub mod checksum;
pub mod cipher;
pub mod codec;
pub mod error;
pub mod reader;
pub mod sample;
pub mod writer;

pub use checksum::checksum;
pub use cipher::{Cipher, CipherKey, BLOCK_SIZE, DEFAULT_PASSPHRASE, KEY_LEN};
pub use codec::{
    Codec, Decoded, Frame, FrameConfig, CHECKSUM_LEN, DEFAULT_FRAME_LEN, DEFAULT_MIN_FRAME_LEN,
};
pub use error::{CipherError, DecodeError, FrameError, Result};
pub use reader::{FixedFramer, FrameSource, ReadLimit, SignalQuality};
pub use sample::{Reading, TelemetrySample, DELIMITER, FIELD_COUNT, FIELD_NAMES, TIMESTAMP_FORMAT};
pub use writer::FrameWriter;
