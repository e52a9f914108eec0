use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::checksum::checksum;
use crate::cipher::Cipher;
use crate::error::DecodeError;
use crate::sample::{Reading, TelemetrySample};

/// Trailing checksum: 1 byte.
pub const CHECKSUM_LEN: usize = 1;

/// Two cipher blocks plus the checksum byte.
pub const DEFAULT_FRAME_LEN: usize = 33;

/// One cipher block plus the checksum byte; anything shorter is discarded
/// before the integrity check.
pub const DEFAULT_MIN_FRAME_LEN: usize = 17;

/// An encrypted telemetry frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// AES-128/ECB ciphertext, a positive multiple of 16 bytes.
    pub ciphertext: Bytes,
    /// CRC-8 of `ciphertext`.
    pub checksum: u8,
}

impl Frame {
    /// Build a frame over `ciphertext`, computing its checksum.
    pub fn seal(ciphertext: impl Into<Bytes>) -> Self {
        let ciphertext = ciphertext.into();
        let checksum = checksum(&ciphertext);
        Self {
            ciphertext,
            checksum,
        }
    }

    /// The total wire size of this frame (ciphertext + checksum).
    pub fn wire_size(&self) -> usize {
        self.ciphertext.len() + CHECKSUM_LEN
    }

    /// Wire format:
    /// ```text
    /// ┌──────────────────────────────┬──────────────┐
    /// │ Ciphertext (N bytes)         │ CRC-8 (1B)   │
    /// └──────────────────────────────┴──────────────┘
    /// ```
    pub fn to_wire(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        dst.put_slice(&self.ciphertext);
        dst.put_u8(self.checksum);
        dst.freeze()
    }

    /// True when the stored checksum matches the ciphertext.
    pub fn is_intact(&self) -> bool {
        self.checksum == checksum(&self.ciphertext)
    }
}

/// Configuration for reading and validating frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Bytes requested per read window. Default: 33.
    pub frame_len: usize,
    /// Shortest read accepted as a plausible frame. Default: 17.
    pub min_frame_len: usize,
    /// Length of one read window.
    pub read_timeout: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_len: DEFAULT_FRAME_LEN,
            min_frame_len: DEFAULT_MIN_FRAME_LEN,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// A frame that passed every validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub sample: TelemetrySample,
    /// Checksum verdict carried into the data table.
    pub integrity_ok: bool,
}

/// Packet encoder and decoder bound to one key.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    cipher: Cipher,
    config: FrameConfig,
}

impl Codec {
    pub fn new(cipher: Cipher, config: FrameConfig) -> Self {
        Self { cipher, config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Serialize, encrypt and checksum a reading.
    ///
    /// A payload longer than 31 bytes yields a frame longer than the
    /// configured frame length; receivers reading fixed windows will then
    /// misalign.
    pub fn encode(&self, reading: &Reading) -> Frame {
        let payload = reading.to_payload();
        let frame = Frame::seal(self.cipher.encrypt(payload.as_bytes()));
        if frame.wire_size() > self.config.frame_len {
            debug!(
                packet_id = reading.packet_id,
                wire_size = frame.wire_size(),
                frame_len = self.config.frame_len,
                "encoded frame exceeds fixed frame length"
            );
        }
        frame
    }

    /// Run the receive-validation pipeline over one read window.
    ///
    /// Stages short-circuit in order: length, checksum, decrypt, token
    /// count, integer conversion.
    pub fn decode(&self, raw: &[u8]) -> Result<Decoded, DecodeError> {
        if raw.len() < self.config.min_frame_len.max(CHECKSUM_LEN) {
            return Err(DecodeError::ShortFrame {
                len: raw.len(),
                min: self.config.min_frame_len,
            });
        }

        let (ciphertext, trailer) = raw.split_at(raw.len() - CHECKSUM_LEN);
        let received = trailer[0];
        let expected = checksum(ciphertext);
        if received != expected {
            return Err(DecodeError::CrcMismatch { received, expected });
        }

        let text = self
            .cipher
            .decrypt_text(ciphertext)
            .map_err(DecodeError::DecryptFailure)?;
        debug!(len = raw.len(), "frame decrypted");

        let reading = Reading::from_payload(&text)?;

        Ok(Decoded {
            sample: TelemetrySample::now(reading),
            integrity_ok: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::cipher::CipherKey;
    use crate::error::CipherError;

    fn codec() -> Codec {
        Codec::new(
            Cipher::new(CipherKey::from_passphrase("cat")),
            FrameConfig::default(),
        )
    }

    /// Frame with a correct checksum over arbitrary ciphertext.
    fn sealed(ciphertext: &[u8]) -> Vec<u8> {
        Frame::seal(ciphertext.to_vec()).to_wire().to_vec()
    }

    #[test]
    fn reference_reading_makes_33_byte_frame() {
        let codec = codec();
        let reading = Reading::new(1000, [25, 1000, 50, 2, 100]);
        assert_eq!(reading.to_payload().len(), 21);

        let frame = codec.encode(&reading);
        assert_eq!(frame.ciphertext.len(), 32);
        assert_eq!(frame.wire_size(), 33);
        assert!(frame.is_intact());

        let wire = frame.to_wire();
        assert_eq!(wire.len(), 33);
        assert_eq!(wire[32], checksum(&wire[..32]));

        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded.sample.reading, reading);
        assert!(decoded.integrity_ok);
    }

    #[test]
    fn unix_seconds_id_fits_two_blocks() {
        let reading = Reading::new(1_747_000_000, [30, 1020, 80, 5, 150]);
        assert_eq!(codec().encode(&reading).wire_size(), DEFAULT_FRAME_LEN);
    }

    #[test]
    fn long_payload_grows_the_frame() {
        let reading = Reading::new(u64::MAX, [i64::MIN, 0, 0, 0, 0]);
        let frame = codec().encode(&reading);
        // 49 bytes of payload pad to four blocks.
        assert_eq!(frame.wire_size(), 65);
        assert_eq!(codec().decode(&frame.to_wire()).unwrap().sample.reading, reading);
    }

    #[test]
    fn short_frame_is_rejected_before_checksum() {
        let codec = codec();
        assert_eq!(
            codec.decode(&[]),
            Err(DecodeError::ShortFrame { len: 0, min: 17 })
        );
        // Sixteen bytes whose last byte happens to be a valid checksum.
        let wire = sealed(&[0u8; 15]);
        assert_eq!(wire.len(), 16);
        assert_eq!(
            codec.decode(&wire),
            Err(DecodeError::ShortFrame { len: 16, min: 17 })
        );
    }

    #[test]
    fn corrupted_checksum_byte_is_crc_mismatch() {
        let codec = codec();
        let mut wire = codec
            .encode(&Reading::new(1000, [25, 1000, 50, 2, 100]))
            .to_wire()
            .to_vec();
        assert_eq!(wire.len(), 33);
        let expected = wire[32];
        wire[32] ^= 0x01;
        assert_eq!(
            codec.decode(&wire),
            Err(DecodeError::CrcMismatch {
                received: expected ^ 0x01,
                expected,
            })
        );
    }

    #[test]
    fn corrupted_ciphertext_is_crc_mismatch() {
        let codec = codec();
        let mut wire = codec
            .encode(&Reading::new(1, [1, 2, 3, 4, 5]))
            .to_wire()
            .to_vec();
        wire[3] ^= 0x80;
        assert!(matches!(
            codec.decode(&wire),
            Err(DecodeError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn truncated_read_is_crc_mismatch_not_decrypt() {
        // A 20-byte read passes the length gate; its last byte is not a
        // checksum of the rest.
        let codec = codec();
        let wire = codec
            .encode(&Reading::new(1000, [25, 1000, 50, 2, 100]))
            .to_wire();
        assert_eq!(wire.len(), 33);
        let mut partial = wire[..20].to_vec();
        partial[19] = checksum(&partial[..19]) ^ 0x01;
        assert!(matches!(
            codec.decode(&partial),
            Err(DecodeError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn non_block_ciphertext_is_decrypt_failure() {
        let wire = sealed(&[0x42; 20]);
        assert_eq!(
            codec().decode(&wire),
            Err(DecodeError::DecryptFailure(CipherError::Length {
                len: 20,
                block: 16
            }))
        );
    }

    #[test]
    fn bad_padding_is_decrypt_failure() {
        // Encrypt 32 bytes of 0x00 without padding: after decryption the last
        // byte is 0x00, which is never valid PKCS#7.
        let cipher = Cipher::default();
        let full = cipher.encrypt(&[0u8; 32]);
        let wire = sealed(&full[..32]);
        assert_eq!(
            codec().decode(&wire),
            Err(DecodeError::DecryptFailure(CipherError::Padding))
        );
    }

    #[test]
    fn wrong_token_count_is_format_error() {
        let cipher = Cipher::default();
        let wire = sealed(&cipher.encrypt(b"1,2,3,4,5"));
        assert_eq!(
            codec().decode(&wire),
            Err(DecodeError::FormatError {
                tokens: 5,
                expected: 6
            })
        );

        let wire = sealed(&cipher.encrypt(b"1,2,3,4,5,6,7"));
        assert!(matches!(
            codec().decode(&wire),
            Err(DecodeError::FormatError { tokens: 7, .. })
        ));
    }

    #[test]
    fn non_integer_token_is_value_error() {
        let cipher = Cipher::default();
        let wire = sealed(&cipher.encrypt(b"1,2,3,four,5,6"));
        assert_eq!(
            codec().decode(&wire),
            Err(DecodeError::ValueError {
                index: 3,
                token: "four".to_string()
            })
        );
    }

    #[test]
    fn wrong_key_never_yields_a_sample() {
        let sender = Codec::new(
            Cipher::new(CipherKey::from_passphrase("cat")),
            FrameConfig::default(),
        );
        let receiver = Codec::new(
            Cipher::new(CipherKey::from_passphrase("dog")),
            FrameConfig::default(),
        );
        let wire = sender
            .encode(&Reading::new(1000, [25, 1000, 50, 2, 100]))
            .to_wire();
        let err = receiver.decode(&wire).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DecryptFailure(_)
                | DecodeError::FormatError { .. }
                | DecodeError::ValueError { .. }
        ));
    }

    #[test]
    fn configurable_minimum_length() {
        let codec = Codec::new(
            Cipher::default(),
            FrameConfig {
                min_frame_len: 33,
                ..FrameConfig::default()
            },
        );
        let wire = sealed(&[0u8; 16]);
        assert_eq!(
            codec.decode(&wire),
            Err(DecodeError::ShortFrame { len: 17, min: 33 })
        );
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            packet_id in any::<u64>(),
            fields in proptest::array::uniform5(any::<i64>()),
        ) {
            let codec = codec();
            let reading = Reading::new(packet_id, fields);
            let decoded = codec.decode(&codec.encode(&reading).to_wire()).unwrap();
            prop_assert_eq!(decoded.sample.reading, reading);
            prop_assert!(decoded.integrity_ok);
        }
    }
}
