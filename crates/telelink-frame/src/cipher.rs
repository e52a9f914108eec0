//! AES-128/ECB with PKCS#7 padding under a passphrase-derived key.
//!
//! This is the cipher the deployed endpoints speak. ECB leaks equal
//! plaintext blocks and the key derivation is a plain pad-and-truncate of
//! the passphrase; both are kept for wire compatibility.

use aes::Aes128;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::generic_array::GenericArray;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};

use crate::error::CipherError;

/// Cipher block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Key length in bytes.
pub const KEY_LEN: usize = 16;

/// Passphrase shared by the deployed endpoints.
pub const DEFAULT_PASSPHRASE: &str = "cat";

const KEY_FILLER: u8 = b' ';

/// A 16-byte key derived from a passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    /// Right-pad the passphrase bytes with spaces to 16 bytes, then truncate
    /// to 16 bytes.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = [KEY_FILLER; KEY_LEN];
        let bytes = passphrase.as_bytes();
        let n = bytes.len().min(KEY_LEN);
        key[..n].copy_from_slice(&bytes[..n]);
        Self(key)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Default for CipherKey {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_PASSPHRASE)
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// Block cipher adapter owning the process-wide key.
#[derive(Debug, Clone)]
pub struct Cipher {
    key: CipherKey,
}

impl Cipher {
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }

    /// Pad `plaintext` to a whole number of blocks and encrypt each block
    /// independently.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let key = GenericArray::from(*self.key.as_bytes());
        ecb::Encryptor::<Aes128>::new(&key).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypt `ciphertext` and strip its padding.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::Length {
                len: ciphertext.len(),
                block: BLOCK_SIZE,
            });
        }
        let key = GenericArray::from(*self.key.as_bytes());
        ecb::Decryptor::<Aes128>::new(&key)
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::Padding)
    }

    /// Decrypt `ciphertext` into text.
    pub fn decrypt_text(&self, ciphertext: &[u8]) -> Result<String, CipherError> {
        let plaintext = self.decrypt(ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }
}

impl Default for Cipher {
    fn default() -> Self {
        Self::new(CipherKey::default())
    }
}
