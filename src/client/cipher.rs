use chacha20poly1305::{
    AeadCore, ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length in bytes (256-bit).
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes (96-bit).
pub const NONCE_LEN: usize = 12;
/// Poly1305 tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// Authentication tag mismatch: tampered ciphertext or wrong key/nonce.
    #[error("ciphertext failed authentication")]
    Integrity,

    #[error("invalid exported key: {0}")]
    KeyFormat(String),

    #[error("invalid nonce: expected {NONCE_LEN} bytes, got {0}")]
    NonceFormat(usize),

    #[error("encryption failed")]
    Encrypt,
}

/// A symmetric file key. Zeroed when dropped and never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyHandle([u8; KEY_LEN]);

impl KeyHandle {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn generate() -> Self {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        Self(bytes)
    }
}

impl std::fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyHandle(<redacted>)")
    }
}

/// Output of a single encryption: the ciphertext (tag included), the fresh
/// key it was sealed with and its nonce.
#[derive(Debug)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub key: KeyHandle,
    pub nonce: [u8; NONCE_LEN],
}

/// Device-side authenticated encryption. Never used by the server.
pub struct CipherEngine;

impl CipherEngine {
    /// Encrypt `plaintext` under a freshly generated key and random nonce.
    ///
    /// Every call draws a new key, so a (key, nonce) pair is never reused.
    pub fn encrypt(plaintext: &[u8]) -> Result<Sealed, CryptoError> {
        let key = KeyHandle::generate();
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(nonce.as_slice());

        Ok(Sealed {
            ciphertext,
            key,
            nonce: nonce_bytes,
        })
    }

    /// Decrypt and authenticate. Fails with [`CryptoError::Integrity`] rather
    /// than returning unauthenticated bytes.
    pub fn decrypt(
        ciphertext: &[u8],
        key: &KeyHandle,
        nonce: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::NonceFormat(nonce.len()));
        }
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::Integrity);
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Integrity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for plaintext in [&b""[..], b"x", b"hello zero knowledge", &[0u8; 70_000]] {
            let sealed = CipherEngine::encrypt(plaintext).unwrap();
            assert_eq!(sealed.ciphertext.len(), plaintext.len() + TAG_LEN);
            let opened = CipherEngine::decrypt(&sealed.ciphertext, &sealed.key, &sealed.nonce)
                .unwrap();
            assert_eq!(opened, plaintext);
        }
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let mut sealed = CipherEngine::encrypt(b"do not touch").unwrap();
        sealed.ciphertext[0] ^= 0x01;
        let err = CipherEngine::decrypt(&sealed.ciphertext, &sealed.key, &sealed.nonce)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Integrity));
    }

    #[test]
    fn test_mismatched_nonce_is_rejected() {
        let first = CipherEngine::encrypt(b"first").unwrap();
        let second = CipherEngine::encrypt(b"second").unwrap();
        let err = CipherEngine::decrypt(&first.ciphertext, &first.key, &second.nonce)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Integrity));
    }

    #[test]
    fn test_mismatched_key_is_rejected() {
        let first = CipherEngine::encrypt(b"first").unwrap();
        let second = CipherEngine::encrypt(b"second").unwrap();
        let err = CipherEngine::decrypt(&first.ciphertext, &second.key, &first.nonce)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Integrity));
    }

    #[test]
    fn test_truncated_ciphertext_is_rejected() {
        let sealed = CipherEngine::encrypt(b"short").unwrap();
        let err = CipherEngine::decrypt(&sealed.ciphertext[..4], &sealed.key, &sealed.nonce)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Integrity));
    }

    #[test]
    fn test_bad_nonce_length() {
        let sealed = CipherEngine::encrypt(b"abc").unwrap();
        let err = CipherEngine::decrypt(&sealed.ciphertext, &sealed.key, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, CryptoError::NonceFormat(8)));
    }

    #[test]
    fn test_each_encryption_uses_fresh_key_and_nonce() {
        let a = CipherEngine::encrypt(b"same input").unwrap();
        let b = CipherEngine::encrypt(b"same input").unwrap();
        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let sealed = CipherEngine::encrypt(b"secret").unwrap();
        assert_eq!(format!("{:?}", sealed.key), "KeyHandle(<redacted>)");
    }
}
