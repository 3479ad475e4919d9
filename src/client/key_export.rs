//! Portable key serialization.
//!
//! Keys travel as a JWK-shaped JSON object so a recipient can import them
//! without negotiating the algorithm out of band. The server stores the
//! string verbatim and never parses it.

use super::cipher::{CryptoError, KEY_LEN, KeyHandle};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// JOSE name for ChaCha20-Poly1305.
pub const KEY_ALGORITHM: &str = "C20P";
const KEY_TYPE: &str = "oct";

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct JsonWebKey {
    kty: String,
    alg: String,
    k: String,
    #[serde(default)]
    key_ops: Vec<String>,
    #[serde(default)]
    ext: bool,
}

/// Serialize a key to its portable form.
pub fn export_key(key: &KeyHandle) -> String {
    let jwk = JsonWebKey {
        kty: KEY_TYPE.to_string(),
        alg: KEY_ALGORITHM.to_string(),
        k: URL_SAFE_NO_PAD.encode(key.as_bytes()),
        key_ops: vec!["encrypt".to_string(), "decrypt".to_string()],
        ext: true,
    };
    // A struct of strings, a vec and a bool always serializes.
    serde_json::to_string(&jwk).unwrap_or_default()
}

/// Parse a portable key. Rejects unknown algorithms and wrong key lengths.
pub fn import_key(exported: &str) -> Result<KeyHandle, CryptoError> {
    let jwk: JsonWebKey = serde_json::from_str(exported)
        .map_err(|_| CryptoError::KeyFormat("not a JSON web key".to_string()))?;

    if jwk.kty != KEY_TYPE {
        return Err(CryptoError::KeyFormat(format!(
            "unsupported key type '{}'",
            jwk.kty
        )));
    }
    if jwk.alg != KEY_ALGORITHM {
        return Err(CryptoError::KeyFormat(format!(
            "unsupported algorithm '{}'",
            jwk.alg
        )));
    }

    let raw = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(jwk.k.as_bytes())
            .map_err(|_| CryptoError::KeyFormat("key material is not base64url".to_string()))?,
    );
    if raw.len() != KEY_LEN {
        return Err(CryptoError::KeyFormat(format!(
            "expected {} key bytes, got {}",
            KEY_LEN,
            raw.len()
        )));
    }

    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&raw);
    Ok(KeyHandle::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cipher::CipherEngine;

    #[test]
    fn test_export_import_round_trip() {
        let sealed = CipherEngine::encrypt(b"payload").unwrap();
        let exported = export_key(&sealed.key);
        let imported = import_key(&exported).unwrap();
        assert_eq!(imported.as_bytes(), sealed.key.as_bytes());

        let opened = CipherEngine::decrypt(&sealed.ciphertext, &imported, &sealed.nonce).unwrap();
        assert_eq!(opened, b"payload");
    }

    #[test]
    fn test_export_is_self_describing() {
        let sealed = CipherEngine::encrypt(b"payload").unwrap();
        let value: serde_json::Value = serde_json::from_str(&export_key(&sealed.key)).unwrap();
        assert_eq!(value["kty"], "oct");
        assert_eq!(value["alg"], KEY_ALGORITHM);
        assert_eq!(value["ext"], true);
    }

    #[test]
    fn test_import_rejects_other_algorithms() {
        let k = URL_SAFE_NO_PAD.encode([7u8; KEY_LEN]);
        let blob = format!(r#"{{"kty":"oct","alg":"A256GCM","k":"{}"}}"#, k);
        assert!(matches!(import_key(&blob), Err(CryptoError::KeyFormat(_))));
    }

    #[test]
    fn test_import_rejects_short_keys() {
        let k = URL_SAFE_NO_PAD.encode([7u8; 16]);
        let blob = format!(r#"{{"kty":"oct","alg":"C20P","k":"{}"}}"#, k);
        assert!(matches!(import_key(&blob), Err(CryptoError::KeyFormat(_))));
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(import_key("not json"), Err(CryptoError::KeyFormat(_))));
    }

    #[test]
    fn test_import_error_does_not_echo_key_material() {
        let blob = r#"{"kty":"oct","alg":"C20P","k":"!!!secret!!!"}"#;
        let err = import_key(blob).err().unwrap();
        assert!(!err.to_string().contains("secret"));
    }
}
