//! # Key Codec
//!
//! Transport-safe text encoding for keys and raw buffers.
//!
//! ```text
//! Public key  ──► SPKI DER   ──► base64 ──► directory / QR / copy-paste
//! Private key ──► PKCS#8 DER ──► base64 ──► key vault (optionally sealed)
//! Packet      ──► raw frame  ──► base64 ──► relay
//! ```
//!
//! Everything uses the standard base64 alphabet with padding so that the
//! output is identical to what a browser's `btoa` produces for the same
//! bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use p521::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Encode raw bytes as standard base64.
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64.
///
/// Errors are reported as [`Error::KeyImport`]; packet decoding remaps them.
pub fn decode_bytes(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| Error::KeyImport(format!("Invalid base64: {}", e)))
}

/// Serialize a P-521 public key as base64 SubjectPublicKeyInfo.
pub(crate) fn encode_public_key(key: &p521::PublicKey) -> Result<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| Error::KeyExport(format!("SPKI encoding failed: {}", e)))?;
    Ok(encode_bytes(der.as_bytes()))
}

/// Parse base64 SubjectPublicKeyInfo into a P-521 public key.
///
/// Keys on any other curve are rejected by the SPKI algorithm check.
pub(crate) fn decode_public_key(text: &str) -> Result<p521::PublicKey> {
    let der = decode_bytes(text)?;
    p521::PublicKey::from_public_key_der(&der)
        .map_err(|e| Error::KeyImport(format!("Not a P-521 public key: {}", e)))
}

/// Serialize a P-521 secret scalar as base64 PKCS#8.
pub(crate) fn encode_private_key(key: &p521::SecretKey) -> Result<Zeroizing<String>> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| Error::KeyExport(format!("PKCS#8 encoding failed: {}", e)))?;
    Ok(Zeroizing::new(encode_bytes(der.as_bytes())))
}

/// Parse PKCS#8 DER into a P-521 secret scalar.
pub(crate) fn decode_private_key_der(der: &[u8]) -> Result<p521::SecretKey> {
    p521::SecretKey::from_pkcs8_der(der)
        .map_err(|e| Error::KeyImport(format!("Not a P-521 private key: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_bytes_match_browser_base64() {
        assert_eq!(encode_bytes(b"hello"), "aGVsbG8=");
        assert_eq!(decode_bytes("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_bytes("not*base64!").unwrap_err();
        assert!(matches!(err, Error::KeyImport(_)));
    }

    #[test]
    fn test_public_key_text_is_deterministic() {
        let secret = p521::SecretKey::random(&mut OsRng);
        let public = secret.public_key();

        let first = encode_public_key(&public).unwrap();
        let second = encode_public_key(&public).unwrap();
        assert_eq!(first, second);
        assert_eq!(decode_public_key(&first).unwrap(), public);
    }

    #[test]
    fn test_private_key_text_restores_scalar() {
        let secret = p521::SecretKey::random(&mut OsRng);
        let text = encode_private_key(&secret).unwrap();
        let der = Zeroizing::new(decode_bytes(&text).unwrap());
        let restored = decode_private_key_der(&der).unwrap();

        assert_eq!(restored.public_key(), secret.public_key());
    }

    #[test]
    fn test_private_key_is_not_a_public_key() {
        let secret = p521::SecretKey::random(&mut OsRng);
        let text = encode_private_key(&secret).unwrap();

        assert!(matches!(decode_public_key(&text), Err(Error::KeyImport(_))));
    }
}
