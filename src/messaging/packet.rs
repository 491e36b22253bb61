//! # Packet Framing
//!
//! Byte layout of an encrypted message, version 1.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │ offset │ length │ field                                                │
//! ├────────┼────────┼──────────────────────────────────────────────────────┤
//! │      0 │     30 │ AAD  "v=E2E-v1&t=<unix millis>" + 0x00 padding       │
//! │     30 │     16 │ session salt                                         │
//! │     46 │     12 │ AES-GCM nonce                                        │
//! │     58 │    132 │ ECDSA P-521 signature over AAD ‖ ciphertext          │
//! │    190 │   ≥ 16 │ ciphertext ‖ tag                                     │
//! └────────┴────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! Every field but the ciphertext has a fixed width, so parsing never
//! depends on how many digits the timestamp has.

use crate::crypto::{
    decode_bytes, encode_bytes, Nonce, SessionSalt, Signature, NONCE_SIZE, SALT_SIZE,
    SIGNATURE_SIZE, TAG_SIZE,
};
use crate::error::{Error, Result};

/// Version tag written into every new packet
pub const PROTOCOL_VERSION: &str = "E2E-v1";

/// Versions this codec can open
pub const SUPPORTED_VERSIONS: &[&str] = &[PROTOCOL_VERSION];

/// Fixed width of the AAD field
pub const AAD_SIZE: usize = 30;

const SALT_OFFSET: usize = AAD_SIZE;
const NONCE_OFFSET: usize = SALT_OFFSET + SALT_SIZE;
const SIGNATURE_OFFSET: usize = NONCE_OFFSET + NONCE_SIZE;
const CIPHERTEXT_OFFSET: usize = SIGNATURE_OFFSET + SIGNATURE_SIZE;

/// Smallest possible frame: all fixed fields plus an empty ciphertext's tag
pub const MIN_PACKET_SIZE: usize = CIPHERTEXT_OFFSET + TAG_SIZE;

// ============================================================================
// AAD
// ============================================================================

/// Authenticated, unencrypted packet header
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Aad([u8; AAD_SIZE]);

impl Aad {
    /// Build the header for `version` at `timestamp` (unix millis)
    ///
    /// Text longer than [`AAD_SIZE`] is truncated; shorter text is padded
    /// with `0x00`. Negative timestamps are clamped to zero.
    pub fn new(version: &str, timestamp: i64) -> Self {
        let text = format!("v={}&t={}", version, timestamp.max(0));
        let mut bytes = [0u8; AAD_SIZE];
        let len = text.len().min(AAD_SIZE);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(bytes)
    }

    /// Header for the current protocol version, stamped now
    pub fn current() -> Self {
        Self::new(PROTOCOL_VERSION, crate::time::now_timestamp_millis())
    }

    /// Wrap raw header bytes
    pub fn from_bytes(bytes: [u8; AAD_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw header bytes
    pub fn as_bytes(&self) -> &[u8; AAD_SIZE] {
        &self.0
    }

    fn text(&self) -> &[u8] {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(AAD_SIZE);
        &self.0[..end]
    }

    /// The declared version, if it is one this codec understands
    ///
    /// Reads the bytes between `v=` and the first `&`.
    pub fn version(&self) -> Result<&'static str> {
        let text = self.text();
        let declared = text
            .strip_prefix(b"v=")
            .and_then(|rest| rest.iter().position(|b| *b == b'&').map(|end| &rest[..end]))
            .ok_or_else(|| Error::UnsupportedVersion("missing version tag".into()))?;

        SUPPORTED_VERSIONS
            .iter()
            .find(|v| v.as_bytes() == declared)
            .copied()
            .ok_or_else(|| {
                Error::UnsupportedVersion(String::from_utf8_lossy(declared).into_owned())
            })
    }

    /// Creation time in unix millis, if the header carries a readable one
    pub fn timestamp(&self) -> Option<i64> {
        let text = std::str::from_utf8(self.text()).ok()?;
        let (_, millis) = text.split_once("&t=")?;
        millis.parse().ok()
    }
}

impl std::fmt::Debug for Aad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aad({:?})", String::from_utf8_lossy(self.text()))
    }
}

// ============================================================================
// PACKET
// ============================================================================

/// A parsed message frame
///
/// Parsing only checks lengths. The version, signature and tag are checked
/// by [`super::open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePacket {
    /// Authenticated header
    pub aad: Aad,
    /// Salt for the second derivation stage
    pub salt: SessionSalt,
    /// AEAD nonce
    pub nonce: Nonce,
    /// Sender's signature over `aad ‖ ciphertext`
    pub signature: Signature,
    /// AEAD output including the tag
    pub ciphertext: Vec<u8>,
}

impl MessagePacket {
    /// Split a raw frame into its fields
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_PACKET_SIZE {
            return Err(Error::MalformedPacket(format!(
                "frame is {} bytes, minimum is {}",
                bytes.len(),
                MIN_PACKET_SIZE
            )));
        }

        let mut aad = [0u8; AAD_SIZE];
        aad.copy_from_slice(&bytes[..SALT_OFFSET]);

        let salt = SessionSalt::from_slice(&bytes[SALT_OFFSET..NONCE_OFFSET])
            .map_err(|e| Error::MalformedPacket(e.to_string()))?;

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[NONCE_OFFSET..SIGNATURE_OFFSET]);

        let signature = Signature::from_slice(&bytes[SIGNATURE_OFFSET..CIPHERTEXT_OFFSET])?;

        Ok(Self {
            aad: Aad(aad),
            salt,
            nonce: Nonce::from_bytes(nonce),
            signature,
            ciphertext: bytes[CIPHERTEXT_OFFSET..].to_vec(),
        })
    }

    /// Parse the base64 text form
    pub fn decode(text: &str) -> Result<Self> {
        let bytes = decode_bytes(text)
            .map_err(|_| Error::MalformedPacket("packet is not valid base64".into()))?;
        Self::parse(&bytes)
    }

    /// Read just the session salt out of a base64 packet
    ///
    /// The receiver needs it before it can derive the key to open the packet.
    pub fn peek_salt(text: &str) -> Result<SessionSalt> {
        Self::decode(text).map(|packet| packet.salt)
    }

    /// Serialize to the raw frame
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CIPHERTEXT_OFFSET + self.ciphertext.len());
        out.extend_from_slice(self.aad.as_bytes());
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Serialize to base64 for the relay
    pub fn encode(&self) -> String {
        encode_bytes(&self.to_bytes())
    }

    /// Protocol version declared in the header
    pub fn version(&self) -> Result<&'static str> {
        self.aad.version()
    }

    /// Creation time in unix millis (unauthenticated until the packet is opened)
    pub fn created_at(&self) -> Option<i64> {
        self.aad.timestamp()
    }

    /// The bytes covered by the signature
    pub(crate) fn signed_bytes(aad: &Aad, ciphertext: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(AAD_SIZE + ciphertext.len());
        data.extend_from_slice(aad.as_bytes());
        data.extend_from_slice(ciphertext);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> MessagePacket {
        MessagePacket {
            aad: Aad::new(PROTOCOL_VERSION, 1_700_000_000_000),
            salt: SessionSalt::from_bytes([1u8; SALT_SIZE]),
            nonce: Nonce::from_bytes([2u8; NONCE_SIZE]),
            signature: Signature::from_bytes([3u8; SIGNATURE_SIZE]),
            ciphertext: vec![4u8; TAG_SIZE + 5],
        }
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(CIPHERTEXT_OFFSET, 190);
        assert_eq!(MIN_PACKET_SIZE, 206);
    }

    #[test]
    fn test_aad_is_padded() {
        let aad = Aad::new(PROTOCOL_VERSION, 1_700_000_000_000);
        let expected = b"v=E2E-v1&t=1700000000000";

        assert_eq!(&aad.as_bytes()[..expected.len()], expected);
        assert!(aad.as_bytes()[expected.len()..].iter().all(|b| *b == 0));
        assert_eq!(aad.version().unwrap(), PROTOCOL_VERSION);
        assert_eq!(aad.timestamp(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_aad_version_independent_of_timestamp_width() {
        for ts in [0, 7, 1_700_000_000_000, i64::MAX] {
            assert_eq!(Aad::new(PROTOCOL_VERSION, ts).version().unwrap(), PROTOCOL_VERSION);
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let aad = Aad::new("E2E-v9", 1);
        assert!(matches!(aad.version(), Err(Error::UnsupportedVersion(v)) if v == "E2E-v9"));

        let mut raw = [0u8; AAD_SIZE];
        raw[..8].copy_from_slice(b"garbage!");
        assert!(matches!(
            Aad::from_bytes(raw).version(),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_parse_layout() {
        let packet = sample_packet();
        let bytes = packet.to_bytes();

        assert_eq!(&bytes[30..46], &[1u8; 16]);
        assert_eq!(&bytes[46..58], &[2u8; 12]);
        assert_eq!(bytes[58], 3);
        assert_eq!(bytes[190], 4);

        assert_eq!(MessagePacket::parse(&bytes).unwrap(), packet);
        assert_eq!(MessagePacket::peek_salt(&packet.encode()).unwrap(), packet.salt);
    }

    #[test]
    fn test_short_frame_rejected() {
        let bytes = vec![0u8; MIN_PACKET_SIZE - 1];
        assert!(matches!(
            MessagePacket::parse(&bytes),
            Err(Error::MalformedPacket(_))
        ));
        assert!(matches!(
            MessagePacket::decode("aGVsbG8="),
            Err(Error::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            MessagePacket::decode("%%% not base64 %%%"),
            Err(Error::MalformedPacket(_))
        ));
    }
}
