//! # Key Management
//!
//! Generation, import and export of the two long-term key pairs every
//! identity holds.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  AgreementKeyPair (ECDH, P-521)                                 │   │
//! │  │  • Deriving per-message session keys with a peer               │   │
//! │  │  • Public half published as base64 SPKI                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SigningKeyPair (ECDSA, P-521 / SHA-512)                        │   │
//! │  │  • Detached signatures over every outgoing packet              │   │
//! │  │  • Public half published as base64 SPKI                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  IdentityKeyPair = AgreementKeyPair + SigningKeyPair            │   │
//! │  │  PublicKeyBundle = the two public halves (directory entry)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Private halves are neither `Clone` nor printable and are zeroized when
//! dropped. Agreement and signing public keys are distinct types so one can
//! never be passed where the other is expected, even though both travel as
//! P-521 SPKI.

use std::fmt;

use p521::ecdsa::SigningKey;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::codec;
use crate::error::{Error, Result};

/// Size of a P-521 scalar in bytes
pub const SCALAR_SIZE: usize = 66;

/// Number of bytes of the SHA-256 digest shown in a fingerprint
pub const FINGERPRINT_BYTES: usize = 12;

/// Rejection-sampling bound for scalar generation
const MAX_SCALAR_ATTEMPTS: usize = 16;

/// Sample a uniformly random non-zero P-521 scalar.
///
/// The OS RNG is called fallibly so an unavailable randomness source surfaces
/// as [`Error::KeyGeneration`] instead of a panic.
fn random_scalar() -> Result<p521::SecretKey> {
    let mut bytes = Zeroizing::new([0u8; SCALAR_SIZE]);

    for _ in 0..MAX_SCALAR_ATTEMPTS {
        OsRng
            .try_fill_bytes(&mut bytes[..])
            .map_err(|e| Error::KeyGeneration(format!("OS randomness unavailable: {}", e)))?;
        // The group order is just under 2^521
        bytes[0] &= 0x01;

        if let Ok(secret) = p521::SecretKey::from_slice(&bytes[..]) {
            return Ok(secret);
        }
    }

    Err(Error::KeyGeneration(
        "Could not sample a valid P-521 scalar".into(),
    ))
}

/// Render a SHA-256 digest of `spki_der` as `AB:CD:...` (first 12 bytes).
pub fn fingerprint(spki_der: &[u8]) -> String {
    let digest = Sha256::digest(spki_der);
    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

/// Compare a fingerprint against an expected value typed in by a user.
///
/// Separators and letter case are ignored.
pub fn fingerprint_matches(actual: &str, expected: &str) -> bool {
    let normalize = |s: &str| {
        s.chars()
            .filter(|c| !matches!(c, ':' | ' ' | '-'))
            .map(|c| c.to_ascii_uppercase())
            .collect::<String>()
    };
    normalize(actual) == normalize(expected)
}

// ============================================================================
// PUBLIC KEYS
// ============================================================================

/// Public half of an agreement key pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgreementPublicKey(p521::PublicKey);

impl AgreementPublicKey {
    /// Import from base64 SPKI text
    pub fn import(text: &str) -> Result<Self> {
        codec::decode_public_key(text).map(Self)
    }

    /// Export as base64 SPKI text. Deterministic for a given key.
    pub fn export(&self) -> Result<String> {
        codec::encode_public_key(&self.0)
    }

    /// Short colon-delimited hex digest for out-of-band comparison
    pub fn fingerprint(&self) -> Result<String> {
        spki_fingerprint(&self.0)
    }

    pub(crate) fn as_inner(&self) -> &p521::PublicKey {
        &self.0
    }
}

/// Public half of a signing key pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigningPublicKey(p521::PublicKey);

impl SigningPublicKey {
    /// Import from base64 SPKI text
    pub fn import(text: &str) -> Result<Self> {
        codec::decode_public_key(text).map(Self)
    }

    /// Export as base64 SPKI text. Deterministic for a given key.
    pub fn export(&self) -> Result<String> {
        codec::encode_public_key(&self.0)
    }

    /// Short colon-delimited hex digest for out-of-band comparison
    pub fn fingerprint(&self) -> Result<String> {
        spki_fingerprint(&self.0)
    }

    pub(crate) fn as_inner(&self) -> &p521::PublicKey {
        &self.0
    }
}

fn spki_fingerprint(key: &p521::PublicKey) -> Result<String> {
    use p521::pkcs8::EncodePublicKey;

    let der = key
        .to_public_key_der()
        .map_err(|e| Error::KeyExport(format!("SPKI encoding failed: {}", e)))?;
    Ok(fingerprint(der.as_bytes()))
}

macro_rules! spki_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let text = self.export().map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&text)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let text = String::deserialize(deserializer)?;
                Self::import(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

spki_serde!(AgreementPublicKey);
spki_serde!(SigningPublicKey);

/// The externally published projection of an [`IdentityKeyPair`]
///
/// Serializes as `{"encryption": "<base64 SPKI>", "signing": "<base64 SPKI>"}`;
/// `"agreement"` is accepted in place of `"encryption"` when reading.
/// Deserializing validates both keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyBundle {
    /// Key agreement public key
    #[serde(rename = "encryption", alias = "agreement")]
    pub agreement: AgreementPublicKey,
    /// Signature verification key
    pub signing: SigningPublicKey,
}

impl PublicKeyBundle {
    /// Import both halves from their text encodings
    pub fn import(agreement: &str, signing: &str) -> Result<Self> {
        Ok(Self {
            agreement: AgreementPublicKey::import(agreement)?,
            signing: SigningPublicKey::import(signing)?,
        })
    }
}

// ============================================================================
// KEY PAIRS
// ============================================================================

/// ECDH key pair on P-521
pub struct AgreementKeyPair {
    secret: p521::SecretKey,
    public: AgreementPublicKey,
}

impl AgreementKeyPair {
    /// Generate a new random agreement key pair
    pub fn generate() -> Result<Self> {
        Ok(Self::from_secret(random_scalar()?))
    }

    fn from_secret(secret: p521::SecretKey) -> Self {
        let public = AgreementPublicKey(secret.public_key());
        Self { secret, public }
    }

    /// The shareable public half
    pub fn public_key(&self) -> AgreementPublicKey {
        self.public
    }

    /// Raw ECDH with a peer's public key
    ///
    /// Both sides compute the same value:
    /// `alice_secret × bob_public == bob_secret × alice_public`.
    pub(crate) fn diffie_hellman(&self, their_public: &AgreementPublicKey) -> p521::ecdh::SharedSecret {
        p521::elliptic_curve::ecdh::diffie_hellman(
            self.secret.to_nonzero_scalar(),
            their_public.as_inner().as_affine(),
        )
    }

    /// Base64 PKCS#8 of the private key, for the vault only.
    pub(crate) fn export_private(&self) -> Result<Zeroizing<String>> {
        codec::encode_private_key(&self.secret)
    }

    /// Restore from PKCS#8 DER
    pub(crate) fn import_private_der(der: &[u8]) -> Result<Self> {
        codec::decode_private_key_der(der).map(Self::from_secret)
    }
}

impl fmt::Debug for AgreementKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgreementKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// ECDSA key pair on P-521 (SHA-512)
pub struct SigningKeyPair {
    secret: p521::SecretKey,
    signer: SigningKey,
    public: SigningPublicKey,
}

impl SigningKeyPair {
    /// Generate a new random signing key pair
    pub fn generate() -> Result<Self> {
        Self::from_secret(random_scalar()?)
            .map_err(|e| Error::KeyGeneration(format!("Signing key setup failed: {}", e)))
    }

    fn from_secret(secret: p521::SecretKey) -> Result<Self> {
        let scalar = Zeroizing::new(secret.to_bytes());
        let signer = SigningKey::from_bytes(&scalar)
            .map_err(|e| Error::KeyImport(format!("Invalid ECDSA scalar: {}", e)))?;
        let public = SigningPublicKey(secret.public_key());
        Ok(Self {
            secret,
            signer,
            public,
        })
    }

    /// The shareable verification key
    pub fn public_key(&self) -> SigningPublicKey {
        self.public
    }

    pub(crate) fn signer(&self) -> &SigningKey {
        &self.signer
    }

    /// Base64 PKCS#8 of the private key, for the vault only.
    pub(crate) fn export_private(&self) -> Result<Zeroizing<String>> {
        codec::encode_private_key(&self.secret)
    }

    /// Restore from PKCS#8 DER
    pub(crate) fn import_private_der(der: &[u8]) -> Result<Self> {
        Self::from_secret(codec::decode_private_key_der(der)?)
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Both long-term key pairs of one identity
///
/// Owned exclusively by the local device. Dropping it wipes both private
/// scalars.
#[derive(Debug)]
pub struct IdentityKeyPair {
    /// Key agreement pair
    pub agreement: AgreementKeyPair,
    /// Signing pair
    pub signing: SigningKeyPair,
}

impl IdentityKeyPair {
    /// Generate both pairs concurrently on the blocking pool
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn generate() -> Result<Self> {
        let (agreement, signing) = tokio::try_join!(
            generate_off_thread("agreement", AgreementKeyPair::generate),
            generate_off_thread("signing", SigningKeyPair::generate),
        )?;

        tracing::debug!("Generated P-521 agreement and signing key pairs");
        Ok(Self { agreement, signing })
    }

    /// Generate both pairs (single-threaded targets)
    #[cfg(target_arch = "wasm32")]
    pub async fn generate() -> Result<Self> {
        Self::generate_blocking()
    }

    /// Generate both pairs on the calling thread
    pub fn generate_blocking() -> Result<Self> {
        Ok(Self {
            agreement: AgreementKeyPair::generate()?,
            signing: SigningKeyPair::generate()?,
        })
    }

    /// The public projection to publish in the directory
    pub fn public_bundle(&self) -> PublicKeyBundle {
        PublicKeyBundle {
            agreement: self.agreement.public_key(),
            signing: self.signing.public_key(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn generate_off_thread<T, F>(label: &'static str, generate: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(generate)
        .await
        .map_err(|e| Error::KeyGeneration(format!("{} key generation aborted: {}", label, e)))?
}

// ============================================================================
// TESTS
// ============================================================================
