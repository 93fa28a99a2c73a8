//! Server key material and device key parsing.
//!
//! Outbound payloads are signed with the server's RSA key (PKCS#1 v1.5 over
//! a SHA-256 prehash) so firmware can verify commands end-to-end. Devices
//! present their own RSA public key — hex-encoded SPKI — as a shared secret
//! during preregistration and handshake.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::path::Path;
use tracing::{info, warn};

use lumen_registry::MIN_SHARED_SECRET_LEN;

use crate::error::DeviceError;

/// Bit size of generated server keys.
const SERVER_KEY_BITS: usize = 2048;

/// Produces the authentication digest over a payload hash.
///
/// Injected into connections at construction; the processor never touches
/// key material directly.
pub trait Signer: Send + Sync {
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, DeviceError>;
}

/// [`Signer`] backed by the server's RSA private key.
pub struct KeySigner {
    key: RsaPrivateKey,
}

impl KeySigner {
    /// Load the server key from a PKCS#8 PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let key = RsaPrivateKey::read_pkcs8_pem_file(path.as_ref())
            .map_err(|e| DeviceError::InvalidKey(e.to_string()))?;
        info!("loaded server signing key from {}", path.as_ref().display());
        Ok(Self { key })
    }

    /// Generate a fresh server key. Signatures will not survive a restart,
    /// which is acceptable for development setups without provisioned keys.
    pub fn generate() -> Result<Self, DeviceError> {
        warn!("no signing key configured, generating an ephemeral one");
        let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, SERVER_KEY_BITS)
            .map_err(|e| DeviceError::SigningFailed(e.to_string()))?;
        Ok(Self { key })
    }

    /// The verification half of the server key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }
}

impl Signer for KeySigner {
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, DeviceError> {
        self.key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            .map_err(|e| DeviceError::SigningFailed(e.to_string()))
    }
}

/// Parse a device shared secret: hex-encoded SPKI bytes carrying an RSA
/// public key.
pub fn parse_device_key(encoded: &str) -> Result<RsaPublicKey, DeviceError> {
    let bytes = hex::decode(encoded).map_err(|e| DeviceError::InvalidKey(e.to_string()))?;

    if bytes.len() < MIN_SHARED_SECRET_LEN {
        return Err(DeviceError::InvalidKey(format!(
            "decoded key too short ({} bytes)",
            bytes.len()
        )));
    }

    RsaPublicKey::from_public_key_der(&bytes).map_err(|e| DeviceError::InvalidKey(e.to_string()))
}

/// Verify a digest signature against a device or server public key.
pub fn verify_digest(
    public_key: &RsaPublicKey,
    digest: &[u8],
    signature: &[u8],
) -> Result<(), DeviceError> {
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
        .map_err(|e| DeviceError::SigningFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use rsa::pkcs8::EncodePublicKey;
    use sha2::Digest;

    use super::*;

    #[test]
    fn signatures_verify_against_the_public_key() {
        let signer = KeySigner::generate().unwrap();
        let digest = Sha256::digest(b"payload");

        let signature = signer.sign(&digest).unwrap();
        verify_digest(&signer.public_key(), &digest, &signature).unwrap();

        let wrong = Sha256::digest(b"other payload");
        assert!(verify_digest(&signer.public_key(), &wrong, &signature).is_err());
    }

    #[test]
    fn parse_device_key_accepts_hex_spki() {
        let signer = KeySigner::generate().unwrap();
        let der = signer.public_key().to_public_key_der().unwrap();
        let encoded = hex::encode(der.as_bytes());

        let parsed = parse_device_key(&encoded).unwrap();
        assert_eq!(parsed, signer.public_key());
    }

    #[test]
    fn parse_device_key_rejects_garbage() {
        assert!(matches!(
            parse_device_key("not hex"),
            Err(DeviceError::InvalidKey(_))
        ));
        assert!(matches!(
            parse_device_key("abcd"),
            Err(DeviceError::InvalidKey(_))
        ));
        // Valid hex, but not an SPKI document.
        let bogus = hex::encode([7u8; 64]);
        assert!(matches!(
            parse_device_key(&bogus),
            Err(DeviceError::InvalidKey(_))
        ));
    }
}
