//! # Ed25519 Signatures
//!
//! Node keys sign block headers; account keys sign transactions.
//!
//! ## Security Properties
//!
//! - No RNG dependency (deterministic nonce from message)
//! - Secret seed is zeroized when the key pair is dropped

use crate::hashing::sha256;
use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        // Validate it's a valid point
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a slice of any length, rejecting anything but 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Self::from_bytes(arr)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat(signature.len()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::IncorrectSign)
    }
}

/// Ed25519 keypair.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Parse the hex seed format used by the `PrivateKey` file.
    ///
    /// Surrounding whitespace is ignored.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let mut raw =
            hex::decode(text.trim()).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let result = match <[u8; 32]>::try_from(raw.as_slice()) {
            Ok(seed) => Ok(Self::from_seed(seed)),
            Err(_) => Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: raw.len(),
            }),
        };
        raw.zeroize();
        result
    }

    /// Hex seed, the inverse of [`Ed25519KeyPair::from_hex`].
    pub fn to_hex(&self) -> String {
        let mut seed = self.to_seed();
        let text = hex::encode(seed);
        seed.zeroize();
        text
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        Ed25519PublicKey(verifying_key.to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// Verify `signature` over `message` with a raw public key.
pub fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    Ed25519PublicKey::from_slice(public_key)?.verify(message, signature)
}

/// Account id derived from a public key: the first eight bytes of its SHA-256,
/// read big-endian as a signed integer.
pub fn key_id_from_public(public_key: &[u8]) -> i64 {
    let digest = sha256(public_key);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Ed25519KeyPair::generate();
        let message = b"0,2,abcd,1700000000,1,42,0,ffff,00";

        let signature = keypair.sign(message);
        let result = keypair.public_key().verify(message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_message_reports_incorrect_sign() {
        let keypair = Ed25519KeyPair::generate();

        let signature = keypair.sign(b"message1");
        let result = keypair.public_key().verify(b"message2", &signature);

        assert_eq!(result, Err(CryptoError::IncorrectSign));
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = Ed25519KeyPair::generate();
        let keypair2 = Ed25519KeyPair::generate();

        let signature = keypair1.sign(b"test");
        let result = verify_signature(keypair2.public_key().as_bytes(), b"test", &signature);

        assert_eq!(result, Err(CryptoError::IncorrectSign));
    }

    #[test]
    fn test_short_signature_rejected() {
        let keypair = Ed25519KeyPair::generate();
        let result = keypair.public_key().verify(b"test", &[0u8; 10]);
        assert_eq!(result, Err(CryptoError::InvalidSignatureFormat(10)));
    }

    #[test]
    fn test_hex_roundtrip_with_whitespace() {
        let original = Ed25519KeyPair::generate();
        let text = format!("  {}\n", original.to_hex());
        let restored = Ed25519KeyPair::from_hex(&text).unwrap();
        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_hex_wrong_length() {
        let err = Ed25519KeyPair::from_hex("abcd").unwrap_err();
        assert_eq!(err, CryptoError::InvalidKeyLength { expected: 32, actual: 2 });
    }

    #[test]
    fn test_hex_not_hex() {
        assert!(matches!(
            Ed25519KeyPair::from_hex("zz"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_key_id_is_stable(seed in any::<[u8; 32]>()) {
            let pk = Ed25519KeyPair::from_seed(seed).public_key();
            prop_assert_eq!(key_id_from_public(pk.as_bytes()), key_id_from_public(pk.as_bytes()));
        }
    }
}
