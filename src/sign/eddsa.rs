//! EdDSA (Ed25519) signer/verifier, grounded on the teacher's own
//! `Ed25519SigningKey` wrapper.

use ed25519_dalek::{Signer as _, Verifier as _};

use crate::algorithm::EDDSA;
use crate::error::{Error, Result};
use crate::sign::{Signer, Verifier};

/// An Ed25519 signing key. EdDSA signs the full `ToBeSigned` content
/// directly with no pre-hashing (`spec.md` §4.5).
pub struct EddsaSigner(ed25519_dalek::SigningKey);

impl EddsaSigner {
    /// Build a signer from a 32-byte Ed25519 seed.
    ///
    /// # Errors
    /// [`Error::InvalidPrivKey`] if `seed` is not exactly 32 bytes.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| Error::InvalidPrivKey("Ed25519 seed must be 32 bytes".into()))?;
        Ok(Self(ed25519_dalek::SigningKey::from_bytes(&seed)))
    }
}

impl Signer for EddsaSigner {
    fn algorithm(&self) -> i64 {
        EDDSA
    }

    fn sign(&self, _randomness: &mut dyn rand_core::RngCore, content: &[u8]) -> Result<Vec<u8>> {
        Ok(self.0.sign(content).to_bytes().to_vec())
    }
}

/// An Ed25519 public key.
pub struct EddsaVerifier(ed25519_dalek::VerifyingKey);

impl EddsaVerifier {
    /// Build a verifier from a 32-byte Ed25519 public key.
    ///
    /// # Errors
    /// [`Error::InvalidPubKey`] if `x` is not a valid compressed point.
    pub fn from_public(x: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = x
            .try_into()
            .map_err(|_| Error::InvalidPubKey("Ed25519 public key must be 32 bytes".into()))?;
        Ok(Self(
            ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                .map_err(|e| Error::InvalidPubKey(e.to_string()))?,
        ))
    }
}

impl Verifier for EddsaVerifier {
    fn algorithm(&self) -> i64 {
        EDDSA
    }

    fn verify(&self, content: &[u8], signature: &[u8]) -> Result<()> {
        let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| Error::Verification)?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        self.0.verify(content, &signature).map_err(|_| Error::Verification)
    }
}
