//! ECDSA signer/verifier adapters over the `p256`/`p384`/`p521` crates
//! (`spec.md` §4.5, "ECDSA signature encoding").

use ecdsa::signature::{RandomizedSigner, Verifier as _};

use crate::algorithm::{ES256, ES384, ES512};
use crate::error::{Error, Result};
use crate::key::curve::Curve;
use crate::sign::{RngAdapter, Signer, Verifier};

/// An ECDSA signing key over one of the three NIST curves this crate
/// supports.
pub enum EcdsaSigner {
    /// ES256 over P-256.
    P256(p256::ecdsa::SigningKey),
    /// ES384 over P-384.
    P384(p384::ecdsa::SigningKey),
    /// ES512 over P-521.
    P521(p521::ecdsa::SigningKey),
}

impl EcdsaSigner {
    /// Build a signer from a raw private scalar `d` and its curve.
    ///
    /// # Errors
    /// [`Error::InvalidPrivKey`] if `d` is not a valid scalar for the curve.
    pub fn from_scalar(curve: Curve, d: &[u8]) -> Result<Self> {
        match curve {
            Curve::P256 => Ok(Self::P256(
                p256::ecdsa::SigningKey::from_slice(d)
                    .map_err(|e| Error::InvalidPrivKey(e.to_string()))?,
            )),
            Curve::P384 => Ok(Self::P384(
                p384::ecdsa::SigningKey::from_slice(d)
                    .map_err(|e| Error::InvalidPrivKey(e.to_string()))?,
            )),
            Curve::P521 => Ok(Self::P521(
                p521::ecdsa::SigningKey::from_slice(d)
                    .map_err(|e| Error::InvalidPrivKey(e.to_string()))?,
            )),
            other => Err(Error::InvalidKey(format!(
                "{other:?} is not a valid ECDSA curve"
            ))),
        }
    }
}

impl Signer for EcdsaSigner {
    fn algorithm(&self) -> i64 {
        match self {
            Self::P256(_) => ES256,
            Self::P384(_) => ES384,
            Self::P521(_) => ES512,
        }
    }

    fn sign(&self, randomness: &mut dyn rand_core::RngCore, content: &[u8]) -> Result<Vec<u8>> {
        let mut rng = RngAdapter(randomness);
        let bytes = match self {
            Self::P256(key) => {
                let sig: p256::ecdsa::Signature = key.try_sign_with_rng(&mut rng, content)?;
                sig.to_vec()
            },
            Self::P384(key) => {
                let sig: p384::ecdsa::Signature = key.try_sign_with_rng(&mut rng, content)?;
                sig.to_vec()
            },
            Self::P521(key) => {
                let sig: p521::ecdsa::Signature = key.try_sign_with_rng(&mut rng, content)?;
                sig.to_vec()
            },
        };
        Ok(bytes)
    }
}

impl From<ecdsa::Error> for Error {
    fn from(e: ecdsa::Error) -> Self {
        Self::Malformed(format!("ECDSA signing error: {e}"))
    }
}

/// An ECDSA public key over one of the three NIST curves this crate
/// supports.
pub enum EcdsaVerifier {
    /// ES256 over P-256.
    P256(p256::ecdsa::VerifyingKey),
    /// ES384 over P-384.
    P384(p384::ecdsa::VerifyingKey),
    /// ES512 over P-521.
    P521(p521::ecdsa::VerifyingKey),
}

impl EcdsaVerifier {
    /// Build a verifier from raw uncompressed coordinates `x`/`y` and the
    /// curve.
    ///
    /// # Errors
    /// [`Error::InvalidPubKey`] if the coordinates do not form a valid
    /// point on the curve.
    pub fn from_coordinates(curve: Curve, x: &[u8], y: &[u8]) -> Result<Self> {
        match curve {
            Curve::P256 => {
                let point = p256::EncodedPoint::from_affine_coordinates(
                    x.into(),
                    y.into(),
                    false,
                );
                Ok(Self::P256(
                    p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                        .map_err(|e| Error::InvalidPubKey(e.to_string()))?,
                ))
            },
            Curve::P384 => {
                let point = p384::EncodedPoint::from_affine_coordinates(
                    x.into(),
                    y.into(),
                    false,
                );
                Ok(Self::P384(
                    p384::ecdsa::VerifyingKey::from_encoded_point(&point)
                        .map_err(|e| Error::InvalidPubKey(e.to_string()))?,
                ))
            },
            Curve::P521 => {
                let point = p521::EncodedPoint::from_affine_coordinates(
                    x.into(),
                    y.into(),
                    false,
                );
                Ok(Self::P521(
                    p521::ecdsa::VerifyingKey::from_encoded_point(&point)
                        .map_err(|e| Error::InvalidPubKey(e.to_string()))?,
                ))
            },
            other => Err(Error::InvalidKey(format!(
                "{other:?} is not a valid ECDSA curve"
            ))),
        }
    }

    fn curve(&self) -> Curve {
        match self {
            Self::P256(_) => Curve::P256,
            Self::P384(_) => Curve::P384,
            Self::P521(_) => Curve::P521,
        }
    }
}

impl Verifier for EcdsaVerifier {
    fn algorithm(&self) -> i64 {
        match self {
            Self::P256(_) => ES256,
            Self::P384(_) => ES384,
            Self::P521(_) => ES512,
        }
    }

    fn verify(&self, content: &[u8], signature: &[u8]) -> Result<()> {
        let expected_len = 2 * self.curve().coordinate_size();
        if signature.len() != expected_len {
            return Err(Error::Verification);
        }
        let verified = match self {
            Self::P256(key) => p256::ecdsa::Signature::from_slice(signature)
                .ok()
                .and_then(|sig| key.verify(content, &sig).ok()),
            Self::P384(key) => p384::ecdsa::Signature::from_slice(signature)
                .ok()
                .and_then(|sig| key.verify(content, &sig).ok()),
            Self::P521(key) => p521::ecdsa::Signature::from_slice(signature)
                .ok()
                .and_then(|sig| key.verify(content, &sig).ok()),
        };
        verified.ok_or(Error::Verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p256_pair() -> (EcdsaSigner, EcdsaVerifier) {
        let scalar = [9u8; 32];
        let key = p256::ecdsa::SigningKey::from_slice(&scalar).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let verifier = EcdsaVerifier::from_coordinates(
            Curve::P256,
            point.x().unwrap(),
            point.y().unwrap(),
        )
        .unwrap();
        let signer = EcdsaSigner::from_scalar(Curve::P256, &scalar).unwrap();
        (signer, verifier)
    }

    #[test]
    fn p256_round_trip() {
        let (signer, verifier) = p256_pair();
        let mut rng = rand::rngs::OsRng;
        let sig = signer.sign(&mut rng, b"hello").unwrap();
        assert_eq!(sig.len(), 64);
        verifier.verify(b"hello", &sig).unwrap();
    }

    #[test]
    fn scenario_s9_wrong_signature_length_is_rejected() {
        let (_, verifier) = p256_pair();
        let too_short = vec![0u8; 63];
        assert!(matches!(
            verifier.verify(b"hello", &too_short),
            Err(Error::Verification)
        ));
        let too_long = vec![0u8; 65];
        assert!(matches!(
            verifier.verify(b"hello", &too_long),
            Err(Error::Verification)
        ));
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let (signer, verifier) = p256_pair();
        let mut rng = rand::rngs::OsRng;
        let mut sig = signer.sign(&mut rng, b"hello").unwrap();
        if let Some(last) = sig.last_mut() {
            *last ^= 0xFF;
        }
        assert!(matches!(
            verifier.verify(b"hello", &sig),
            Err(Error::Verification)
        ));
    }

    #[test]
    fn unsupported_curve_is_rejected() {
        assert!(EcdsaSigner::from_scalar(Curve::Ed25519, &[0u8; 32]).is_err());
    }
}
