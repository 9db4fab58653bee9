//! RSASSA-PSS signer/verifier (`spec.md` §4.5, "RSA-PSS"). RSA has no place
//! in the `spec.md` §3 key model (EC2/OKP/Symmetric only), so these adapters
//! are built directly from PKCS#1 DER key material rather than from a
//! [`crate::key::Key`].

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pss::{SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier as _};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithm::{PS256, PS384, PS512};
use crate::error::{Error, Result};
use crate::sign::{RngAdapter, Signer, Verifier};

/// The minimum RSA modulus size this crate accepts, per `spec.md` §4.5.
const MIN_KEY_BITS: usize = 2048;

/// An RSA-PSS signing key, one of PS256/PS384/PS512. Salt length equals the
/// hash's output length (RFC 8230).
pub enum RsaPssSigner {
    /// PS256 (SHA-256).
    Ps256(SigningKey<Sha256>),
    /// PS384 (SHA-384).
    Ps384(SigningKey<Sha384>),
    /// PS512 (SHA-512).
    Ps512(SigningKey<Sha512>),
}

impl RsaPssSigner {
    /// Build a signer from a PKCS#1 DER-encoded RSA private key.
    ///
    /// # Errors
    /// [`Error::InvalidPrivKey`] if the DER is malformed or the modulus is
    /// smaller than 2048 bits.
    pub fn from_pkcs1_der(der: &[u8], algorithm: i64) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| Error::InvalidPrivKey(e.to_string()))?;
        if key.size() * 8 < MIN_KEY_BITS {
            return Err(Error::InvalidPrivKey(format!(
                "RSA key smaller than {MIN_KEY_BITS} bits"
            )));
        }
        match algorithm {
            PS256 => Ok(Self::Ps256(SigningKey::new(key))),
            PS384 => Ok(Self::Ps384(SigningKey::new(key))),
            PS512 => Ok(Self::Ps512(SigningKey::new(key))),
            other => Err(Error::AlgorithmNotSupported(
                other.to_string(),
                "not an RSA-PSS algorithm".into(),
            )),
        }
    }
}

impl Signer for RsaPssSigner {
    fn algorithm(&self) -> i64 {
        match self {
            Self::Ps256(_) => PS256,
            Self::Ps384(_) => PS384,
            Self::Ps512(_) => PS512,
        }
    }

    fn sign(&self, randomness: &mut dyn rand_core::RngCore, content: &[u8]) -> Result<Vec<u8>> {
        let mut rng = RngAdapter(randomness);
        let bytes = match self {
            Self::Ps256(key) => key
                .try_sign_with_rng(&mut rng, content)
                .map_err(|e| Error::Malformed(format!("RSA-PSS signing error: {e}")))?
                .to_vec(),
            Self::Ps384(key) => key
                .try_sign_with_rng(&mut rng, content)
                .map_err(|e| Error::Malformed(format!("RSA-PSS signing error: {e}")))?
                .to_vec(),
            Self::Ps512(key) => key
                .try_sign_with_rng(&mut rng, content)
                .map_err(|e| Error::Malformed(format!("RSA-PSS signing error: {e}")))?
                .to_vec(),
        };
        Ok(bytes)
    }
}

/// An RSA-PSS public key.
pub enum RsaPssVerifier {
    /// PS256 (SHA-256).
    Ps256(VerifyingKey<Sha256>),
    /// PS384 (SHA-384).
    Ps384(VerifyingKey<Sha384>),
    /// PS512 (SHA-512).
    Ps512(VerifyingKey<Sha512>),
}

impl RsaPssVerifier {
    /// Build a verifier from a PKCS#1 DER-encoded RSA public key.
    ///
    /// # Errors
    /// [`Error::InvalidPubKey`] if the DER is malformed or the modulus is
    /// smaller than 2048 bits.
    pub fn from_pkcs1_der(der: &[u8], algorithm: i64) -> Result<Self> {
        let key = RsaPublicKey::from_pkcs1_der(der)
            .map_err(|e| Error::InvalidPubKey(e.to_string()))?;
        if key.size() * 8 < MIN_KEY_BITS {
            return Err(Error::InvalidPubKey(format!(
                "RSA key smaller than {MIN_KEY_BITS} bits"
            )));
        }
        match algorithm {
            PS256 => Ok(Self::Ps256(VerifyingKey::new(key))),
            PS384 => Ok(Self::Ps384(VerifyingKey::new(key))),
            PS512 => Ok(Self::Ps512(VerifyingKey::new(key))),
            other => Err(Error::AlgorithmNotSupported(
                other.to_string(),
                "not an RSA-PSS algorithm".into(),
            )),
        }
    }
}

impl Verifier for RsaPssVerifier {
    fn algorithm(&self) -> i64 {
        match self {
            Self::Ps256(_) => PS256,
            Self::Ps384(_) => PS384,
            Self::Ps512(_) => PS512,
        }
    }

    fn verify(&self, content: &[u8], signature: &[u8]) -> Result<()> {
        let Ok(signature) = signature.try_into() else {
            return Err(Error::Verification);
        };
        let verified = match self {
            Self::Ps256(key) => key.verify(content, &signature).is_ok(),
            Self::Ps384(key) => key.verify(content, &signature).is_ok(),
            Self::Ps512(key) => key.verify(content, &signature).is_ok(),
        };
        if verified {
            Ok(())
        } else {
            Err(Error::Verification)
        }
    }
}

#[cfg(test)]
mod tests {
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};

    use super::*;

    fn key_pair_der() -> (Vec<u8>, Vec<u8>) {
        let mut rng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut rng, MIN_KEY_BITS).unwrap();
        let public = RsaPublicKey::from(&private);
        (
            private.to_pkcs1_der().unwrap().as_bytes().to_vec(),
            public.to_pkcs1_der().unwrap().as_bytes().to_vec(),
        )
    }

    #[test]
    fn ps256_round_trip() {
        let (priv_der, pub_der) = key_pair_der();
        let signer = RsaPssSigner::from_pkcs1_der(&priv_der, PS256).unwrap();
        let verifier = RsaPssVerifier::from_pkcs1_der(&pub_der, PS256).unwrap();
        let mut rng = rand::rngs::OsRng;
        let sig = signer.sign(&mut rng, b"hello").unwrap();
        verifier.verify(b"hello", &sig).unwrap();
    }

    #[test]
    fn undersized_key_is_rejected() {
        let mut rng = rand::rngs::OsRng;
        let small = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let der = small.to_pkcs1_der().unwrap().as_bytes().to_vec();
        assert!(RsaPssSigner::from_pkcs1_der(&der, PS256).is_err());
    }
}
