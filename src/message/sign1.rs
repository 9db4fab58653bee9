//! `COSE_Sign1` / untagged `Sign1` message (`spec.md` §3, §4.6).

use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::label::Label;
use crate::message::sig_structure::{self, Context};
use crate::sign::{Signer, Verifier};

const TAG: u64 = 18;

/// A `COSE_Sign1` message: `Headers` plus an optional payload and a single
/// signature.
#[derive(Debug, Clone, Default)]
pub struct Sign1Message {
    /// The protected/unprotected header bundle.
    pub headers: Headers,
    /// The payload, or `None` for a detached payload.
    pub payload: Option<Vec<u8>>,
    /// The signature bytes. Empty until [`Sign1Message::sign`] succeeds.
    pub signature: Vec<u8>,
}

impl Sign1Message {
    /// Construct a fresh, unsigned message.
    #[must_use]
    pub fn new(headers: Headers, payload: Option<Vec<u8>>) -> Self {
        Self {
            headers,
            payload,
            signature: Vec::new(),
        }
    }

    /// Sign this message in place (`spec.md` §4.6, "Signing (Sign1)").
    ///
    /// `external_aad` is `&[]` if the caller has none. Fails without
    /// mutating `self` if `self.signature` is already non-empty (at-most-
    /// once signing), if the payload is `None` (detached payloads require
    /// an explicit out-of-band signing path this core does not provide), or
    /// if the declared `alg` disagrees with `signer.algorithm()`.
    ///
    /// # Errors
    /// See above; also propagates [`Signer::sign`] and CBOR encode errors.
    pub fn sign(
        &mut self,
        signer: &dyn Signer,
        randomness: &mut dyn rand_core::RngCore,
        external_aad: &[u8],
    ) -> Result<()> {
        if !self.signature.is_empty() {
            return Err(Error::malformed("Sign1Message is already signed"));
        }
        let Some(payload) = &self.payload else {
            return Err(Error::malformed("missing payload"));
        };

        match self.headers.alg() {
            Ok(declared) if declared != signer.algorithm() => {
                return Err(Error::AlgorithmMismatch(
                    crate::algorithm::name(declared),
                    crate::algorithm::name(signer.algorithm()),
                ));
            },
            Ok(_) => {},
            Err(Error::AlgorithmNotFound) => self.headers.set_alg(signer.algorithm()),
            Err(e) => return Err(e),
        }

        self.headers.validate()?;
        let protected_bstr = self.headers.encode_protected_bstr()?;
        let tbs = sig_structure::build(
            Context::Signature1,
            &protected_bstr,
            None,
            external_aad,
            payload,
            &[],
        )?;
        let signature = signer.sign(randomness, &tbs)?;
        self.headers.raw_protected = Some(protected_bstr);
        self.signature = signature;
        Ok(())
    }

    /// Verify this message (`spec.md` §4.6, "Verifying (Sign1)").
    ///
    /// # Errors
    /// [`Error::Verification`] on failure; [`Error::malformed`] variants for
    /// shape/critical-header problems detected before the crypto check
    /// runs.
    pub fn verify(
        &self,
        verifier: &dyn Verifier,
        external_aad: &[u8],
        known_extensions: &[Label],
    ) -> Result<()> {
        if self.signature.is_empty() {
            tracing::debug!("rejecting Sign1Message verify: no signature present");
            return Err(Error::Verification);
        }
        if let Ok(declared) = self.headers.alg() {
            if declared != verifier.algorithm() {
                tracing::debug!(
                    declared = declared,
                    expected = verifier.algorithm(),
                    "rejecting Sign1Message verify: alg mismatch"
                );
                return Err(Error::Verification);
            }
        }
        self.headers.check_critical(known_extensions)?;

        let protected_bstr = match &self.headers.raw_protected {
            Some(p) => p.clone(),
            None => self.headers.encode_protected_bstr()?,
        };
        let payload = self.payload.as_deref().ok_or(Error::Verification)?;
        let tbs = sig_structure::build(
            Context::Signature1,
            &protected_bstr,
            None,
            external_aad,
            payload,
            &[],
        )?;
        verifier.verify(&tbs, &self.signature)
    }

    /// Encode as a tag-18-wrapped 4-element array.
    ///
    /// # Errors
    /// [`Error::NoSignatures`] if unsigned; otherwise CBOR encode errors.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = self.encode_untagged()?;
        let mut e = minicbor::Encoder::new(Vec::with_capacity(body.len() + 2));
        e.tag(minicbor::data::Tag::new(TAG))?;
        e.writer_mut().extend_from_slice(&body);
        Ok(e.into_writer())
    }

    /// Encode the bare 4-element array, with no tag prefix.
    ///
    /// # Errors
    /// [`Error::NoSignatures`] if unsigned; otherwise CBOR encode errors.
    pub fn encode_untagged(&self) -> Result<Vec<u8>> {
        if self.signature.is_empty() {
            return Err(Error::NoSignatures);
        }
        let protected = match &self.headers.raw_protected {
            Some(p) => p.clone(),
            None => self.headers.encode_protected_bstr()?,
        };
        let unprotected = self.headers.encode_unprotected_map()?;
        let mut e = minicbor::Encoder::new(Vec::new());
        e.array(4)?;
        e.writer_mut().extend_from_slice(&protected);
        e.writer_mut().extend_from_slice(&unprotected);
        match &self.payload {
            Some(p) => {
                e.bytes(p)?;
            },
            None => {
                e.null()?;
            },
        }
        e.bytes(&self.signature)?;
        Ok(e.into_writer())
    }

    /// Decode a tag-18-wrapped `COSE_Sign1` message.
    ///
    /// # Errors
    /// [`Error::Malformed`] if the tag is missing/wrong, or for any shape
    /// violation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(bytes);
        let tag = d
            .tag()
            .map_err(|e| Error::malformed(format!("expected tag {TAG}: {e}")))?;
        if tag.as_u64() != TAG {
            return Err(Error::malformed(format!(
                "expected COSE_Sign1 tag {TAG}, got {}",
                tag.as_u64()
            )));
        }
        Self::decode_body(&mut d, bytes)
    }

    /// Decode an untagged `Sign1` array.
    ///
    /// # Errors
    /// [`Error::Malformed`] for any shape violation.
    pub fn decode_untagged(bytes: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(bytes);
        Self::decode_body(&mut d, bytes)
    }

    fn decode_body(d: &mut minicbor::Decoder<'_>, bytes: &[u8]) -> Result<Self> {
        let len = d
            .array()?
            .ok_or_else(|| Error::malformed("indefinite-length Sign1 array"))?;
        if len != 4 {
            return Err(Error::malformed(format!(
                "COSE_Sign1 array must have 4 elements, got {len}"
            )));
        }

        let protected_start = d.position();
        d.skip()?;
        let protected_bytes = slice(bytes, protected_start, d.position())?;

        let unprotected_start = d.position();
        d.skip()?;
        let unprotected_bytes = slice(bytes, unprotected_start, d.position())?;

        if d.datatype()? == minicbor::data::Type::Tag {
            return Err(Error::malformed("payload must not carry a CBOR tag"));
        }
        let payload = if d.datatype()? == minicbor::data::Type::Null {
            d.skip()?;
            None
        } else {
            Some(d.bytes()?.to_vec())
        };

        if d.datatype()? == minicbor::data::Type::Tag {
            return Err(Error::malformed("signature must not carry a CBOR tag"));
        }
        let signature = d.bytes()?.to_vec();

        if d.position() != bytes.len() {
            return Err(Error::malformed("trailing bytes after Sign1 array"));
        }

        let headers = Headers::decode(protected_bytes, unprotected_bytes)?;
        Ok(Self {
            headers,
            payload,
            signature,
        })
    }
}

fn slice(bytes: &[u8], start: usize, end: usize) -> Result<&[u8]> {
    bytes
        .get(start..end)
        .ok_or_else(|| Error::malformed("item out of range"))
}

/// The untagged form of [`Sign1Message`] (no CBOR tag 18 prefix).
#[derive(Debug, Clone, Default)]
pub struct UntaggedSign1Message(pub Sign1Message);

impl Deref for UntaggedSign1Message {
    type Target = Sign1Message;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for UntaggedSign1Message {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl UntaggedSign1Message {
    /// Encode with no tag prefix.
    ///
    /// # Errors
    /// See [`Sign1Message::encode_untagged`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.0.encode_untagged()
    }

    /// Decode with no tag prefix expected.
    ///
    /// # Errors
    /// See [`Sign1Message::decode_untagged`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Sign1Message::decode_untagged(bytes).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::eddsa::{EddsaSigner, EddsaVerifier};

    fn ed25519_pair() -> (EddsaSigner, EddsaVerifier) {
        let seed = [7u8; 32];
        let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        (
            EddsaSigner::from_seed(&seed).unwrap(),
            EddsaVerifier::from_public(verifying.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let (signer, verifier) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), Some(b"hello world".to_vec()));
        let mut rng = rand::rngs::OsRng;
        msg.sign(&signer, &mut rng, &[]).unwrap();
        let encoded = msg.encode().unwrap();
        let decoded = Sign1Message::decode(&encoded).unwrap();
        decoded.verify(&verifier, &[], &[]).unwrap();
    }

    #[test]
    fn signing_without_payload_fails() {
        let (signer, _) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), None);
        let mut rng = rand::rngs::OsRng;
        assert!(msg.sign(&signer, &mut rng, &[]).is_err());
        assert!(msg.signature.is_empty());
    }

    #[test]
    fn double_signing_fails() {
        let (signer, _) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), Some(b"x".to_vec()));
        let mut rng = rand::rngs::OsRng;
        msg.sign(&signer, &mut rng, &[]).unwrap();
        assert!(msg.sign(&signer, &mut rng, &[]).is_err());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let (signer, verifier) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), Some(b"hello".to_vec()));
        let mut rng = rand::rngs::OsRng;
        msg.sign(&signer, &mut rng, &[]).unwrap();
        msg.payload = Some(b"hellp".to_vec());
        assert!(msg.verify(&verifier, &[], &[]).is_err());
    }

    #[test]
    fn empty_protected_header_scenario_s2() {
        let bytes = [
            0xd2, 0x84, 0x40, 0xa0, 0x4c, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x20, 0x77, 0x6f, 0x72,
            0x6c, 0x64, 0x41, 0x00,
        ];
        let decoded = Sign1Message::decode(&bytes).unwrap();
        assert!(decoded.headers.protected.0.is_empty());
        assert_eq!(decoded.headers.raw_protected, Some(vec![0x40]));
        assert_eq!(decoded.payload, Some(b"hello world".to_vec()));
    }
}
