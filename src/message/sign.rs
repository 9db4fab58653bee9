//! `COSE_Sign`, the multi-signer message (`spec.md` §3, §4.6). Grounded on
//! `cose_sign/mod.rs::CoseSign`/`CoseSignBuilder`'s multi-signature assembly
//! and `cose_sign/helpers.rs::encode_cose_sign`'s tagged-array shape.

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::label::Label;
use crate::message::sig_structure::{self, Context};
use crate::message::signature::Signature;
use crate::sign::{Signer, Verifier};

const TAG: u64 = 98;

/// A `COSE_Sign` message: outer `Headers`, an optional payload, and an
/// ordered list of one or more per-signer [`Signature`]s.
#[derive(Debug, Clone, Default)]
pub struct SignMessage {
    /// The outer header bundle.
    pub headers: Headers,
    /// The payload, or `None` for a detached payload.
    pub payload: Option<Vec<u8>>,
    /// One entry per signer.
    pub signatures: Vec<Signature>,
}

impl SignMessage {
    /// Construct a fresh message with the given (unsigned) per-signer
    /// `Signature` placeholders.
    #[must_use]
    pub fn new(headers: Headers, payload: Option<Vec<u8>>, signatures: Vec<Signature>) -> Self {
        Self {
            headers,
            payload,
            signatures,
        }
    }

    /// Sign every `Signature` with its matching entry in `signers`
    /// (`spec.md` §4.6, "Signing/Verifying (Sign)"). `signers.len()` must
    /// equal `self.signatures.len()`.
    ///
    /// # Errors
    /// [`Error::malformed`] on a signer/signature count mismatch, a missing
    /// payload, or if any `Signature` is already signed; otherwise
    /// propagates [`Signer::sign`] and CBOR encode errors.
    pub fn sign(
        &mut self,
        signers: &[&dyn Signer],
        randomness: &mut dyn rand_core::RngCore,
        external_aad: &[u8],
    ) -> Result<()> {
        if signers.len() != self.signatures.len() {
            return Err(Error::malformed(format!(
                "{} signers for {} signatures",
                signers.len(),
                self.signatures.len()
            )));
        }
        for sig in &self.signatures {
            if !sig.signature.is_empty() {
                return Err(Error::malformed("Signature is already signed"));
            }
        }
        let Some(payload) = &self.payload else {
            return Err(Error::malformed("missing payload"));
        };

        self.headers.validate()?;
        let body_protected = self.headers.encode_protected_bstr()?;
        self.headers.raw_protected = Some(body_protected.clone());

        for (signature, signer) in self.signatures.iter_mut().zip(signers) {
            match signature.headers.alg() {
                Ok(declared) if declared != signer.algorithm() => {
                    return Err(Error::AlgorithmMismatch(
                        crate::algorithm::name(declared),
                        crate::algorithm::name(signer.algorithm()),
                    ));
                },
                Ok(_) => {},
                Err(Error::AlgorithmNotFound) => signature.headers.set_alg(signer.algorithm()),
                Err(e) => return Err(e),
            }
            signature.headers.validate()?;
            let sign_protected = signature.headers.encode_protected_bstr()?;
            let tbs = sig_structure::build(
                Context::Signature,
                &body_protected,
                Some(&sign_protected),
                external_aad,
                payload,
                &[],
            )?;
            signature.signature = signer.sign(randomness, &tbs)?;
            signature.headers.raw_protected = Some(sign_protected);
        }
        Ok(())
    }

    /// Verify every `Signature` with its matching entry in `verifiers`.
    ///
    /// # Errors
    /// [`Error::Verification`] if any verifier fails; [`Error::malformed`]
    /// on a verifier/signature count mismatch.
    pub fn verify(
        &self,
        verifiers: &[&dyn Verifier],
        external_aad: &[u8],
        known_extensions: &[Label],
    ) -> Result<()> {
        if verifiers.len() != self.signatures.len() {
            return Err(Error::malformed(format!(
                "{} verifiers for {} signatures",
                verifiers.len(),
                self.signatures.len()
            )));
        }
        if self.signatures.is_empty() {
            return Err(Error::NoSignatures);
        }
        self.headers.check_critical(known_extensions)?;
        let body_protected = match &self.headers.raw_protected {
            Some(p) => p.clone(),
            None => self.headers.encode_protected_bstr()?,
        };
        let payload = self.payload.as_deref().ok_or(Error::Verification)?;

        for (signature, verifier) in self.signatures.iter().zip(verifiers) {
            if signature.signature.is_empty() {
                return Err(Error::Verification);
            }
            if let Ok(declared) = signature.headers.alg() {
                if declared != verifier.algorithm() {
                    return Err(Error::Verification);
                }
            }
            signature.headers.check_critical(known_extensions)?;
            let sign_protected = match &signature.headers.raw_protected {
                Some(p) => p.clone(),
                None => signature.headers.encode_protected_bstr()?,
            };
            let tbs = sig_structure::build(
                Context::Signature,
                &body_protected,
                Some(&sign_protected),
                external_aad,
                payload,
                &[],
            )?;
            verifier.verify(&tbs, &signature.signature)?;
        }
        Ok(())
    }

    /// Encode as a tag-98-wrapped array `[protected, unprotected,
    /// payload-or-nil, [+ COSE_Signature]]`.
    ///
    /// # Errors
    /// [`Error::NoSignatures`] if empty; otherwise CBOR encode errors.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.signatures.is_empty() {
            return Err(Error::NoSignatures);
        }
        let protected = match &self.headers.raw_protected {
            Some(p) => p.clone(),
            None => self.headers.encode_protected_bstr()?,
        };
        let unprotected = self.headers.encode_unprotected_map()?;

        let mut e = minicbor::Encoder::new(Vec::new());
        e.tag(minicbor::data::Tag::new(TAG))?;
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
        e.array(self.signatures.len() as u64)?;
        for signature in &self.signatures {
            e.writer_mut().extend_from_slice(&signature.encode()?);
        }
        Ok(e.into_writer())
    }

    /// Decode a tag-98-wrapped `COSE_Sign` message.
    ///
    /// # Errors
    /// [`Error::Malformed`] for any shape violation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(bytes);
        let tag = d
            .tag()
            .map_err(|e| Error::malformed(format!("expected tag {TAG}: {e}")))?;
        if tag.as_u64() != TAG {
            return Err(Error::malformed(format!(
                "expected COSE_Sign tag {TAG}, got {}",
                tag.as_u64()
            )));
        }

        let len = d
            .array()?
            .ok_or_else(|| Error::malformed("indefinite-length Sign array"))?;
        if len != 4 {
            return Err(Error::malformed(format!(
                "COSE_Sign array must have 4 elements, got {len}"
            )));
        }

        let protected_start = d.position();
        d.skip()?;
        let protected_bytes = bytes
            .get(protected_start..d.position())
            .ok_or_else(|| Error::malformed("item out of range"))?;

        let unprotected_start = d.position();
        d.skip()?;
        let unprotected_bytes = bytes
            .get(unprotected_start..d.position())
            .ok_or_else(|| Error::malformed("item out of range"))?;

        let payload = if d.datatype()? == minicbor::data::Type::Null {
            d.skip()?;
            None
        } else {
            Some(d.bytes()?.to_vec())
        };

        let sig_count = d
            .array()?
            .ok_or_else(|| Error::malformed("indefinite-length COSE_Signature array"))?;
        let mut signatures = Vec::with_capacity(usize::try_from(sig_count).unwrap_or(0));
        for _ in 0..sig_count {
            let start = d.position();
            d.skip()?;
            let item = bytes
                .get(start..d.position())
                .ok_or_else(|| Error::malformed("item out of range"))?;
            signatures.push(Signature::decode(item)?);
        }

        if d.position() != bytes.len() {
            return Err(Error::malformed("trailing bytes after Sign array"));
        }
        if signatures.is_empty() {
            return Err(Error::NoSignatures);
        }

        let headers = Headers::decode(protected_bytes, unprotected_bytes)?;
        Ok(Self {
            headers,
            payload,
            signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::eddsa::{EddsaSigner, EddsaVerifier};

    fn ed25519_pair(seed: u8) -> (EddsaSigner, EddsaVerifier) {
        let seed = [seed; 32];
        let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        (
            EddsaSigner::from_seed(&seed).unwrap(),
            EddsaVerifier::from_public(verifying.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn two_signer_round_trip() {
        let (signer_a, verifier_a) = ed25519_pair(1);
        let (signer_b, verifier_b) = ed25519_pair(2);
        let mut msg = SignMessage::new(
            Headers::new(),
            Some(b"multi-signer payload".to_vec()),
            vec![Signature::new(Headers::new()), Signature::new(Headers::new())],
        );
        let mut rng = rand::rngs::OsRng;
        msg.sign(&[&signer_a, &signer_b], &mut rng, &[]).unwrap();

        let encoded = msg.encode().unwrap();
        let decoded = SignMessage::decode(&encoded).unwrap();
        decoded
            .verify(&[&verifier_a, &verifier_b], &[], &[])
            .unwrap();
    }

    #[test]
    fn scenario_s5_signer_count_mismatch_is_rejected() {
        let (signer_a, _) = ed25519_pair(3);
        let mut msg = SignMessage::new(
            Headers::new(),
            Some(b"x".to_vec()),
            vec![Signature::new(Headers::new()), Signature::new(Headers::new())],
        );
        let mut rng = rand::rngs::OsRng;
        let err = msg.sign(&[&signer_a], &mut rng, &[]).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(msg.signatures.iter().all(|s| s.signature.is_empty()));
    }

    #[test]
    fn empty_sign_message_has_no_signatures_error() {
        let msg = SignMessage::new(Headers::new(), Some(b"x".to_vec()), vec![]);
        assert!(matches!(msg.encode(), Err(Error::NoSignatures)));
    }
}
