//! The countersignature engine (RFC 9338, `spec.md` §4.7): target dispatch,
//! `CounterSignature`/`CounterSignatureV2` `Sig_structure` construction, and
//! nested countersigning.

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::message::sig_structure::{self, Context};
use crate::message::{Sign1Message, SignMessage, Signature};
use crate::sign::{Signer, Verifier};

/// The maximum countersignature nesting depth this crate allows (`spec.md`
/// §9's Open Question #2). Arbitrary but documented: deep nesting has no
/// protocol meaning and no real deployment countersigns more than twice.
pub const MAX_NESTING_DEPTH: usize = 8;

/// What a [`Countersignature`] applies over (`spec.md` §4.7, "Target
/// dispatch").
pub enum Target<'a> {
    /// Countersigns a `COSE_Sign` message; must have at least one signature.
    SignMessage(&'a SignMessage),
    /// Countersigns a `COSE_Sign1` message; must be signed and carry a
    /// payload.
    Sign1Message(&'a Sign1Message),
    /// Countersigns a single `COSE_Signature`; must carry signature bytes.
    Signature(&'a Signature),
    /// Countersigns another countersignature; must carry signature bytes.
    Countersignature(&'a Countersignature),
}

impl Target<'_> {
    /// The nesting depth of this target: `0` for a base message/signature,
    /// or one more than the target's own depth when countersigning a
    /// `Countersignature`.
    fn depth(&self) -> usize {
        match self {
            Self::Countersignature(cs) => cs.depth + 1,
            _ => 0,
        }
    }

    fn body_protected(&self) -> Result<Vec<u8>> {
        let raw = match self {
            Self::SignMessage(m) => &m.headers.raw_protected,
            Self::Sign1Message(m) => &m.headers.raw_protected,
            Self::Signature(s) => &s.headers.raw_protected,
            Self::Countersignature(cs) => &cs.headers.raw_protected,
        };
        match raw {
            Some(p) => Ok(p.clone()),
            None => match self {
                Self::SignMessage(m) => m.headers.encode_protected_bstr(),
                Self::Sign1Message(m) => m.headers.encode_protected_bstr(),
                Self::Signature(s) => s.headers.encode_protected_bstr(),
                Self::Countersignature(cs) => cs.headers.encode_protected_bstr(),
            },
        }
    }

    fn payload(&self) -> Result<Vec<u8>> {
        match self {
            Self::SignMessage(m) => m
                .payload
                .clone()
                .ok_or_else(|| Error::malformed("missing payload")),
            Self::Sign1Message(m) => m
                .payload
                .clone()
                .ok_or_else(|| Error::malformed("missing payload")),
            Self::Signature(_) | Self::Countersignature(_) => Ok(Vec::new()),
        }
    }

    fn other_fields(&self) -> Result<Vec<Vec<u8>>> {
        match self {
            Self::SignMessage(m) => {
                if m.signatures.is_empty() {
                    return Err(Error::malformed("SignMessage has no signatures"));
                }
                m.signatures
                    .iter()
                    .map(|s| {
                        if s.signature.is_empty() {
                            Err(Error::malformed("Signature was not signed yet"))
                        } else {
                            Ok(s.signature.clone())
                        }
                    })
                    .collect()
            },
            Self::Sign1Message(m) => {
                if m.signature.is_empty() {
                    return Err(Error::malformed("Sign1Message was not signed yet"));
                }
                Ok(vec![m.signature.clone()])
            },
            Self::Signature(s) => {
                if s.signature.is_empty() {
                    return Err(Error::malformed("Signature was not signed yet"));
                }
                Ok(vec![s.signature.clone()])
            },
            Self::Countersignature(cs) => {
                if cs.signature.is_empty() {
                    return Err(Error::malformed("Countersignature was not signed yet"));
                }
                Ok(vec![cs.signature.clone()])
            },
        }
    }

    /// Validate the target carries what the countersignature needs,
    /// independent of V2's `other_fields` inclusion.
    fn check_signed(&self) -> Result<()> {
        match self {
            Self::SignMessage(m) => {
                if m.signatures.is_empty() || m.signatures.iter().any(|s| s.signature.is_empty())
                {
                    return Err(Error::malformed("Signature was not signed yet"));
                }
            },
            Self::Sign1Message(m) => {
                if m.signature.is_empty() {
                    return Err(Error::malformed("Sign1Message was not signed yet"));
                }
                if m.payload.is_none() {
                    return Err(Error::malformed("missing payload"));
                }
            },
            Self::Signature(s) => {
                if s.signature.is_empty() {
                    return Err(Error::malformed("Signature was not signed yet"));
                }
            },
            Self::Countersignature(cs) => {
                if cs.signature.is_empty() {
                    return Err(Error::malformed("Countersignature was not signed yet"));
                }
            },
        }
        Ok(())
    }
}

/// A full two-layer countersignature: its own headers plus signature bytes.
#[derive(Debug, Clone, Default)]
pub struct Countersignature {
    /// This countersignature's own header bundle.
    pub headers: Headers,
    /// The signature bytes. Empty until signed.
    pub signature: Vec<u8>,
    /// This countersignature's nesting depth (0 = counter-signs a base
    /// message/signature; N = counter-signs a depth-(N-1) countersignature).
    pub depth: usize,
}

impl Countersignature {
    /// A fresh, unsigned countersignature over a target at depth 0.
    #[must_use]
    pub fn new(headers: Headers) -> Self {
        Self {
            headers,
            signature: Vec::new(),
            depth: 0,
        }
    }

    /// Sign this countersignature over `target` (`spec.md` §4.7).
    ///
    /// `v2` selects RFC 9338 `CounterSignatureV2` (including the target's
    /// existing signature(s) as `other_fields`) versus the traditional
    /// `CounterSignature` context.
    ///
    /// # Errors
    /// [`Error::malformed`] if the target is not yet signed, if nesting
    /// would exceed [`MAX_NESTING_DEPTH`], or if the declared `alg`
    /// disagrees with `signer.algorithm()`; otherwise propagates
    /// [`Signer::sign`] and CBOR encode errors.
    pub fn sign(
        &mut self,
        signer: &dyn Signer,
        randomness: &mut dyn rand_core::RngCore,
        target: &Target<'_>,
        external_aad: &[u8],
        v2: bool,
    ) -> Result<()> {
        if !self.signature.is_empty() {
            return Err(Error::malformed("Countersignature is already signed"));
        }
        self.depth = target.depth();
        if self.depth > MAX_NESTING_DEPTH {
            return Err(Error::malformed(
                "countersignature nesting exceeds depth limit",
            ));
        }
        target.check_signed()?;

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

        let context = if v2 {
            Context::CounterSignatureV2
        } else {
            Context::CounterSignature
        };
        let other_fields = if v2 { target.other_fields()? } else { Vec::new() };
        let body_protected = target.body_protected()?;
        let payload = target.payload()?;
        let tbs = sig_structure::build(
            context,
            &body_protected,
            None,
            external_aad,
            &payload,
            &other_fields,
        )?;
        let protected_bstr = self.headers.encode_protected_bstr()?;
        self.headers.raw_protected = Some(protected_bstr);
        self.signature = signer.sign(randomness, &tbs)?;
        Ok(())
    }

    /// Verify this countersignature over `target`.
    ///
    /// # Errors
    /// [`Error::Verification`] on failure.
    pub fn verify(
        &self,
        verifier: &dyn Verifier,
        target: &Target<'_>,
        external_aad: &[u8],
        v2: bool,
    ) -> Result<()> {
        if self.signature.is_empty() {
            return Err(Error::Verification);
        }
        if let Ok(declared) = self.headers.alg() {
            if declared != verifier.algorithm() {
                return Err(Error::Verification);
            }
        }
        target.check_signed().map_err(|_| Error::Verification)?;

        let context = if v2 {
            Context::CounterSignatureV2
        } else {
            Context::CounterSignature
        };
        let other_fields = if v2 {
            target.other_fields().map_err(|_| Error::Verification)?
        } else {
            Vec::new()
        };
        let body_protected = target.body_protected().map_err(|_| Error::Verification)?;
        let payload = target.payload().map_err(|_| Error::Verification)?;
        let tbs = sig_structure::build(
            context,
            &body_protected,
            None,
            external_aad,
            &payload,
            &other_fields,
        )
        .map_err(|_| Error::Verification)?;
        verifier.verify(&tbs, &self.signature)
    }
}

/// A bare countersignature: just the signature bytes, carried inside a
/// header parameter rather than as a nested object (RFC 9338 §4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countersignature0(pub Vec<u8>);

/// Produce a `Countersignature0` over `target` without embedding a
/// countersignature header.
///
/// # Errors
/// [`Error::malformed`] if the target is not yet signed; otherwise
/// propagates [`Signer::sign`] and CBOR encode errors.
pub fn sign_countersignature0(
    signer: &dyn Signer,
    randomness: &mut dyn rand_core::RngCore,
    target: &Target<'_>,
    external_aad: &[u8],
) -> Result<Countersignature0> {
    target.check_signed()?;
    let body_protected = target.body_protected()?;
    let payload = target.payload()?;
    let tbs = sig_structure::build(
        Context::CounterSignature,
        &body_protected,
        None,
        external_aad,
        &payload,
        &[],
    )?;
    Ok(Countersignature0(signer.sign(randomness, &tbs)?))
}

/// Verify a `Countersignature0` over `target`.
///
/// # Errors
/// [`Error::Verification`] on failure.
pub fn verify_countersignature0(
    verifier: &dyn Verifier,
    tag: &Countersignature0,
    target: &Target<'_>,
    external_aad: &[u8],
) -> Result<()> {
    target.check_signed().map_err(|_| Error::Verification)?;
    let body_protected = target.body_protected().map_err(|_| Error::Verification)?;
    let payload = target.payload().map_err(|_| Error::Verification)?;
    let tbs = sig_structure::build(
        Context::CounterSignature,
        &body_protected,
        None,
        external_aad,
        &payload,
        &[],
    )
    .map_err(|_| Error::Verification)?;
    verifier.verify(&tbs, &tag.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::eddsa::{EddsaSigner, EddsaVerifier};

    fn ed25519_pair() -> (EddsaSigner, EddsaVerifier) {
        let seed = [11u8; 32];
        let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        (
            EddsaSigner::from_seed(&seed).unwrap(),
            EddsaVerifier::from_public(verifying.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn scenario_s6_countersigning_an_unsigned_signature_fails() {
        let (signer, _) = ed25519_pair();
        let target = Signature::new(Headers::new());
        let mut cs = Countersignature::new(Headers::new());
        let mut rng = rand::rngs::OsRng;
        let err = cs
            .sign(&signer, &mut rng, &Target::Signature(&target), &[], false)
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert!(cs.signature.is_empty());
    }

    #[test]
    fn countersign_over_sign1_round_trips() {
        let (signer, verifier) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), Some(b"payload".to_vec()));
        let mut rng = rand::rngs::OsRng;
        msg.sign(&signer, &mut rng, &[]).unwrap();

        let mut cs = Countersignature::new(Headers::new());
        cs.sign(&signer, &mut rng, &Target::Sign1Message(&msg), &[], false)
            .unwrap();
        cs.verify(&verifier, &Target::Sign1Message(&msg), &[], false)
            .unwrap();
    }

    #[test]
    fn countersignature_v2_includes_target_signature_in_tbs() {
        let (signer, verifier) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), Some(b"payload".to_vec()));
        let mut rng = rand::rngs::OsRng;
        msg.sign(&signer, &mut rng, &[]).unwrap();

        let mut cs_v1 = Countersignature::new(Headers::new());
        cs_v1
            .sign(&signer, &mut rng, &Target::Sign1Message(&msg), &[], false)
            .unwrap();
        let mut cs_v2 = Countersignature::new(Headers::new());
        cs_v2
            .sign(&signer, &mut rng, &Target::Sign1Message(&msg), &[], true)
            .unwrap();

        // Same signer/target but different contexts (V1 omits other_fields,
        // V2 includes the target's signature bytes) must not collide.
        assert_ne!(cs_v1.signature, cs_v2.signature);
        cs_v2
            .verify(&verifier, &Target::Sign1Message(&msg), &[], true)
            .unwrap();
        assert!(cs_v1
            .verify(&verifier, &Target::Sign1Message(&msg), &[], true)
            .is_err());
    }

    #[test]
    fn nesting_depth_is_tracked_and_capped() {
        let (signer, _verifier) = ed25519_pair();
        let mut rng = rand::rngs::OsRng;
        let mut msg = Sign1Message::new(Headers::new(), Some(b"x".to_vec()));
        msg.sign(&signer, &mut rng, &[]).unwrap();

        let mut current = Countersignature::new(Headers::new());
        current
            .sign(&signer, &mut rng, &Target::Sign1Message(&msg), &[], false)
            .unwrap();
        assert_eq!(current.depth, 0);

        for expected_depth in 1..=MAX_NESTING_DEPTH {
            let mut next = Countersignature::new(Headers::new());
            next.sign(
                &signer,
                &mut rng,
                &Target::Countersignature(&current),
                &[],
                false,
            )
            .unwrap();
            assert_eq!(next.depth, expected_depth);
            current = next;
        }

        let mut too_deep = Countersignature::new(Headers::new());
        let err = too_deep
            .sign(
                &signer,
                &mut rng,
                &Target::Countersignature(&current),
                &[],
                false,
            )
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn countersignature0_round_trips() {
        let (signer, verifier) = ed25519_pair();
        let mut msg = Sign1Message::new(Headers::new(), Some(b"payload".to_vec()));
        let mut rng = rand::rngs::OsRng;
        msg.sign(&signer, &mut rng, &[]).unwrap();

        let tag =
            sign_countersignature0(&signer, &mut rng, &Target::Sign1Message(&msg), &[]).unwrap();
        verify_countersignature0(&verifier, &tag, &Target::Sign1Message(&msg), &[]).unwrap();
    }
}
