//! Hash Envelope (`spec.md` §4.8): a [`Sign1Message`] whose payload is a
//! pre-computed digest rather than the signed content itself. This crate
//! never computes the digest — callers supply it, the same way `spec.md`
//! §1 places concrete hash primitives outside this core's scope except for
//! the output-size table already carried by [`crate::algorithm`].

use crate::algorithm;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::label::Label;
use crate::message::Sign1Message;
use crate::sign::{Signer, Verifier};
use crate::value::Value;

/// A [`Sign1Message`] whose payload has been validated as a hash-envelope
/// digest: the protected header carries `PayloadHashAlgorithm` (258) and,
/// optionally, `PayloadPreimageContentType` (259) and `PayloadLocation`
/// (260); the regular `ContentType` (3) is forbidden in both header maps.
#[derive(Debug, Clone, Default)]
pub struct HashEnvelope(pub Sign1Message);

impl HashEnvelope {
    /// Stamp `headers` for a hash envelope carrying `digest` and wrap it
    /// around a fresh, unsigned [`Sign1Message`].
    ///
    /// `hash_alg` is the IANA algorithm id whose associated hash function's
    /// output size `digest` must match (`spec.md` §4.8). `preimage_content_type`
    /// is the COSE content-type value of the pre-image the digest was taken
    /// over; `location` is an optional URI pointing at where to fetch it.
    ///
    /// # Errors
    /// [`Error::UnknownAlgorithm`] if `hash_alg` has no hash mapping;
    /// [`Error::malformed`] if `hash_alg` has no associated hash, if
    /// `digest`'s length disagrees with that hash's output size, or if
    /// `headers` already carries `ContentType` (3) or `PayloadHashAlgorithm`
    /// (258) in the unprotected map.
    pub fn new(
        mut headers: Headers,
        hash_alg: i64,
        digest: Vec<u8>,
        preimage_content_type: Option<Value>,
        location: Option<String>,
    ) -> Result<Self> {
        check_no_content_type(&headers)?;
        if headers.unprotected.0.contains(&Label::PAYLOAD_HASH_ALG) {
            return Err(Error::malformed(
                "PayloadHashAlgorithm must not appear in the unprotected map",
            ));
        }
        check_digest_length(hash_alg, &digest)?;

        headers
            .protected
            .0
            .set(Label::PAYLOAD_HASH_ALG, Value::Int(hash_alg));
        if let Some(content_type) = preimage_content_type {
            headers
                .protected
                .0
                .set(Label::PAYLOAD_PREIMAGE_CONTENT_TYPE, content_type);
        }
        if let Some(location) = location {
            headers
                .protected
                .0
                .set(Label::PAYLOAD_LOCATION, Value::Text(location));
        }

        Ok(Self(Sign1Message::new(headers, Some(digest))))
    }

    /// Sign the envelope, delegating to [`Sign1Message::sign`].
    ///
    /// # Errors
    /// See [`Sign1Message::sign`].
    pub fn sign(
        &mut self,
        signer: &dyn Signer,
        randomness: &mut dyn rand_core::RngCore,
        external_aad: &[u8],
    ) -> Result<()> {
        self.0.sign(signer, randomness, external_aad)
    }

    /// Verify the envelope: re-run the hash-envelope policy check (§4.8
    /// "On verify, repeat the validation") against the decoded headers and
    /// payload, then delegate to [`Sign1Message::verify`].
    ///
    /// # Errors
    /// [`Error::Verification`] if the policy check fails or the signature
    /// does not verify; see [`Sign1Message::verify`] for other variants.
    pub fn verify(
        &self,
        verifier: &dyn Verifier,
        external_aad: &[u8],
        known_extensions: &[Label],
    ) -> Result<()> {
        let hash_alg = self
            .0
            .headers
            .payload_hash_alg()
            .ok_or(Error::Verification)?;
        check_no_content_type(&self.0.headers).map_err(|_| Error::Verification)?;
        if self
            .0
            .headers
            .unprotected
            .0
            .contains(&Label::PAYLOAD_HASH_ALG)
        {
            return Err(Error::Verification);
        }
        let digest = self.0.payload.as_deref().ok_or(Error::Verification)?;
        check_digest_length(hash_alg, digest).map_err(|_| Error::Verification)?;

        self.0.verify(verifier, external_aad, known_extensions)
    }

    /// Decode a tagged `COSE_Sign1` envelope and validate the hash-envelope
    /// policy against its decoded headers/payload.
    ///
    /// # Errors
    /// [`Error::Malformed`] for any wire-shape violation or policy
    /// violation caught at decode time.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let inner = Sign1Message::decode(bytes)?;
        let hash_alg = inner
            .headers
            .payload_hash_alg()
            .ok_or_else(|| Error::malformed("missing PayloadHashAlgorithm"))?;
        check_no_content_type(&inner.headers)?;
        if inner
            .headers
            .unprotected
            .0
            .contains(&Label::PAYLOAD_HASH_ALG)
        {
            return Err(Error::malformed(
                "PayloadHashAlgorithm must not appear in the unprotected map",
            ));
        }
        let digest = inner
            .payload
            .as_deref()
            .ok_or_else(|| Error::malformed("hash envelope payload must not be detached"))?;
        check_digest_length(hash_alg, digest)?;
        Ok(Self(inner))
    }

    /// Encode, delegating to [`Sign1Message::encode`].
    ///
    /// # Errors
    /// See [`Sign1Message::encode`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.0.encode()
    }
}

fn check_no_content_type(headers: &Headers) -> Result<()> {
    if headers.content_type().is_some() {
        return Err(Error::malformed(
            "ContentType is forbidden in a hash envelope's headers",
        ));
    }
    Ok(())
}

fn check_digest_length(hash_alg: i64, digest: &[u8]) -> Result<()> {
    let hash = algorithm::hash(hash_alg)?
        .ok_or_else(|| Error::malformed(format!("algorithm {hash_alg} has no associated hash")))?;
    if digest.len() != hash.output_size() {
        return Err(Error::malformed(format!(
            "digest length {} does not match {:?} output size {}",
            digest.len(),
            hash,
            hash.output_size()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::ES256;
    use crate::key::Curve;
    use crate::sign::ecdsa::{EcdsaSigner, EcdsaVerifier};

    fn es256_pair() -> (EcdsaSigner, EcdsaVerifier) {
        let scalar = [9u8; 32];
        let signing_key = p256::ecdsa::SigningKey::from_slice(&scalar).unwrap();
        let verifying = signing_key.verifying_key();
        let point = verifying.to_encoded_point(false);
        let verifier =
            EcdsaVerifier::from_coordinates(Curve::P256, point.x().unwrap(), point.y().unwrap())
                .unwrap();
        (EcdsaSigner::P256(signing_key), verifier)
    }

    #[test]
    fn scenario_s8_happy_path() {
        let (signer, verifier) = es256_pair();
        let digest = [0u8; 32];
        let mut envelope = HashEnvelope::new(
            Headers::new(),
            ES256,
            digest.to_vec(),
            Some(Value::Text("application/cbor".into())),
            None,
        )
        .unwrap();
        let mut rng = rand::rngs::OsRng;
        envelope.sign(&signer, &mut rng, &[]).unwrap();
        assert!(envelope.0.headers.protected.0.contains(&Label::ALG));
        assert!(envelope
            .0
            .headers
            .protected
            .0
            .contains(&Label::PAYLOAD_HASH_ALG));
        assert!(envelope
            .0
            .headers
            .protected
            .0
            .contains(&Label::PAYLOAD_PREIMAGE_CONTENT_TYPE));

        let encoded = envelope.encode().unwrap();
        let decoded = HashEnvelope::decode(&encoded).unwrap();
        decoded.verify(&verifier, &[], &[]).unwrap();
        assert_eq!(decoded.0.payload, Some(digest.to_vec()));
    }

    #[test]
    fn wrong_digest_length_is_rejected() {
        let headers = Headers::new();
        let err = HashEnvelope::new(headers, ES256, vec![0u8; 10], None, None).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn content_type_header_is_forbidden() {
        let mut headers = Headers::new();
        headers
            .protected
            .0
            .set(Label::CONTENT_TYPE, Value::Text("application/json".into()));
        let err = HashEnvelope::new(headers, ES256, vec![0u8; 32], None, None).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
