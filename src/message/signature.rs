//! `COSE_Signature`, the per-signer element inside a `COSE_Sign` array
//! (`spec.md` §3). Grounded on `signature/mod.rs`'s `Decode` impl (array-
//! length check, strict map decode for the empty unprotected map).

use crate::error::{Error, Result};
use crate::headers::Headers;

/// One signer's contribution to a `COSE_Sign` message: its own headers plus
/// the signature bytes.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    /// This signer's header bundle.
    pub headers: Headers,
    /// The signature bytes. Empty until signed.
    pub signature: Vec<u8>,
}

impl Signature {
    /// A fresh, unsigned `COSE_Signature`.
    #[must_use]
    pub fn new(headers: Headers) -> Self {
        Self {
            headers,
            signature: Vec::new(),
        }
    }

    /// Encode as a 3-element array `[protected, unprotected, signature]`.
    ///
    /// # Errors
    /// [`Error::NoSignatures`] if unsigned; otherwise CBOR encode errors.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.signature.is_empty() {
            return Err(Error::NoSignatures);
        }
        let protected = match &self.headers.raw_protected {
            Some(p) => p.clone(),
            None => self.headers.encode_protected_bstr()?,
        };
        let unprotected = self.headers.encode_unprotected_map()?;
        let mut e = minicbor::Encoder::new(Vec::new());
        e.array(3)?;
        e.writer_mut().extend_from_slice(&protected);
        e.writer_mut().extend_from_slice(&unprotected);
        e.bytes(&self.signature)?;
        Ok(e.into_writer())
    }

    /// Decode a 3-element `COSE_Signature` array from a pre-sliced item.
    ///
    /// # Errors
    /// [`Error::Malformed`] for any shape violation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(bytes);
        let len = d
            .array()?
            .ok_or_else(|| Error::malformed("indefinite-length COSE_Signature array"))?;
        if len != 3 {
            return Err(Error::malformed(format!(
                "COSE_Signature array must have 3 elements, got {len}"
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

        let signature = d.bytes()?.to_vec();
        if d.position() != bytes.len() {
            return Err(Error::malformed("trailing bytes after COSE_Signature"));
        }

        let headers = Headers::decode(protected_bytes, unprotected_bytes)?;
        Ok(Self { headers, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_signature_cannot_be_encoded() {
        let sig = Signature::new(Headers::new());
        assert!(matches!(sig.encode(), Err(Error::NoSignatures)));
    }

    #[test]
    fn signed_signature_round_trips_through_cbor() {
        let mut headers = Headers::new();
        headers.set_alg(crate::algorithm::EDDSA);
        let mut sig = Signature::new(headers);
        sig.signature = vec![7u8; 64];

        let encoded = sig.encode().unwrap();
        let decoded = Signature::decode(&encoded).unwrap();
        assert_eq!(decoded.signature, sig.signature);
        assert_eq!(decoded.headers.alg().unwrap(), crate::algorithm::EDDSA);
    }

    #[test]
    fn wrong_array_length_is_rejected() {
        let mut e = minicbor::Encoder::new(Vec::new());
        e.array(2).unwrap();
        e.bytes(&[]).unwrap();
        e.bytes(&[]).unwrap();
        let bytes = e.into_writer();
        assert!(matches!(Signature::decode(&bytes), Err(Error::Malformed(_))));
    }
}
