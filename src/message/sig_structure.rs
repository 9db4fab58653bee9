//! `Sig_structure` / `ToBeSigned` construction (RFC 8152 §4.4, RFC 9338),
//! grounded on `cose_sign/helpers.rs::encode_tbs_data` and
//! `builder/cose.rs::make_tbs_data`.

use crate::cbor;
use crate::error::Result;

/// The context string naming which message variant a `Sig_structure`
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// `COSE_Sign1`.
    Signature1,
    /// A `COSE_Signature` inside a `COSE_Sign`.
    Signature,
    /// A traditional (RFC 9338 §3.1) countersignature.
    CounterSignature,
    /// An RFC 9338 §3.2 countersignature including the target's signature(s).
    CounterSignatureV2,
}

impl Context {
    fn as_str(self) -> &'static str {
        match self {
            Self::Signature1 => "Signature1",
            Self::Signature => "Signature",
            Self::CounterSignature => "CounterSignature",
            Self::CounterSignatureV2 => "CounterSignatureV2",
        }
    }
}

/// Build the deterministic CBOR encoding of a `Sig_structure`, i.e. the
/// bytes a [`crate::sign::Signer`]/[`crate::sign::Verifier`] operates on.
///
/// `body_protected` and `sign_protected` are the bstr-*encoded* protected
/// header bytes (e.g. [`crate::headers::Headers::raw_protected`] or
/// [`crate::headers::Headers::encode_protected_bstr`]'s output); their
/// length header is canonicalized here regardless of how it arrived.
/// `sign_protected` is present only for two-layer signatures
/// (`Signature`/`CounterSignature*`). `other_fields` is appended, one bstr
/// per entry, only for [`Context::CounterSignatureV2`].
///
/// # Errors
/// [`crate::error::Error::Malformed`] if `body_protected`/`sign_protected`
/// is not a well-formed bstr, or any (unexpected) `minicbor` encode error.
pub fn build(
    context: Context,
    body_protected: &[u8],
    sign_protected: Option<&[u8]>,
    external_aad: &[u8],
    payload: &[u8],
    other_fields: &[Vec<u8>],
) -> Result<Vec<u8>> {
    let len = 4
        + u64::from(sign_protected.is_some())
        + u64::from(matches!(context, Context::CounterSignatureV2) && !other_fields.is_empty());

    let mut e = minicbor::Encoder::new(Vec::new());
    e.array(len)?;
    e.str(context.as_str())?;
    e.writer_mut()
        .extend_from_slice(&cbor::minimize_bstr(&cbor::decode_bstr(body_protected)?));
    if let Some(sign_protected) = sign_protected {
        e.writer_mut()
            .extend_from_slice(&cbor::minimize_bstr(&cbor::decode_bstr(sign_protected)?));
    }
    e.bytes(external_aad)?;
    e.bytes(payload)?;
    if matches!(context, Context::CounterSignatureV2) && !other_fields.is_empty() {
        if other_fields.len() == 1 {
            #[allow(clippy::indexing_slicing)]
            e.writer_mut().extend_from_slice(&other_fields[0]);
        } else {
            e.array(other_fields.len() as u64)?;
            for field in other_fields {
                e.writer_mut().extend_from_slice(field);
            }
        }
    }
    Ok(e.into_writer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature1_has_four_elements() {
        let tbs = build(Context::Signature1, &[0x40], None, &[], b"hello", &[]).unwrap();
        let mut d = minicbor::Decoder::new(&tbs);
        assert_eq!(d.array().unwrap(), Some(4));
    }

    #[test]
    fn signature_has_five_elements_with_sign_protected() {
        let tbs = build(
            Context::Signature,
            &[0x40],
            Some(&[0x40]),
            &[],
            b"hello",
            &[],
        )
        .unwrap();
        let mut d = minicbor::Decoder::new(&tbs);
        assert_eq!(d.array().unwrap(), Some(5));
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let a = build(Context::Signature1, &[0x40], None, &[], b"x", &[]).unwrap();
        let b = build(Context::Signature1, &[0x40], None, &[], b"x", &[]).unwrap();
        assert_eq!(a, b);
    }
}
