//! The two-tier protected/unprotected header model (`spec.md` §3, §4.3).

pub mod cwt;

use crate::cbor;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::value::Value;

pub use cwt::CwtClaims;

/// An ordered (label, value) parameter set, shared by [`ProtectedHeader`]
/// and [`UnprotectedHeader`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap(Vec<(Label, Value)>);

impl ParamMap {
    /// An empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a label.
    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&Value> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }

    /// Set a label's value, overwriting any previous value for that label.
    pub fn set(&mut self, label: Label, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(l, _)| *l == label) {
            slot.1 = value;
        } else {
            self.0.push((label, value));
        }
    }

    /// Remove a label, returning its prior value.
    pub fn remove(&mut self, label: &Label) -> Option<Value> {
        let pos = self.0.iter().position(|(l, _)| l == label)?;
        Some(self.0.remove(pos).1)
    }

    /// Whether `label` is present.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.get(label).is_some()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (label, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Label, Value)> {
        self.0.iter()
    }

    /// Encode as deterministic CBOR bytes of a map (`0xa0` if empty).
    ///
    /// # Errors
    /// Propagates encode errors from any contained [`Value`].
    pub fn encode_map(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::with_capacity(self.0.len());
        for (label, value) in &self.0 {
            entries.push(cbor::MapEntry {
                key: label.encode()?,
                value: value.encode()?,
            });
        }
        Ok(cbor::encode_map_canonical(entries))
    }

    /// Decode from raw CBOR map bytes, using strict/deterministic decode.
    ///
    /// # Errors
    /// [`Error::Malformed`] for any deterministic-decode violation, or if a
    /// label/value fails to parse.
    pub fn decode_map(bytes: &[u8]) -> Result<Self> {
        let entries = cbor::decode_map_strict(bytes)?;
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            pairs.push((Label::decode(&entry.key)?, Value::decode(&entry.value)?));
        }
        Ok(Self(pairs))
    }
}

/// The protected header map: covered by the signature, serialized as a
/// bstr-wrapped deterministic CBOR map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtectedHeader(pub ParamMap);

/// The unprotected header map: not covered by the signature, serialized as
/// a plain CBOR map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnprotectedHeader(pub ParamMap);

/// Both header maps plus the raw bytes preserved across a decode, so
/// verification recomputes `Sig_structure` from the exact bytes a producer
/// sent rather than a freshly re-encoded (and possibly different) map.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    /// The protected parameter map.
    pub protected: ProtectedHeader,
    /// The unprotected parameter map.
    pub unprotected: UnprotectedHeader,
    /// The exact bstr bytes decoded for the protected header, if this
    /// `Headers` came from a decode. `Sign` clears this when it must
    /// re-encode protected bytes.
    pub raw_protected: Option<Vec<u8>>,
    /// The exact map bytes decoded for the unprotected header, if any.
    pub raw_unprotected: Option<Vec<u8>>,
}

impl Headers {
    /// A fresh, empty header bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the protected header as a bstr: `h''` if empty, otherwise the
    /// deterministic map wrapped as a byte string.
    ///
    /// # Errors
    /// Propagates [`ParamMap::encode_map`] errors.
    pub fn encode_protected_bstr(&self) -> Result<Vec<u8>> {
        if self.protected.0.is_empty() {
            return Ok(vec![0x40]);
        }
        let map_bytes = self.protected.0.encode_map()?;
        Ok(cbor::minimize_bstr(&map_bytes))
    }

    /// Encode the unprotected header as a plain CBOR map.
    ///
    /// # Errors
    /// Propagates [`ParamMap::encode_map`] errors.
    pub fn encode_unprotected_map(&self) -> Result<Vec<u8>> {
        self.unprotected.0.encode_map()
    }

    /// Decode both header maps from raw bytes (the protected bstr and the
    /// unprotected map), preserving the raw protected bytes for later
    /// `Sig_structure` reconstruction, and running header validation.
    ///
    /// # Errors
    /// [`Error::Malformed`] on any shape violation; other [`Error`] variants
    /// for typed-parameter or invariant violations.
    pub fn decode(protected_bstr: &[u8], unprotected_map: &[u8]) -> Result<Self> {
        let inner = cbor::decode_bstr(protected_bstr)?;
        let protected = if inner.is_empty() {
            ParamMap::new()
        } else {
            ParamMap::decode_map(&inner)?
        };
        let unprotected = if unprotected_map == [0xa0] {
            ParamMap::new()
        } else {
            ParamMap::decode_map(unprotected_map)?
        };
        let headers = Self {
            protected: ProtectedHeader(protected),
            unprotected: UnprotectedHeader(unprotected),
            raw_protected: Some(cbor::minimize_bstr(&inner)),
            raw_unprotected: Some(unprotected_map.to_vec()),
        };
        if let Err(e) = headers.validate() {
            tracing::debug!(error = %e, "rejected headers during decode");
            return Err(e);
        }
        Ok(headers)
    }

    /// Validate this bundle against `spec.md` §3/§4.3's invariants:
    /// label typing, the IV/PartialIV mutex, `alg` cross-map agreement, and
    /// well-known parameter value types. Does not run the `crit`
    /// verifier-extension check (see [`Headers::check_critical`]).
    ///
    /// # Errors
    /// [`Error::Malformed`] describing the specific violation.
    pub fn validate(&self) -> Result<()> {
        let has_iv_protected = self.protected.0.contains(&Label::IV);
        let has_iv_unprotected = self.unprotected.0.contains(&Label::IV);
        let has_piv_protected = self.protected.0.contains(&Label::PARTIAL_IV);
        let has_piv_unprotected = self.unprotected.0.contains(&Label::PARTIAL_IV);
        let has_iv = has_iv_protected || has_iv_unprotected;
        let has_piv = has_piv_protected || has_piv_unprotected;
        if has_iv && has_piv {
            return Err(Error::malformed(
                "IV and PartialIV parameters must not both be present",
            ));
        }

        for (label, value) in self.protected.0.iter().chain(self.unprotected.0.iter()) {
            check_well_known_type(label, value)?;
        }

        if let (Some(p), Some(u)) = (
            self.protected.0.get(&Label::ALG),
            self.unprotected.0.get(&Label::ALG),
        ) {
            if p != u {
                return Err(Error::malformed(
                    "alg must not differ between protected and unprotected maps",
                ));
            }
        }

        if let Some(Value::Array(crit)) = self.protected.0.get(&Label::CRIT) {
            if crit.is_empty() {
                return Err(Error::malformed("crit must be a non-empty array"));
            }
            for entry in crit {
                let label = value_to_label(entry)?;
                if let Label::Int(i) = &label {
                    if (0..=7).contains(i) {
                        return Err(Error::malformed(format!(
                            "crit must not name well-known label {i}"
                        )));
                    }
                }
                if !self.protected.0.contains(&label) {
                    return Err(Error::malformed(
                        "crit names a label absent from the protected map",
                    ));
                }
            }
        } else if self.protected.0.contains(&Label::CRIT) {
            return Err(Error::malformed("crit must be an array"));
        }

        Ok(())
    }

    /// Run the critical-parameter algorithm (`spec.md` §4.3): every label in
    /// `crit` must be either one of the well-known labels or present in
    /// `known_extensions`.
    ///
    /// # Errors
    /// [`Error::Malformed`] naming the unrecognized critical label.
    pub fn check_critical(&self, known_extensions: &[Label]) -> Result<()> {
        let Some(Value::Array(crit)) = self.protected.0.get(&Label::CRIT) else {
            return Ok(());
        };
        for entry in crit {
            let label = value_to_label(entry)?;
            if !is_well_known(&label) && !known_extensions.contains(&label) {
                tracing::warn!(?label, "rejecting message with unrecognized critical header");
                return Err(Error::malformed(format!(
                    "unrecognized critical header {label:?}"
                )));
            }
        }
        Ok(())
    }

    /// The `alg` (1) parameter, preferring the protected map.
    ///
    /// # Errors
    /// [`Error::AlgorithmNotFound`] if neither map sets it.
    pub fn alg(&self) -> Result<i64> {
        self.protected
            .0
            .get(&Label::ALG)
            .or_else(|| self.unprotected.0.get(&Label::ALG))
            .and_then(Value::as_int)
            .ok_or(Error::AlgorithmNotFound)
    }

    /// Set `alg` (1) in the protected map.
    pub fn set_alg(&mut self, id: i64) {
        self.protected.0.set(Label::ALG, Value::Int(id));
    }

    /// The `kid` (4) parameter, preferring the protected map.
    #[must_use]
    pub fn kid(&self) -> Option<&[u8]> {
        self.protected
            .0
            .get(&Label::KID)
            .or_else(|| self.unprotected.0.get(&Label::KID))
            .and_then(Value::as_bytes)
    }

    /// Set `kid` (4) in the protected map.
    pub fn set_kid(&mut self, kid: impl Into<Vec<u8>>) {
        self.protected.0.set(Label::KID, Value::Bytes(kid.into()));
    }

    /// The `content type` (3) parameter.
    #[must_use]
    pub fn content_type(&self) -> Option<&Value> {
        self.protected
            .0
            .get(&Label::CONTENT_TYPE)
            .or_else(|| self.unprotected.0.get(&Label::CONTENT_TYPE))
    }

    /// The `IV` (5) parameter, from whichever map carries it.
    #[must_use]
    pub fn iv(&self) -> Option<&[u8]> {
        self.protected
            .0
            .get(&Label::IV)
            .or_else(|| self.unprotected.0.get(&Label::IV))
            .and_then(Value::as_bytes)
    }

    /// The `Partial IV` (6) parameter, from whichever map carries it.
    #[must_use]
    pub fn partial_iv(&self) -> Option<&[u8]> {
        self.protected
            .0
            .get(&Label::PARTIAL_IV)
            .or_else(|| self.unprotected.0.get(&Label::PARTIAL_IV))
            .and_then(Value::as_bytes)
    }

    /// The embedded `CWT Claims` (15) sub-map, if present.
    ///
    /// # Errors
    /// [`Error::Malformed`] if label 15 is present but not a map.
    pub fn cwt_claims(&self) -> Result<Option<CwtClaims>> {
        let Some(value) = self
            .protected
            .0
            .get(&Label::CWT_CLAIMS)
            .or_else(|| self.unprotected.0.get(&Label::CWT_CLAIMS))
        else {
            return Ok(None);
        };
        let Value::Map(pairs) = value else {
            return Err(Error::malformed("CWT Claims value must be a map"));
        };
        Ok(Some(CwtClaims::from_pairs(pairs.clone())))
    }

    /// Set the `CWT Claims` (15) sub-map in the protected map.
    pub fn set_cwt_claims(&mut self, claims: &CwtClaims) {
        self.protected
            .0
            .set(Label::CWT_CLAIMS, Value::Map(claims.to_pairs()));
    }

    /// Hash Envelope: `PayloadHashAlgorithm` (258), protected-only.
    #[must_use]
    pub fn payload_hash_alg(&self) -> Option<i64> {
        self.protected.0.get(&Label::PAYLOAD_HASH_ALG).and_then(Value::as_int)
    }

    /// Hash Envelope: `PayloadPreimageContentType` (259).
    #[must_use]
    pub fn payload_preimage_content_type(&self) -> Option<&Value> {
        self.protected
            .0
            .get(&Label::PAYLOAD_PREIMAGE_CONTENT_TYPE)
            .or_else(|| self.unprotected.0.get(&Label::PAYLOAD_PREIMAGE_CONTENT_TYPE))
    }

    /// Hash Envelope: `PayloadLocation` (260), protected-only.
    #[must_use]
    pub fn payload_location(&self) -> Option<&str> {
        self.protected
            .0
            .get(&Label::PAYLOAD_LOCATION)
            .and_then(Value::as_text)
    }
}

fn is_well_known(label: &Label) -> bool {
    matches!(label, Label::Int(i) if (1..=7).contains(i) || *i == 15 || (258..=260).contains(i))
}

fn value_to_label(value: &Value) -> Result<Label> {
    match value {
        Value::Int(i) => Ok(Label::Int(*i)),
        Value::Uint(u) => Ok(Label::Int(i64::try_from(*u).map_err(|_| {
            Error::malformed("crit entry out of i64 range")
        })?)),
        Value::Text(t) => Ok(Label::Text(t.clone())),
        _ => Err(Error::malformed("crit entries must be int or tstr labels")),
    }
}

fn check_well_known_type(label: &Label, value: &Value) -> Result<()> {
    match label {
        Label::Int(1) => {
            if !matches!(value, Value::Int(_) | Value::Uint(_) | Value::Text(_)) {
                return Err(Error::malformed("alg must be int or tstr"));
            }
        },
        Label::Int(2) => {
            if !matches!(value, Value::Array(_)) {
                return Err(Error::malformed("crit must be an array"));
            }
        },
        Label::Int(3) => {
            if !matches!(value, Value::Uint(_) | Value::Int(_) | Value::Text(_)) {
                return Err(Error::malformed("content type must be uint or tstr"));
            }
        },
        Label::Int(4 | 5 | 6) => {
            if !matches!(value, Value::Bytes(_)) {
                return Err(Error::malformed("kid/IV/PartialIV must be bstr"));
            }
        },
        Label::Int(15) => {
            if !matches!(value, Value::Map(_)) {
                return Err(Error::malformed("CWT Claims must be a map"));
            }
        },
        Label::Int(258) => {
            if !matches!(value, Value::Int(_) | Value::Uint(_)) {
                return Err(Error::malformed("PayloadHashAlgorithm must be int"));
            }
        },
        Label::Int(259) => {
            if !matches!(value, Value::Uint(_) | Value::Text(_)) {
                return Err(Error::malformed(
                    "PayloadPreimageContentType must be uint or tstr",
                ));
            }
        },
        Label::Int(260) => {
            if !matches!(value, Value::Text(_)) {
                return Err(Error::malformed("PayloadLocation must be tstr"));
            }
        },
        _ => {},
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_protected_is_zero_length_bstr() {
        let headers = Headers::new();
        assert_eq!(headers.encode_protected_bstr().unwrap(), vec![0x40]);
    }

    #[test]
    fn iv_partial_iv_mutex_is_rejected() {
        let mut headers = Headers::new();
        headers.protected.0.set(Label::IV, Value::Bytes(vec![]));
        headers
            .unprotected
            .0
            .set(Label::PARTIAL_IV, Value::Bytes(vec![]));
        assert!(headers.validate().is_err());
    }

    #[test]
    fn crit_rejects_well_known_range() {
        let mut headers = Headers::new();
        headers.protected.0.set(Label::ALG, Value::Int(-7));
        headers
            .protected
            .0
            .set(Label::CRIT, Value::Array(vec![Value::Int(1)]));
        assert!(headers.validate().is_err());
    }

    #[test]
    fn crit_requires_presence_in_protected() {
        let mut headers = Headers::new();
        headers
            .protected
            .0
            .set(Label::CRIT, Value::Array(vec![Value::Int(100)]));
        assert!(headers.validate().is_err());
    }

    #[test]
    fn check_critical_accepts_advertised_extension() {
        let mut headers = Headers::new();
        headers.protected.0.set(Label::Int(100), Value::Bool(true));
        headers
            .protected
            .0
            .set(Label::CRIT, Value::Array(vec![Value::Int(100)]));
        assert!(headers.check_critical(&[]).is_err());
        assert!(headers.check_critical(&[Label::Int(100)]).is_ok());
    }

    #[test]
    fn alg_disagreement_across_maps_is_rejected() {
        let mut headers = Headers::new();
        headers.protected.0.set(Label::ALG, Value::Int(-7));
        headers.unprotected.0.set(Label::ALG, Value::Int(-8));
        assert!(headers.validate().is_err());
    }
}
