//! The `CWT Claims` (label 15) sub-map (RFC 8392 §2), embedded inside a
//! COSE protected or unprotected header.

use crate::label::Label;
use crate::value::Value;

/// Typed access to the RFC 8392 claim set, with a pass-through for claims
/// this crate has no typed accessor for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CwtClaims {
    pairs: Vec<(Label, Value)>,
}

impl CwtClaims {
    /// An empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_pairs(pairs: Vec<(Label, Value)>) -> Self {
        Self { pairs }
    }

    pub(crate) fn to_pairs(&self) -> Vec<(Label, Value)> {
        self.pairs.clone()
    }

    fn get_text(&self, claim: i64) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(l, _)| *l == Label::Int(claim))
            .and_then(|(_, v)| v.as_text())
    }

    fn get_int(&self, claim: i64) -> Option<i64> {
        self.pairs
            .iter()
            .find(|(l, _)| *l == Label::Int(claim))
            .and_then(|(_, v)| v.as_int())
    }

    fn set(&mut self, claim: i64, value: Value) {
        if let Some(slot) = self.pairs.iter_mut().find(|(l, _)| *l == Label::Int(claim)) {
            slot.1 = value;
        } else {
            self.pairs.push((Label::Int(claim), value));
        }
    }

    /// `iss` (1): issuer.
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.get_text(1)
    }

    /// Set `iss` (1).
    pub fn set_iss(&mut self, iss: impl Into<String>) {
        self.set(1, Value::Text(iss.into()));
    }

    /// `sub` (2): subject.
    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.get_text(2)
    }

    /// Set `sub` (2).
    pub fn set_sub(&mut self, sub: impl Into<String>) {
        self.set(2, Value::Text(sub.into()));
    }

    /// `aud` (3): audience.
    #[must_use]
    pub fn aud(&self) -> Option<&str> {
        self.get_text(3)
    }

    /// Set `aud` (3).
    pub fn set_aud(&mut self, aud: impl Into<String>) {
        self.set(3, Value::Text(aud.into()));
    }

    /// `exp` (4): expiration time, seconds since the Unix epoch.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        self.get_int(4)
    }

    /// Set `exp` (4).
    pub fn set_exp(&mut self, exp: i64) {
        self.set(4, Value::Int(exp));
    }

    /// `nbf` (5): not-before time, seconds since the Unix epoch.
    #[must_use]
    pub fn nbf(&self) -> Option<i64> {
        self.get_int(5)
    }

    /// Set `nbf` (5).
    pub fn set_nbf(&mut self, nbf: i64) {
        self.set(5, Value::Int(nbf));
    }

    /// `iat` (6): issued-at time, seconds since the Unix epoch.
    #[must_use]
    pub fn iat(&self) -> Option<i64> {
        self.get_int(6)
    }

    /// Set `iat` (6).
    pub fn set_iat(&mut self, iat: i64) {
        self.set(6, Value::Int(iat));
    }

    /// `cti` (7): CWT ID, an opaque byte string.
    #[must_use]
    pub fn cti(&self) -> Option<&[u8]> {
        self.pairs
            .iter()
            .find(|(l, _)| *l == Label::Int(7))
            .and_then(|(_, v)| v.as_bytes())
    }

    /// Set `cti` (7).
    pub fn set_cti(&mut self, cti: impl Into<Vec<u8>>) {
        self.set(7, Value::Bytes(cti.into()));
    }

    /// Every claim present, including unrecognized ones, in insertion
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = &(Label, Value)> {
        self.pairs.iter()
    }

    /// Set an arbitrary (typically unrecognized) integer-labeled claim.
    pub fn set_raw(&mut self, claim: i64, value: Value) {
        self.set(claim, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_round_trip() {
        let mut claims = CwtClaims::new();
        claims.set_iss("issuer");
        claims.set_exp(1_700_000_000);
        claims.set_cti(vec![1, 2, 3]);
        assert_eq!(claims.iss(), Some("issuer"));
        assert_eq!(claims.exp(), Some(1_700_000_000));
        assert_eq!(claims.cti(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn unrecognized_claims_pass_through() {
        let mut claims = CwtClaims::new();
        claims.set_raw(100, Value::Text("extension".into()));
        let pairs = claims.to_pairs();
        assert_eq!(pairs, vec![(Label::Int(100), Value::Text("extension".into()))]);
    }
}
