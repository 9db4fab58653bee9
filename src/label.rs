//! Header and key parameter labels (`spec.md` §3: "Label").

use crate::cbor;
use crate::error::{Error, Result};

/// A header or key-parameter label: either a signed integer or a text
/// string. Any other CBOR major type is a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// An integer label, e.g. `1` for `alg`.
    Int(i64),
    /// A string label, used by private/extension parameters.
    Text(String),
}

impl Label {
    /// The well-known `alg` label.
    pub const ALG: Self = Self::Int(1);
    /// The well-known `crit` label.
    pub const CRIT: Self = Self::Int(2);
    /// The well-known `content type` label.
    pub const CONTENT_TYPE: Self = Self::Int(3);
    /// The well-known `kid` label.
    pub const KID: Self = Self::Int(4);
    /// The well-known `IV` label.
    pub const IV: Self = Self::Int(5);
    /// The well-known `Partial IV` label.
    pub const PARTIAL_IV: Self = Self::Int(6);
    /// The well-known `counter signature` label.
    pub const COUNTER_SIGNATURE: Self = Self::Int(7);
    /// The well-known `CWT Claims` label.
    pub const CWT_CLAIMS: Self = Self::Int(15);
    /// Hash Envelope: `PayloadHashAlgorithm`.
    pub const PAYLOAD_HASH_ALG: Self = Self::Int(258);
    /// Hash Envelope: `PayloadPreimageContentType`.
    pub const PAYLOAD_PREIMAGE_CONTENT_TYPE: Self = Self::Int(259);
    /// Hash Envelope: `PayloadLocation`.
    pub const PAYLOAD_LOCATION: Self = Self::Int(260);

    /// Encode this label deterministically.
    ///
    /// # Errors
    /// Propagates any (unexpected) `minicbor` encode error.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut e = minicbor::Encoder::new(Vec::new());
        match self {
            Self::Int(i) => {
                e.i64(*i)?;
            },
            Self::Text(s) => {
                e.str(s)?;
            },
        }
        Ok(e.into_writer())
    }

    /// Decode a label from a single pre-sliced CBOR value (an entry from
    /// [`cbor::decode_map_strict`]).
    ///
    /// # Errors
    /// [`Error::Malformed`] if `bytes` is neither an integer nor a text
    /// string.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(bytes);
        match d.datatype()? {
            minicbor::data::Type::U8
            | minicbor::data::Type::U16
            | minicbor::data::Type::U32
            | minicbor::data::Type::U64
            | minicbor::data::Type::I8
            | minicbor::data::Type::I16
            | minicbor::data::Type::I32
            | minicbor::data::Type::I64 => Ok(Self::Int(d.i64()?)),
            minicbor::data::Type::String => Ok(Self::Text(d.str()?.to_string())),
            other => Err(Error::malformed(format!(
                "label must be int or tstr, got {other:?}"
            ))),
        }
    }
}

impl From<i64> for Label {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

pub(crate) fn encode_sorted_entries(
    mut pairs: Vec<(Label, Vec<u8>)>,
) -> Result<Vec<cbor::MapEntry>> {
    pairs
        .drain(..)
        .map(|(label, value)| {
            Ok(cbor::MapEntry {
                key: label.encode()?,
                value,
            })
        })
        .collect()
}
