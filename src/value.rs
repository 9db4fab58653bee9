//! The typed [`Value`] union stored against a [`crate::label::Label`] in
//! headers and key parameters (`spec.md` §9, "Heterogeneous maps").

use crate::error::{Error, Result};

/// A header or key-parameter value.
///
/// Covers every shape the well-known parameters need plus an opaque `Raw`
/// catch-all so unrecognized values round-trip byte-for-byte without this
/// crate having to understand them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A signed integer.
    Int(i64),
    /// An unsigned integer, kept distinct from `Int` so re-encoding picks
    /// the unsigned major type for values the caller set as `u64`.
    Uint(u64),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A text string.
    Text(String),
    /// A boolean.
    Bool(bool),
    /// An array of values.
    Array(Vec<Value>),
    /// A nested map of (already-encoded) label bytes to values, used for
    /// `CWT Claims` and other structured parameters.
    Map(Vec<(crate::label::Label, Value)>),
    /// An opaque, already-encoded CBOR item, preserved verbatim. Used when
    /// decoding a value this crate has no typed representation for.
    Raw(Vec<u8>),
}

impl Value {
    /// Encode this value.
    ///
    /// # Errors
    /// Propagates any (unexpected) `minicbor` encode error.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Raw(bytes) => Ok(bytes.clone()),
            _ => {
                let mut e = minicbor::Encoder::new(Vec::new());
                self.encode_into(&mut e)?;
                Ok(e.into_writer())
            },
        }
    }

    fn encode_into(&self, e: &mut minicbor::Encoder<Vec<u8>>) -> Result<()> {
        match self {
            Self::Int(i) => {
                e.i64(*i)?;
            },
            Self::Uint(u) => {
                e.u64(*u)?;
            },
            Self::Bytes(b) => {
                e.bytes(b)?;
            },
            Self::Text(t) => {
                e.str(t)?;
            },
            Self::Bool(b) => {
                e.bool(*b)?;
            },
            Self::Array(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode_into(e)?;
                }
            },
            Self::Map(pairs) => {
                let entries = crate::label::encode_sorted_entries(
                    pairs
                        .iter()
                        .map(|(l, v)| Ok((l.clone(), v.encode()?)))
                        .collect::<Result<Vec<_>>>()?,
                )?;
                let encoded = crate::cbor::encode_map_canonical(entries);
                e.writer_mut().extend_from_slice(&encoded);
            },
            Self::Raw(bytes) => {
                e.writer_mut().extend_from_slice(bytes);
            },
        }
        Ok(())
    }

    /// Decode a value from a single pre-sliced CBOR item.
    ///
    /// # Errors
    /// [`Error::Malformed`] if `bytes` is not a well-formed single CBOR
    /// item, or contains a disallowed CBOR tag.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(bytes);
        let value = decode_one(&mut d, bytes)?;
        Ok(value)
    }

    /// View this value as a byte string, if it is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// View this value as a signed integer, accepting both `Int` and
    /// in-range `Uint`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Uint(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// View this value as a text string, if it is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// View this value as an array, if it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

fn decode_one(d: &mut minicbor::Decoder<'_>, bytes: &[u8]) -> Result<Value> {
    use minicbor::data::Type;
    let start = d.position();
    let ty = d.datatype()?;
    let value = match ty {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => Value::Uint(d.u64()?),
        Type::I8 | Type::I16 | Type::I32 | Type::I64 => Value::Int(d.i64()?),
        Type::Bytes => Value::Bytes(d.bytes()?.to_vec()),
        Type::String => Value::Text(d.str()?.to_string()),
        Type::Bool => Value::Bool(d.bool()?),
        Type::Array => {
            let len = d
                .array()?
                .ok_or_else(|| Error::malformed("indefinite-length arrays are not allowed"))?;
            let mut items = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
            for _ in 0..len {
                items.push(decode_one(d, bytes)?);
            }
            Value::Array(items)
        },
        Type::Map => {
            let inner_start = start;
            d.skip()?;
            let inner_end = d.position();
            let inner = bytes
                .get(inner_start..inner_end)
                .ok_or_else(|| Error::malformed("map value out of range"))?;
            let entries = crate::cbor::decode_map_strict(inner)?;
            let mut pairs = Vec::with_capacity(entries.len());
            for entry in entries {
                pairs.push((
                    crate::label::Label::decode(&entry.key)?,
                    Value::decode(&entry.value)?,
                ));
            }
            return Ok(Value::Map(pairs));
        },
        Type::Tag => return Err(Error::malformed("CBOR tags are not allowed in this context")),
        _ => {
            d.skip()
                .map_err(|e| Error::malformed(format!("unsupported CBOR value: {e}")))?;
            let end = d.position();
            let raw = bytes
                .get(start..end)
                .ok_or_else(|| Error::malformed("item out of range"))?
                .to_vec();
            Value::Raw(raw)
        },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let v = Value::Bytes(vec![1, 2, 3]);
        let encoded = v.encode().unwrap();
        assert_eq!(Value::decode(&encoded).unwrap(), v);
    }

    #[test]
    fn array_round_trip() {
        let v = Value::Array(vec![Value::Int(-1), Value::Text("x".into())]);
        let encoded = v.encode().unwrap();
        assert_eq!(Value::decode(&encoded).unwrap(), v);
    }

    #[test]
    fn tags_are_rejected() {
        let tagged = [0xc1, 0x00]; // tag 1 wrapping 0
        assert!(Value::decode(&tagged).is_err());
    }

    #[test]
    fn unsupported_type_round_trips_as_raw() {
        let null_bytes = vec![0xf6]; // CBOR null literal, major type 7
        let decoded = Value::decode(&null_bytes).unwrap();
        assert_eq!(decoded, Value::Raw(null_bytes.clone()));
        assert_eq!(decoded.encode().unwrap(), null_bytes);
    }
}
