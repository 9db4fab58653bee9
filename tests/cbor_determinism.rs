//! Integration test for the deterministic binary-string length rewrite
//! (RFC 8949 §4.2.1 shortest-form length headers).

use cose_core::cbor;

#[test]
fn non_minimal_length_header_is_rewritten_to_shortest_form() {
    // `59 00 17` is a uint16-length bstr header declaring a 23-byte value;
    // the minimal encoding for a 23-byte bstr is the single byte `57`
    // (major type 2, additional info 23).
    let mut non_minimal = vec![0x59, 0x00, 0x17];
    let content = vec![0xAA; 23];
    non_minimal.extend_from_slice(&content);

    let inner = cbor::decode_bstr(&non_minimal).unwrap();
    assert_eq!(inner, content);

    let rewritten = cbor::minimize_bstr(&inner);
    assert_eq!(rewritten[0], 0x57);
    assert_eq!(&rewritten[1..], content.as_slice());
}
