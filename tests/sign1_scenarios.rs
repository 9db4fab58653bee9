//! Integration tests for `COSE_Sign1` signing/decoding edge cases.

use cose_core::headers::Headers;
use cose_core::label::Label;
use cose_core::message::Sign1Message;
use cose_core::value::Value;

#[test]
fn detached_payload_is_rejected_at_sign() {
    let mut headers = Headers::new();
    headers.set_alg(cose_core::algorithm::ES256);
    let mut msg = Sign1Message::new(headers, None);
    let signing_key = p256::ecdsa::SigningKey::from_slice(&[3u8; 32]).unwrap();
    let signer = cose_core::sign::ecdsa::EcdsaSigner::P256(signing_key);
    let mut rng = rand::rngs::OsRng;
    let err = msg.sign(&signer, &mut rng, &[]).unwrap_err();
    assert!(matches!(err, cose_core::Error::Malformed(_)));
    assert!(msg.signature.is_empty());
}

#[test]
fn iv_and_partial_iv_in_opposite_maps_is_rejected() {
    let mut headers = Headers::new();
    headers.set_alg(cose_core::algorithm::ES256);
    headers.protected.0.set(Label::IV, Value::Bytes(vec![]));
    headers
        .unprotected
        .0
        .set(Label::PARTIAL_IV, Value::Bytes(vec![]));
    let mut msg = Sign1Message::new(headers, Some(b"foo".to_vec()));
    let signing_key = p256::ecdsa::SigningKey::from_slice(&[4u8; 32]).unwrap();
    let signer = cose_core::sign::ecdsa::EcdsaSigner::P256(signing_key);
    let mut rng = rand::rngs::OsRng;
    let err = msg.sign(&signer, &mut rng, &[]).unwrap_err();
    assert!(matches!(err, cose_core::Error::Malformed(_)));
}

#[test]
fn empty_protected_header_decodes_to_zero_length_bstr() {
    let bytes = [
        0xd2, 0x84, 0x40, 0xa0, 0x4c, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x20, 0x77, 0x6f, 0x72, 0x6c,
        0x64, 0x41, 0x00,
    ];
    let decoded = Sign1Message::decode(&bytes).unwrap();
    assert!(decoded.headers.protected.0.is_empty());
    assert_eq!(decoded.headers.raw_protected, Some(vec![0x40]));
}
