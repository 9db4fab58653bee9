//! Signs and verifies a `COSE_Sign1` message end to end: builds headers,
//! signs a payload with an Ed25519 key, encodes the result, decodes it back,
//! and verifies it. Run with `cargo run --example sign_and_verify`.

use cose_core::sign::eddsa::{EddsaSigner, EddsaVerifier};
use cose_core::{Headers, Sign1Message};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A fixed seed keeps this example reproducible; real callers load key
    // material from a keystore or HSM instead.
    let seed = [0x42u8; 32];
    let signer = EddsaSigner::from_seed(&seed)?;
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
    let verifier = EddsaVerifier::from_public(signing_key.verifying_key().as_bytes())?;

    let mut message = Sign1Message::new(Headers::new(), Some(b"hello, COSE".to_vec()));
    let mut rng = rand::rngs::OsRng;
    message.sign(&signer, &mut rng, &[])?;

    let encoded = message.encode()?;
    println!("COSE_Sign1: {} bytes, {}", encoded.len(), hex::encode(&encoded));

    let decoded = Sign1Message::decode(&encoded)?;
    decoded.verify(&verifier, &[], &[])?;
    println!("verified payload: {:?}", decoded.payload.map(|p| String::from_utf8_lossy(&p).into_owned()));

    Ok(())
}
