//! CBOR Object Signing and Encryption (COSE): `COSE_Sign`/`COSE_Sign1`
//! message codec, the two-tier header model, `COSE_Key`, the IANA algorithm
//! registry, the RFC 9338 countersignature engine, and the Hash Envelope
//! extension.
//!
//! Concrete cryptographic primitives and CBOR encode/decode primitives are
//! external collaborators: this crate consumes them through the
//! [`sign::Signer`]/[`sign::Verifier`]/[`sign::Tagger`] capability traits and
//! an internal deterministic/strict CBOR discipline layered on `minicbor`.

pub mod algorithm;
pub mod cbor;
pub mod countersign;
pub mod error;
pub mod hash_envelope;
pub mod headers;
pub mod key;
pub mod label;
pub mod message;
pub mod sign;
pub mod value;

pub use error::{Error, Result};
pub use headers::{Headers, ProtectedHeader, UnprotectedHeader};
pub use key::{Key, KeyOps, KeyType};
pub use label::Label;
pub use message::{Context, SignMessage, Sign1Message, Signature, UntaggedSign1Message};
pub use value::Value;
