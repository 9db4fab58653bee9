//! The message codec: `Sig_structure` construction and the
//! `Sign1`/`Sign`/`COSE_Signature` wire shapes (`spec.md` §4.6).

pub mod sig_structure;
pub mod sign;
pub mod sign1;
pub mod signature;

pub use sig_structure::Context;
pub use sign::SignMessage;
pub use sign1::{Sign1Message, UntaggedSign1Message};
pub use signature::Signature;
