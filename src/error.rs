//! Errors returned by this crate.

use displaydoc::Display;
use thiserror::Error;

/// Errors that can occur while building, encoding, decoding, signing or
/// verifying COSE messages, headers and keys.
#[derive(Display, Error, Debug)]
pub enum Error {
    /// declared header `alg` ({0}) disagrees with the signer/verifier algorithm ({1})
    AlgorithmMismatch(String, String),
    /// headers do not set the `alg` parameter
    AlgorithmNotFound,
    /// algorithm {0} is recognized but not supported by this implementation: {1}
    AlgorithmNotSupported(String, String),
    /// algorithm id {0} is already registered
    AlgorithmRegistered(i64),
    /// invalid algorithm value: {0}
    InvalidAlgorithm(String),
    /// unknown algorithm value {0}
    UnknownAlgorithm(i64),
    /// hash function for algorithm {0} is not available
    UnavailableHashFunc(String),
    /// invalid key: {0}
    InvalidKey(String),
    /// invalid public key: {0}
    InvalidPubKey(String),
    /// invalid private key: {0}
    InvalidPrivKey(String),
    /// EC2 key has no public coordinates
    Ec2NoPub,
    /// OKP key has no public component
    OkpNoPub,
    /// key is not a private key
    NotPrivKey,
    /// key operation {0} is not permitted by this key's `key_ops`
    OpNotSupported(String),
    /// `Sign`/`Verify` called on a `SignMessage` with no signatures
    NoSignatures,
    /// signature verification failed
    Verification,
    /// MAC/HMAC authentication failed
    Authentication,
    /// malformed COSE structure: {0}
    Malformed(String),
}

impl Error {
    /// Build a [`Error::Malformed`] from a `Display`-able context.
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

impl From<minicbor::encode::Error<core::convert::Infallible>> for Error {
    fn from(e: minicbor::encode::Error<core::convert::Infallible>) -> Self {
        Self::Malformed(format!("CBOR encode error: {e}"))
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(e: minicbor::decode::Error) -> Self {
        Self::Malformed(format!("CBOR decode error: {e}"))
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;
