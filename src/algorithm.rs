//! The IANA COSE-Algorithms registry: identifiers, canonical names and the
//! associated hash function, plus an extension-registration hook.
//!
//! See [RFC 8152 §8](https://datatracker.ietf.org/doc/html/rfc8152#section-8)
//! and the IANA "COSE Algorithms" registry.

use std::{
    collections::HashMap,
    sync::{OnceLock, RwLock},
};

use crate::error::{Error, Result};

/// `ES256`, as per the IANA COSE Algorithms registry.
pub const ES256: i64 = -7;
/// `ES384`.
pub const ES384: i64 = -35;
/// `ES512`.
pub const ES512: i64 = -36;
/// `EdDSA`.
pub const EDDSA: i64 = -8;
/// `PS256`.
pub const PS256: i64 = -37;
/// `PS384`.
pub const PS384: i64 = -38;
/// `PS512`.
pub const PS512: i64 = -39;
/// `HMAC 256/64` (truncated tag).
pub const HMAC_256_64: i64 = 4;
/// `HMAC 256/256`.
pub const HMAC_256_256: i64 = 5;
/// `HMAC 384/384`.
pub const HMAC_384_384: i64 = 6;
/// `HMAC 512/512`.
pub const HMAC_512_512: i64 = 7;
/// `RS256`.
pub const RS256: i64 = -257;
/// `RS384`.
pub const RS384: i64 = -258;
/// `RS512`.
pub const RS512: i64 = -259;
/// The reserved, always-invalid algorithm identifier.
pub const RESERVED: i64 = 0;

/// A cryptographic hash function identifier associated with an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hash {
    /// SHA-256, 32-byte digest.
    Sha256,
    /// SHA-384, 48-byte digest.
    Sha384,
    /// SHA-512, 64-byte digest.
    Sha512,
}

impl Hash {
    /// Digest output size, in bytes.
    #[must_use]
    pub fn output_size(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// A signed integer algorithm identifier (IANA COSE-Algorithms registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Algorithm(i64);

impl Algorithm {
    /// Wrap a raw IANA algorithm identifier.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAlgorithm`] for the reserved value `0`.
    pub fn new(id: i64) -> Result<Self> {
        if id == RESERVED {
            return Err(Error::InvalidAlgorithm("algorithm 0 (Reserved)".into()));
        }
        Ok(Self(id))
    }

    /// The raw IANA algorithm identifier.
    #[must_use]
    pub fn id(self) -> i64 {
        self.0
    }

    /// Canonical name, via the process-wide registry.
    #[must_use]
    pub fn name(self) -> String {
        registry().name(self.0)
    }

    /// Associated hash function, if any, via the process-wide registry.
    ///
    /// # Errors
    /// [`Error::UnknownAlgorithm`] if the id is not registered.
    pub fn hash(self) -> Result<Option<Hash>> {
        registry().hash(self.0)
    }
}

impl From<Algorithm> for i64 {
    fn from(a: Algorithm) -> Self {
        a.0
    }
}

/// A registered algorithm's metadata.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    hash: Option<Hash>,
}

/// Process-wide algorithm registry. Single-writer locked; reads are lock-free
/// once registration settles, per `spec.md` §5's shared-resource policy.
struct Registry {
    entries: RwLock<HashMap<i64, Entry>>,
}

impl Registry {
    fn builtin() -> Self {
        let mut entries = HashMap::new();
        let mut ins = |id: i64, name: &str, hash: Option<Hash>| {
            entries.insert(
                id,
                Entry {
                    name: name.to_string(),
                    hash,
                },
            );
        };
        ins(ES256, "ES256", Some(Hash::Sha256));
        ins(ES384, "ES384", Some(Hash::Sha384));
        ins(ES512, "ES512", Some(Hash::Sha512));
        ins(EDDSA, "EdDSA", None);
        ins(PS256, "PS256", Some(Hash::Sha256));
        ins(PS384, "PS384", Some(Hash::Sha384));
        ins(PS512, "PS512", Some(Hash::Sha512));
        ins(HMAC_256_64, "HMAC 256/64", Some(Hash::Sha256));
        ins(HMAC_256_256, "HMAC 256/256", Some(Hash::Sha256));
        ins(HMAC_384_384, "HMAC 384/384", Some(Hash::Sha384));
        ins(HMAC_512_512, "HMAC 512/512", Some(Hash::Sha512));
        ins(RS256, "RS256", Some(Hash::Sha256));
        ins(RS384, "RS384", Some(Hash::Sha384));
        ins(RS512, "RS512", Some(Hash::Sha512));
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn name(&self, id: i64) -> String {
        #[allow(clippy::unwrap_used)] // poisoned lock is a process-fatal bug, not a user error
        let entries = self.entries.read().unwrap();
        entries
            .get(&id)
            .map_or_else(|| format!("unknown algorithm value {id}"), |e| e.name.clone())
    }

    fn hash(&self, id: i64) -> Result<Option<Hash>> {
        #[allow(clippy::unwrap_used)]
        let entries = self.entries.read().unwrap();
        entries
            .get(&id)
            .map(|e| e.hash)
            .ok_or(Error::UnknownAlgorithm(id))
    }

    /// Register a new algorithm identifier.
    ///
    /// # Errors
    /// [`Error::AlgorithmRegistered`] if `id` is already registered.
    fn register(&self, id: i64, name: String, hash: Option<Hash>) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&id) {
            return Err(Error::AlgorithmRegistered(id));
        }
        entries.insert(id, Entry { name, hash });
        Ok(())
    }
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::builtin)
}

/// Look up an algorithm's canonical name.
///
/// Unknown identifiers stringify as `"unknown algorithm value <n>"` rather
/// than erroring, per `spec.md` §4.1.
#[must_use]
pub fn name(id: i64) -> String {
    registry().name(id)
}

/// Look up an algorithm's associated hash function.
///
/// # Errors
/// [`Error::UnknownAlgorithm`] if `id` has never been registered.
pub fn hash(id: i64) -> Result<Option<Hash>> {
    registry().hash(id)
}

/// Register a new algorithm `(id, name, hash)` atomically.
///
/// # Errors
/// [`Error::AlgorithmRegistered`] if `id` collides with an existing entry.
/// The registry is monotonic: there is no unregistration.
pub fn register(id: i64, name: impl Into<String>, hash: Option<Hash>) -> Result<()> {
    registry().register(id, name.into(), hash)
}

/// Apply an algorithm's hash function to `input`, per `spec.md` §4.1: if the
/// algorithm has an associated hash, apply it; otherwise (EdDSA) return the
/// input unchanged, since EdDSA signs the message directly.
///
/// # Errors
/// [`Error::UnknownAlgorithm`] if `id` is not registered; [`Error::UnavailableHashFunc`]
/// if the hash identifier is known but no primitive implements it (never
/// raised by the built-in table, reserved for third-party `register`ed hashes
/// this crate has no primitive for).
pub fn apply_hash(id: i64, input: &[u8]) -> Result<Vec<u8>> {
    use sha2::{Digest, Sha256, Sha384, Sha512};
    match hash(id)? {
        None => Ok(input.to_vec()),
        Some(Hash::Sha256) => Ok(Sha256::digest(input).to_vec()),
        Some(Hash::Sha384) => Ok(Sha384::digest(input).to_vec()),
        Some(Hash::Sha512) => Ok(Sha512::digest(input).to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        assert_eq!(name(ES256), "ES256");
        assert_eq!(hash(ES256).unwrap(), Some(Hash::Sha256));
        assert_eq!(hash(EDDSA).unwrap(), None);
    }

    #[test]
    fn unknown_algorithm_name_is_descriptive() {
        assert_eq!(name(12345), "unknown algorithm value 12345");
        assert!(matches!(hash(12345), Err(Error::UnknownAlgorithm(12345))));
    }

    #[test]
    fn register_rejects_duplicate() {
        let fresh_id = -100_001;
        register(fresh_id, "TEST-ALG", Some(Hash::Sha256)).unwrap();
        assert_eq!(name(fresh_id), "TEST-ALG");
        let err = register(fresh_id, "TEST-ALG-2", None).unwrap_err();
        assert!(matches!(err, Error::AlgorithmRegistered(id) if id == fresh_id));
    }

    #[test]
    fn reserved_algorithm_is_invalid() {
        assert!(Algorithm::new(RESERVED).is_err());
        assert!(Algorithm::new(ES256).is_ok());
    }

    #[test]
    fn apply_hash_identity_for_eddsa() {
        let msg = b"hello world";
        assert_eq!(apply_hash(EDDSA, msg).unwrap(), msg);
    }
}
