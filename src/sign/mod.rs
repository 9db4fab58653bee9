//! The `Signer`/`Verifier`/`Tagger` capability traits (`spec.md` §4.5) and
//! concrete adapters over concrete cryptographic primitives, which `spec.md`
//! §1 declares an external collaborator: the core only ever calls through
//! these trait objects.

pub mod ecdsa;
pub mod eddsa;
pub mod hmac;
pub mod rsa_pss;

use crate::error::Result;

/// Adapts a caller-supplied `&mut dyn RngCore` into the `CryptoRng` marker
/// the RustCrypto signing APIs require. The `Signer`/`Verifier` contract
/// (`spec.md` §4.5) places the burden of supplying cryptographically secure
/// randomness on the caller; this wrapper does not itself add entropy.
pub(crate) struct RngAdapter<'a>(pub(crate) &'a mut dyn rand_core::RngCore);

impl rand_core::RngCore for RngAdapter<'_> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand_core::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl rand_core::CryptoRng for RngAdapter<'_> {}

/// Produces signatures over arbitrary content (RFC 8152 §4.4's
/// `ToBeSigned`). Implementations compute any required hashing internally —
/// callers always pass the full, unhashed content.
pub trait Signer {
    /// The IANA algorithm identifier this signer implements.
    fn algorithm(&self) -> i64;

    /// Sign `content`, using `randomness` as entropy where the algorithm
    /// needs it (ECDSA, RSA-PSS). Deterministic implementations may ignore
    /// `randomness`.
    ///
    /// # Errors
    /// Any crypto-primitive failure, reported as [`crate::error::Error::Malformed`].
    fn sign(&self, randomness: &mut dyn rand_core::RngCore, content: &[u8]) -> Result<Vec<u8>>;
}

/// Verifies signatures produced by a matching [`Signer`]. Failures collapse
/// to the [`crate::error::Error::Verification`] sentinel so no side channel
/// exposes which step failed.
pub trait Verifier {
    /// The IANA algorithm identifier this verifier implements.
    fn algorithm(&self) -> i64;

    /// Verify `signature` over `content`.
    ///
    /// # Errors
    /// [`crate::error::Error::Verification`] on any failure.
    fn verify(&self, content: &[u8], signature: &[u8]) -> Result<()>;
}

/// Produces and checks MAC tags (HMAC algorithms).
pub trait Tagger {
    /// The IANA algorithm identifier this tagger implements.
    fn algorithm(&self) -> i64;

    /// Compute a tag over `content`.
    ///
    /// # Errors
    /// Any crypto-primitive failure.
    fn create_tag(&self, content: &[u8]) -> Result<Vec<u8>>;

    /// Check `tag` against `content`.
    ///
    /// # Errors
    /// [`crate::error::Error::Authentication`] on any mismatch.
    fn authenticate_tag(&self, content: &[u8], tag: &[u8]) -> Result<()>;
}
