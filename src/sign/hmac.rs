//! HMAC tagger (`spec.md` §4.5, "Tagger contract").

use hmac::{Mac, SimpleHmac};
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithm::{HMAC_256_256, HMAC_256_64, HMAC_384_384, HMAC_512_512};
use crate::error::{Error, Result};
use crate::sign::Tagger;

/// An HMAC key, one of HMAC256/256, HMAC384/384, HMAC512/512.
///
/// `HMAC256/64` is a recognized algorithm identifier (`spec.md` §4.1's
/// registry carries it) but this crate does not implement the truncated
/// 64-bit tag variant; constructing one fails with
/// [`Error::AlgorithmNotSupported`], matching the source corpus's own
/// stance.
#[derive(Debug)]
pub enum HmacTagger {
    /// HMAC256/256.
    Sha256(SimpleHmac<Sha256>),
    /// HMAC384/384.
    Sha384(SimpleHmac<Sha384>),
    /// HMAC512/512.
    Sha512(SimpleHmac<Sha512>),
}

impl HmacTagger {
    /// Build a tagger from a raw symmetric key `k` and algorithm.
    ///
    /// # Errors
    /// [`Error::AlgorithmNotSupported`] for `HMAC256/64`, or any other
    /// non-HMAC algorithm id.
    pub fn from_key(k: &[u8], algorithm: i64) -> Result<Self> {
        match algorithm {
            HMAC_256_64 => Err(Error::AlgorithmNotSupported(
                "HMAC256/64".into(),
                "truncated HMAC tags are not implemented".into(),
            )),
            HMAC_256_256 => Ok(Self::Sha256(
                SimpleHmac::new_from_slice(k).map_err(|e| Error::InvalidKey(e.to_string()))?,
            )),
            HMAC_384_384 => Ok(Self::Sha384(
                SimpleHmac::new_from_slice(k).map_err(|e| Error::InvalidKey(e.to_string()))?,
            )),
            HMAC_512_512 => Ok(Self::Sha512(
                SimpleHmac::new_from_slice(k).map_err(|e| Error::InvalidKey(e.to_string()))?,
            )),
            other => Err(Error::AlgorithmNotSupported(
                other.to_string(),
                "not an HMAC algorithm".into(),
            )),
        }
    }
}

impl Tagger for HmacTagger {
    fn algorithm(&self) -> i64 {
        match self {
            Self::Sha256(_) => HMAC_256_256,
            Self::Sha384(_) => HMAC_384_384,
            Self::Sha512(_) => HMAC_512_512,
        }
    }

    fn create_tag(&self, content: &[u8]) -> Result<Vec<u8>> {
        Ok(match self {
            Self::Sha256(mac) => mac.clone().chain_update(content).finalize().into_bytes().to_vec(),
            Self::Sha384(mac) => mac.clone().chain_update(content).finalize().into_bytes().to_vec(),
            Self::Sha512(mac) => mac.clone().chain_update(content).finalize().into_bytes().to_vec(),
        })
    }

    fn authenticate_tag(&self, content: &[u8], tag: &[u8]) -> Result<()> {
        let ok = match self {
            Self::Sha256(mac) => mac.clone().chain_update(content).verify_slice(tag).is_ok(),
            Self::Sha384(mac) => mac.clone().chain_update(content).verify_slice(tag).is_ok(),
            Self::Sha512(mac) => mac.clone().chain_update(content).verify_slice(tag).is_ok(),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Authentication)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac256_round_trips() {
        let tagger = HmacTagger::from_key(b"a shared secret key", HMAC_256_256).unwrap();
        let tag = tagger.create_tag(b"payload").unwrap();
        tagger.authenticate_tag(b"payload", &tag).unwrap();
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let tagger = HmacTagger::from_key(b"a shared secret key", HMAC_384_384).unwrap();
        let mut tag = tagger.create_tag(b"payload").unwrap();
        if let Some(last) = tag.last_mut() {
            *last ^= 0xFF;
        }
        assert!(matches!(
            tagger.authenticate_tag(b"payload", &tag),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn hmac256_64_is_not_supported() {
        let err = HmacTagger::from_key(b"key", HMAC_256_64).unwrap_err();
        assert!(matches!(err, Error::AlgorithmNotSupported(_, _)));
    }

    #[test]
    fn non_hmac_algorithm_is_rejected() {
        assert!(HmacTagger::from_key(b"key", crate::algorithm::EDDSA).is_err());
    }
}
