//! EC2/OKP curve identifiers (`spec.md` §3, "Key").

use crate::error::{Error, Result};

/// An elliptic curve identifier (IANA COSE Elliptic Curves registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Curve {
    /// NIST P-256, used with EC2 keys.
    #[strum(serialize = "P-256")]
    P256,
    /// NIST P-384, used with EC2 keys.
    #[strum(serialize = "P-384")]
    P384,
    /// NIST P-521, used with EC2 keys.
    #[strum(serialize = "P-521")]
    P521,
    /// X25519, used with OKP keys (key agreement, not signing).
    #[strum(serialize = "X25519")]
    X25519,
    /// X448, used with OKP keys (key agreement, not signing).
    #[strum(serialize = "X448")]
    X448,
    /// Ed25519, used with OKP keys.
    #[strum(serialize = "Ed25519")]
    Ed25519,
    /// Ed448, used with OKP keys.
    #[strum(serialize = "Ed448")]
    Ed448,
}

impl Curve {
    /// Decode from the IANA integer identifier.
    ///
    /// # Errors
    /// [`Error::InvalidKey`] for any value outside the registry.
    pub fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(Self::P256),
            2 => Ok(Self::P384),
            3 => Ok(Self::P521),
            4 => Ok(Self::X25519),
            5 => Ok(Self::X448),
            6 => Ok(Self::Ed25519),
            7 => Ok(Self::Ed448),
            other => Err(Error::InvalidKey(format!("unknown curve id {other}"))),
        }
    }

    /// The IANA integer identifier.
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::P256 => 1,
            Self::P384 => 2,
            Self::P521 => 3,
            Self::X25519 => 4,
            Self::X448 => 5,
            Self::Ed25519 => 6,
            Self::Ed448 => 7,
        }
    }

    /// Whether this curve is valid for an EC2 key.
    #[must_use]
    pub fn is_ec2(self) -> bool {
        matches!(self, Self::P256 | Self::P384 | Self::P521)
    }

    /// Whether this curve is valid for an OKP key.
    #[must_use]
    pub fn is_okp(self) -> bool {
        matches!(self, Self::X25519 | Self::X448 | Self::Ed25519 | Self::Ed448)
    }

    /// The coordinate byte size for EC2 curves (`X`/`Y`/`D` padding target),
    /// and the ECDSA signature half-length.
    #[must_use]
    pub fn coordinate_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
            Self::X25519 | Self::Ed25519 => 32,
            Self::X448 | Self::Ed448 => 57,
        }
    }

    /// The algorithm this curve implies for signing, if any. `X25519`/`X448`
    /// are key-agreement-only and have no signing algorithm.
    #[must_use]
    pub fn default_algorithm(self) -> Option<i64> {
        match self {
            Self::P256 => Some(crate::algorithm::ES256),
            Self::P384 => Some(crate::algorithm::ES384),
            Self::P521 => Some(crate::algorithm::ES512),
            Self::Ed25519 | Self::Ed448 => Some(crate::algorithm::EDDSA),
            Self::X25519 | Self::X448 => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_iana_curve_names() {
        assert_eq!(Curve::P256.to_string(), "P-256");
        assert_eq!(Curve::Ed25519.to_string(), "Ed25519");
        assert_eq!(Curve::X448.to_string(), "X448");
    }

    #[test]
    fn id_round_trips() {
        for curve in [
            Curve::P256,
            Curve::P384,
            Curve::P521,
            Curve::X25519,
            Curve::X448,
            Curve::Ed25519,
            Curve::Ed448,
        ] {
            assert_eq!(Curve::from_id(curve.id()).unwrap(), curve);
        }
    }

    #[test]
    fn unknown_id_is_rejected() {
        assert!(Curve::from_id(99).is_err());
    }
}
