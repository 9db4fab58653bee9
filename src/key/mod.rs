//! `COSE_Key` structures: EC2, OKP and Symmetric key types (`spec.md` §3,
//! §4.4).

pub mod curve;

use crate::cbor;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::sign::ecdsa::{EcdsaSigner, EcdsaVerifier};
use crate::sign::eddsa::{EddsaSigner, EddsaVerifier};
use crate::sign::hmac::HmacTagger;
use crate::sign::{Signer, Tagger, Verifier};
use crate::value::Value;

pub use curve::Curve;

/// A `COSE_Key` type (label 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Octet Key Pair (Ed25519/Ed448/X25519/X448).
    Okp,
    /// Elliptic Curve key pair with separate `x`/`y` coordinates.
    Ec2,
    /// A raw symmetric key.
    Symmetric,
}

impl KeyType {
    fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(Self::Okp),
            2 => Ok(Self::Ec2),
            4 => Ok(Self::Symmetric),
            0 => Err(Error::InvalidKey("kty 0 (Reserved) is invalid".into())),
            other => Err(Error::InvalidKey(format!("unknown kty {other}"))),
        }
    }

    fn id(self) -> i64 {
        match self {
            Self::Okp => 1,
            Self::Ec2 => 2,
            Self::Symmetric => 4,
        }
    }
}

/// A key operation restriction (RFC 8152 §7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOps {
    /// Create a signature (1).
    Sign,
    /// Verify a signature (2).
    Verify,
    /// Encrypt content (3).
    Encrypt,
    /// Decrypt content (4).
    Decrypt,
    /// Wrap a key (5).
    WrapKey,
    /// Unwrap a key (6).
    UnwrapKey,
    /// Derive a key (7).
    DeriveKey,
    /// Derive bits (8).
    DeriveBits,
    /// Create a MAC (9).
    MacCreate,
    /// Verify a MAC (10).
    MacVerify,
}

impl KeyOps {
    fn from_id(id: i64) -> Result<Self> {
        match id {
            1 => Ok(Self::Sign),
            2 => Ok(Self::Verify),
            3 => Ok(Self::Encrypt),
            4 => Ok(Self::Decrypt),
            5 => Ok(Self::WrapKey),
            6 => Ok(Self::UnwrapKey),
            7 => Ok(Self::DeriveKey),
            8 => Ok(Self::DeriveBits),
            9 => Ok(Self::MacCreate),
            10 => Ok(Self::MacVerify),
            other => Err(Error::InvalidKey(format!("unknown key_ops value {other}"))),
        }
    }

    fn id(self) -> i64 {
        match self {
            Self::Sign => 1,
            Self::Verify => 2,
            Self::Encrypt => 3,
            Self::Decrypt => 4,
            Self::WrapKey => 5,
            Self::UnwrapKey => 6,
            Self::DeriveKey => 7,
            Self::DeriveBits => 8,
            Self::MacCreate => 9,
            Self::MacVerify => 10,
        }
    }
}

/// A `COSE_Key`.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// `kty` (1).
    pub kty: KeyType,
    /// `kid` (2).
    pub id: Option<Vec<u8>>,
    /// `alg` (3), if set must match the curve/type-derived algorithm.
    pub alg: Option<i64>,
    /// `key_ops` (4).
    pub key_ops: Vec<KeyOps>,
    /// `Base IV` (5).
    pub base_iv: Option<Vec<u8>>,
    /// EC2/OKP `crv` (-1).
    pub curve: Option<Curve>,
    /// EC2/OKP `x` (-2).
    pub x: Option<Vec<u8>>,
    /// EC2 `y` (-3).
    pub y: Option<Vec<u8>>,
    /// EC2/OKP `d` (-4).
    pub d: Option<Vec<u8>>,
    /// Symmetric `k` (-1 in the Symmetric key-type label space).
    pub k: Option<Vec<u8>>,
    /// Any additional (label, value) pairs outside the well-known set.
    pub params: Vec<(Label, Value)>,
}

impl Key {
    /// Construct a new, empty key of the given type.
    #[must_use]
    pub fn new(kty: KeyType) -> Self {
        Self {
            kty,
            id: None,
            alg: None,
            key_ops: Vec::new(),
            base_iv: None,
            curve: None,
            x: None,
            y: None,
            d: None,
            k: None,
            params: Vec::new(),
        }
    }

    /// Whether `self.key_ops` permits `op`, or no restriction is declared.
    #[must_use]
    pub fn permits(&self, op: KeyOps) -> bool {
        self.key_ops.is_empty() || self.key_ops.contains(&op)
    }

    /// This key's `kid` (2), hex-encoded, for diagnostics and logging where
    /// printing the raw bytes would be unreadable.
    #[must_use]
    pub fn id_hex(&self) -> Option<String> {
        self.id.as_deref().map(hex::encode)
    }

    /// The algorithm implied by this key's (type, curve), if any.
    #[must_use]
    pub fn derived_algorithm(&self) -> Option<i64> {
        self.curve.and_then(Curve::default_algorithm)
    }

    /// Validate this key against `spec.md` §4.4's rules for the given
    /// intended operation.
    ///
    /// # Errors
    /// A key-shape [`Error`] variant describing the specific violation.
    pub fn validate(&self, op: KeyOps) -> Result<()> {
        if !self.permits(op) {
            return Err(Error::OpNotSupported(format!("{op:?}")));
        }

        match self.kty {
            KeyType::Ec2 => {
                let curve = self
                    .curve
                    .ok_or_else(|| Error::InvalidKey("EC2 key has no curve".into()))?;
                if !curve.is_ec2() {
                    return Err(Error::InvalidKey(format!(
                        "{curve:?} is not a valid EC2 curve"
                    )));
                }
                if matches!(op, KeyOps::Verify) && (self.x.is_none() || self.y.is_none()) {
                    return Err(Error::Ec2NoPub);
                }
                if matches!(op, KeyOps::Sign) && self.d.is_none() {
                    return Err(Error::NotPrivKey);
                }
                for coord in [&self.x, &self.y, &self.d].into_iter().flatten() {
                    if coord.len() > curve.coordinate_size() {
                        return Err(Error::InvalidKey(
                            "coordinate exceeds curve byte size".into(),
                        ));
                    }
                }
            },
            KeyType::Okp => {
                let curve = self
                    .curve
                    .ok_or_else(|| Error::InvalidKey("OKP key has no curve".into()))?;
                if !curve.is_okp() {
                    return Err(Error::InvalidKey(format!(
                        "{curve:?} is not a valid OKP curve"
                    )));
                }
                if matches!(op, KeyOps::Verify) && self.x.is_none() {
                    return Err(Error::OkpNoPub);
                }
                if matches!(op, KeyOps::Sign) && self.d.is_none() {
                    return Err(Error::NotPrivKey);
                }
            },
            KeyType::Symmetric => {
                if self.k.as_ref().map_or(true, Vec::is_empty) {
                    return Err(Error::InvalidKey("symmetric key has empty K".into()));
                }
            },
        }

        if let Some(alg) = self.alg {
            if let Some(derived) = self.derived_algorithm() {
                if alg != derived {
                    return Err(Error::AlgorithmMismatch(
                        crate::algorithm::name(alg),
                        crate::algorithm::name(derived),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Pad EC2 coordinates up to `curve.coordinate_size()` with leading
    /// zeroes, per `spec.md` §4.4's encode rule.
    fn padded(curve: Curve, value: &[u8]) -> Vec<u8> {
        let size = curve.coordinate_size();
        if value.len() >= size {
            return value.to_vec();
        }
        let mut padded = vec![0u8; size - value.len()];
        padded.extend_from_slice(value);
        padded
    }

    /// Encode as a deterministic `COSE_Key` CBOR map.
    ///
    /// # Errors
    /// [`Error::InvalidKey`] if a `Params` label collides with a well-known
    /// label.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::new();
        entries.push(cbor::MapEntry {
            key: Label::Int(1).encode()?,
            value: Value::Int(self.kty.id()).encode()?,
        });
        if let Some(id) = &self.id {
            entries.push(cbor::MapEntry {
                key: Label::Int(2).encode()?,
                value: Value::Bytes(id.clone()).encode()?,
            });
        }
        if let Some(alg) = self.alg {
            entries.push(cbor::MapEntry {
                key: Label::Int(3).encode()?,
                value: Value::Int(alg).encode()?,
            });
        }
        if !self.key_ops.is_empty() {
            entries.push(cbor::MapEntry {
                key: Label::Int(4).encode()?,
                value: Value::Array(self.key_ops.iter().map(|op| Value::Int(op.id())).collect())
                    .encode()?,
            });
        }
        if let Some(base_iv) = &self.base_iv {
            entries.push(cbor::MapEntry {
                key: Label::Int(5).encode()?,
                value: Value::Bytes(base_iv.clone()).encode()?,
            });
        }

        match self.kty {
            KeyType::Ec2 => {
                let curve = self
                    .curve
                    .ok_or_else(|| Error::InvalidKey("EC2 key has no curve".into()))?;
                entries.push(cbor::MapEntry {
                    key: Label::Int(-1).encode()?,
                    value: Value::Int(curve.id()).encode()?,
                });
                if let Some(x) = &self.x {
                    entries.push(cbor::MapEntry {
                        key: Label::Int(-2).encode()?,
                        value: Value::Bytes(Self::padded(curve, x)).encode()?,
                    });
                }
                if let Some(y) = &self.y {
                    entries.push(cbor::MapEntry {
                        key: Label::Int(-3).encode()?,
                        value: Value::Bytes(Self::padded(curve, y)).encode()?,
                    });
                }
                if let Some(d) = &self.d {
                    entries.push(cbor::MapEntry {
                        key: Label::Int(-4).encode()?,
                        value: Value::Bytes(Self::padded(curve, d)).encode()?,
                    });
                }
            },
            KeyType::Okp => {
                let curve = self
                    .curve
                    .ok_or_else(|| Error::InvalidKey("OKP key has no curve".into()))?;
                entries.push(cbor::MapEntry {
                    key: Label::Int(-1).encode()?,
                    value: Value::Int(curve.id()).encode()?,
                });
                if let Some(x) = &self.x {
                    entries.push(cbor::MapEntry {
                        key: Label::Int(-2).encode()?,
                        value: Value::Bytes(x.clone()).encode()?,
                    });
                }
                if let Some(d) = &self.d {
                    entries.push(cbor::MapEntry {
                        key: Label::Int(-4).encode()?,
                        value: Value::Bytes(d.clone()).encode()?,
                    });
                }
            },
            KeyType::Symmetric => {
                let k = self
                    .k
                    .as_ref()
                    .ok_or_else(|| Error::InvalidKey("symmetric key has no K".into()))?;
                entries.push(cbor::MapEntry {
                    key: Label::Int(-1).encode()?,
                    value: Value::Bytes(k.clone()).encode()?,
                });
            },
        }

        for (label, value) in &self.params {
            let key = label.encode()?;
            if entries.iter().any(|e| e.key == key) {
                return Err(Error::InvalidKey(format!(
                    "params label {label:?} collides with a well-known label"
                )));
            }
            entries.push(cbor::MapEntry {
                key,
                value: value.encode()?,
            });
        }

        Ok(cbor::encode_map_canonical(entries))
    }

    /// Decode a `COSE_Key` from a CBOR map.
    ///
    /// # Errors
    /// [`Error::Malformed`] for shape violations, [`Error::InvalidKey`] for
    /// semantic violations.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let entries = cbor::decode_map_strict(bytes)?;
        let mut kty = None;
        let mut key = Self::new(KeyType::Symmetric);
        let mut params = Vec::new();

        for entry in entries {
            let label = Label::decode(&entry.key)?;
            let value = Value::decode(&entry.value)?;
            match &label {
                Label::Int(1) => {
                    kty = Some(KeyType::from_id(value.as_int().ok_or_else(|| {
                        Error::InvalidKey("kty must be an integer".into())
                    })?)?);
                },
                Label::Int(2) => key.id = value.as_bytes().map(<[u8]>::to_vec),
                Label::Int(3) => key.alg = value.as_int(),
                Label::Int(4) => {
                    let Value::Array(ops) = &value else {
                        return Err(Error::InvalidKey("key_ops must be an array".into()));
                    };
                    for op in ops {
                        let id = op
                            .as_int()
                            .ok_or_else(|| Error::InvalidKey("key_ops entry must be int".into()))?;
                        key.key_ops.push(KeyOps::from_id(id)?);
                    }
                },
                Label::Int(5) => key.base_iv = value.as_bytes().map(<[u8]>::to_vec),
                Label::Int(-1) => {
                    if let Some(id) = value.as_int() {
                        key.curve = Some(Curve::from_id(id)?);
                    } else {
                        key.k = value.as_bytes().map(<[u8]>::to_vec);
                    }
                },
                Label::Int(-2) => key.x = value.as_bytes().map(<[u8]>::to_vec),
                Label::Int(-3) => key.y = value.as_bytes().map(<[u8]>::to_vec),
                Label::Int(-4) => key.d = value.as_bytes().map(<[u8]>::to_vec),
                _ => params.push((label, value)),
            }
        }

        key.kty = kty.ok_or_else(|| Error::InvalidKey("missing kty".into()))?;
        key.params = params;
        Ok(key)
    }

    /// Build a [`Signer`] for this key's Sign operation, using its declared
    /// or derived algorithm.
    ///
    /// # Errors
    /// [`Error::NotPrivKey`], [`Error::InvalidKey`], or
    /// [`Error::AlgorithmNotSupported`].
    pub fn into_signer(&self) -> Result<Box<dyn Signer>> {
        self.validate(KeyOps::Sign)?;
        let d = self.d.as_deref().ok_or(Error::NotPrivKey)?;
        let curve = self.curve.ok_or_else(|| Error::InvalidKey("key has no curve".into()))?;
        match self.kty {
            KeyType::Ec2 => {
                let signer: Box<dyn Signer> = Box::new(EcdsaSigner::from_scalar(curve, d)?);
                Ok(signer)
            },
            KeyType::Okp if curve == Curve::Ed25519 => {
                let signer: Box<dyn Signer> = Box::new(EddsaSigner::from_seed(d)?);
                Ok(signer)
            },
            KeyType::Okp => Err(Error::AlgorithmNotSupported(
                format!("{curve:?}"),
                "only Ed25519 OKP signing is implemented".into(),
            )),
            KeyType::Symmetric => Err(Error::InvalidKey(
                "symmetric keys produce a Tagger, not a Signer".into(),
            )),
        }
    }

    /// Build a [`Verifier`] for this key's Verify operation.
    ///
    /// # Errors
    /// [`Error::Ec2NoPub`], [`Error::OkpNoPub`], [`Error::InvalidKey`], or
    /// [`Error::AlgorithmNotSupported`].
    pub fn into_verifier(&self) -> Result<Box<dyn Verifier>> {
        self.validate(KeyOps::Verify)?;
        let curve = self.curve.ok_or_else(|| Error::InvalidKey("key has no curve".into()))?;
        match self.kty {
            KeyType::Ec2 => {
                let x = self.x.as_deref().ok_or(Error::Ec2NoPub)?;
                let y = self.y.as_deref().ok_or(Error::Ec2NoPub)?;
                let verifier: Box<dyn Verifier> =
                    Box::new(EcdsaVerifier::from_coordinates(curve, x, y)?);
                Ok(verifier)
            },
            KeyType::Okp if curve == Curve::Ed25519 => {
                let x = self.x.as_deref().ok_or(Error::OkpNoPub)?;
                let verifier: Box<dyn Verifier> = Box::new(EddsaVerifier::from_public(x)?);
                Ok(verifier)
            },
            KeyType::Okp => Err(Error::AlgorithmNotSupported(
                format!("{curve:?}"),
                "only Ed25519 OKP verification is implemented".into(),
            )),
            KeyType::Symmetric => Err(Error::InvalidKey(
                "symmetric keys produce a Tagger, not a Verifier".into(),
            )),
        }
    }

    /// Build a [`Tagger`] (HMAC) for a Symmetric key.
    ///
    /// # Errors
    /// [`Error::InvalidKey`] if this is not a Symmetric key, or
    /// [`Error::AlgorithmNotSupported`] for `HMAC256/64`.
    pub fn into_tagger(&self) -> Result<Box<dyn Tagger>> {
        self.validate(KeyOps::MacCreate)?;
        let KeyType::Symmetric = self.kty else {
            return Err(Error::InvalidKey("only Symmetric keys produce a Tagger".into()));
        };
        let k = self.k.as_deref().ok_or_else(|| Error::InvalidKey("symmetric key has no K".into()))?;
        let algorithm = self.alg.ok_or(Error::AlgorithmNotFound)?;
        Ok(Box::new(HmacTagger::from_key(k, algorithm)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p256_key_pair() -> (Key, Key) {
        let scalar = [5u8; 32];
        let signing_key = p256::ecdsa::SigningKey::from_slice(&scalar).unwrap();
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut private = Key::new(KeyType::Ec2);
        private.curve = Some(Curve::P256);
        private.d = Some(scalar.to_vec());
        private.x = Some(point.x().unwrap().to_vec());
        private.y = Some(point.y().unwrap().to_vec());
        let mut public = private.clone();
        public.d = None;
        (private, public)
    }

    #[test]
    fn ec2_key_round_trips_through_cbor() {
        let (_, public) = p256_key_pair();
        let encoded = public.encode().unwrap();
        let decoded = Key::decode(&encoded).unwrap();
        assert_eq!(decoded, public);
    }

    #[test]
    fn ec2_coordinates_are_padded_to_curve_size() {
        let mut key = Key::new(KeyType::Ec2);
        key.curve = Some(Curve::P256);
        key.x = Some(vec![0xAB]); // deliberately shorter than 32 bytes
        key.y = Some(vec![0xCD]);
        let encoded = key.encode().unwrap();
        let decoded = Key::decode(&encoded).unwrap();
        assert_eq!(decoded.x.as_deref().unwrap().len(), 32);
        assert_eq!(decoded.y.as_deref().unwrap().len(), 32);
        assert_eq!(decoded.x.as_deref().unwrap().last(), Some(&0xAB));
    }

    #[test]
    fn okp_only_curve_is_rejected_for_ec2() {
        let mut key = Key::new(KeyType::Ec2);
        key.curve = Some(Curve::Ed25519);
        assert!(key.validate(KeyOps::Verify).is_err());
    }

    #[test]
    fn ec2_only_curve_is_rejected_for_okp() {
        let mut key = Key::new(KeyType::Okp);
        key.curve = Some(Curve::P256);
        assert!(key.validate(KeyOps::Verify).is_err());
    }

    #[test]
    fn symmetric_key_with_empty_k_is_rejected() {
        let mut key = Key::new(KeyType::Symmetric);
        key.k = Some(vec![]);
        assert!(key.validate(KeyOps::MacCreate).is_err());
    }

    #[test]
    fn sign_requires_private_component() {
        let (_, public) = p256_key_pair();
        assert!(matches!(public.into_signer(), Err(Error::NotPrivKey)));
    }

    #[test]
    fn verify_requires_public_coordinates() {
        let mut key = Key::new(KeyType::Ec2);
        key.curve = Some(Curve::P256);
        assert!(matches!(key.into_verifier(), Err(Error::Ec2NoPub)));
    }

    #[test]
    fn params_colliding_with_well_known_label_is_rejected_at_encode() {
        let mut key = Key::new(KeyType::Symmetric);
        key.k = Some(vec![1, 2, 3]);
        key.params.push((Label::Int(1), Value::Int(99))); // collides with kty
        assert!(key.encode().is_err());
    }

    #[test]
    fn id_hex_formats_kid_as_lowercase_hex() {
        let mut key = Key::new(KeyType::Symmetric);
        key.id = Some(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(key.id_hex().as_deref(), Some("deadbeef"));
    }

    #[test]
    fn signer_and_verifier_round_trip() {
        let (private, public) = p256_key_pair();
        private.validate(KeyOps::Sign).unwrap();
        let signer = private.into_signer().unwrap();
        let verifier = public.into_verifier().unwrap();
        let mut rng = rand::rngs::OsRng;
        let sig = signer.sign(&mut rng, b"hello").unwrap();
        verifier.verify(b"hello", &sig).unwrap();
    }
}
