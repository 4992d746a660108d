use std::fmt;

use der::asn1::UintRef;
use der::{Decode, Encode, Sequence};
use rand_core::OsRng;
use sm2::dsa::signature::{Signer, Verifier};
use sm2::dsa::{Signature, SigningKey, VerifyingKey};
use sm2::elliptic_curve::sec1::ToEncodedPoint;
use sm2::{PublicKey, SecretKey};

use crate::error::{CsrError, Result};
use crate::request::info::PublicKeyInfo;
use crate::signer::{RequestSigner, RequestVerifier};

/// Width of one SM2 scalar in bytes.
const SCALAR_LEN: usize = 32;

/// An SM2 key, either a full key pair or a public key alone.
///
/// Only a key pair can sign a request; public-only keys come out of
/// [`Sm2Key::from_public_key_info`] and similar constructors.
#[derive(Clone)]
pub struct Sm2Key {
    public: PublicKey,
    secret: Option<SecretKey>,
}

impl Sm2Key {
    /// Generate a new SM2 key pair.
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        Self {
            public: secret.public_key(),
            secret: Some(secret),
        }
    }

    /// Import a key pair from a 32-byte big-endian private scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| CsrError::InvalidArgument("Invalid SM2 private key".to_string()))?;
        Ok(Self {
            public: secret.public_key(),
            secret: Some(secret),
        })
    }

    /// Import a public key from SEC1 bytes (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let public = PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CsrError::InvalidArgument("Invalid SM2 public key".to_string()))?;
        Ok(Self {
            public,
            secret: None,
        })
    }

    /// Public-only key for the point carried by a request.
    pub fn from_public_key_info(info: &PublicKeyInfo) -> Result<Self> {
        Self::from_sec1_bytes(info.point())
    }

    /// Whether this key can sign.
    pub fn has_private_key(&self) -> bool {
        self.secret.is_some()
    }

    /// The 32-byte big-endian private scalar, if this is a key pair.
    pub fn secret_bytes(&self) -> Option<Vec<u8>> {
        self.secret.as_ref().map(|secret| secret.to_bytes().to_vec())
    }

    /// Returns the public key in the form a request carries it.
    ///
    /// # Returns
    /// The uncompressed point wrapped in a [`PublicKeyInfo`].
    pub fn public_key_info(&self) -> Result<PublicKeyInfo> {
        let point = self.public.to_encoded_point(false);
        PublicKeyInfo::from_uncompressed_point(point.as_bytes())
    }
}

impl fmt::Debug for Sm2Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sm2Key")
            .field("public", &self.public.to_encoded_point(false))
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}

impl RequestSigner for Sm2Key {
    fn public_key_info(&self) -> Result<PublicKeyInfo> {
        Sm2Key::public_key_info(self)
    }

    fn has_private_key(&self) -> bool {
        Sm2Key::has_private_key(self)
    }

    fn sign(&self, signer_id: &str, message: &[u8]) -> Result<Vec<u8>> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| CsrError::InvalidArgument("SM2 key is required".to_string()))?;
        let signing_key = SigningKey::new(signer_id, secret)
            .map_err(|e| CsrError::InvalidArgument(format!("Invalid signer ID: {e}")))?;
        let signature: Signature = signing_key
            .try_sign(message)
            .map_err(|e| CsrError::Signer(e.to_string()))?;
        encode_signature(&signature)
    }
}

/// Verifies SM2 signatures over SM3 digests.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sm2Verifier;

impl RequestVerifier for Sm2Verifier {
    fn verify(
        &self,
        public_key: &PublicKeyInfo,
        signer_id: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        let Some(signature) = decode_signature(signature)? else {
            tracing::debug!("signature scalars out of range");
            return Ok(false);
        };
        let verifying_key = match VerifyingKey::from_sec1_bytes(signer_id, public_key.point()) {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!("request public key is not a point on the SM2 curve");
                return Ok(false);
            }
        };
        Ok(verifying_key.verify(message, &signature).is_ok())
    }
}

/// `SM2Signature ::= SEQUENCE { r INTEGER, s INTEGER }`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SignatureValue<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

/// Encodes a signature as the DER (r, s) sequence carried in a request.
///
/// # Arguments
/// * `signature` - The fixed-width signature produced by the signing key.
///
/// # Returns
/// The DER encoding with both scalars as minimal positive INTEGERs.
pub fn encode_signature(signature: &Signature) -> Result<Vec<u8>> {
    let r = signature.r_bytes();
    let s = signature.s_bytes();
    let value = SignatureValue {
        r: UintRef::new(&r)?,
        s: UintRef::new(&s)?,
    };
    Ok(value.to_der()?)
}

/// Parses the DER (r, s) sequence.
///
/// # Arguments
/// * `bytes` - The signature bytes taken from a request.
///
/// # Returns
/// `MalformedEncoding` if the bytes are not a SEQUENCE of two non-negative
/// INTEGERs. `Ok(None)` if the scalars cannot belong to any valid signature.
pub fn decode_signature(bytes: &[u8]) -> Result<Option<Signature>> {
    let value = SignatureValue::from_der(bytes)?;

    let mut raw = [0u8; 2 * SCALAR_LEN];
    for (scalar, out) in [value.r, value.s].iter().zip(raw.chunks_mut(SCALAR_LEN)) {
        let magnitude = scalar.as_bytes();
        if magnitude.len() > SCALAR_LEN {
            return Ok(None);
        }
        out[SCALAR_LEN - magnitude.len()..].copy_from_slice(magnitude);
    }
    Ok(Signature::from_slice(&raw).ok())
}
