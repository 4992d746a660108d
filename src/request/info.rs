use const_oid::ObjectIdentifier;
use der::asn1::{Any, BitString, Null};
use der::{Decode, Encode};
use x509_cert::attr::Attributes;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::codec;
use crate::error::{CsrError, Result};
use crate::request::params::SubjectName;

/// `id-ecPublicKey`.
pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// The SM2 curve, `sm2p256v1`.
pub const SM2_P256_V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.301");

/// `sm2sign-with-sm3`.
pub const SM2_WITH_SM3: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.501");

/// Length of an uncompressed SM2 point: format byte plus two 32-byte coordinates.
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

/// Represents the supported signature algorithms for certificate requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SM2 signature over an SM3 digest.
    Sm2WithSm3,
}

impl SignatureAlgorithm {
    /// Returns the object identifier of the algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sm2WithSm3 => SM2_WITH_SM3,
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    fn from(value: SignatureAlgorithm) -> Self {
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters: None,
        }
    }
}

impl TryFrom<&AlgorithmIdentifierOwned> for SignatureAlgorithm {
    type Error = CsrError;

    /// Accepts the identifier with absent or NULL parameters.
    fn try_from(id: &AlgorithmIdentifierOwned) -> Result<Self> {
        if id.oid != SM2_WITH_SM3 {
            return Err(CsrError::MalformedEncoding(format!(
                "Unsupported signature algorithm {}",
                id.oid
            )));
        }
        match &id.parameters {
            None => Ok(SignatureAlgorithm::Sm2WithSm3),
            Some(parameters) if parameters.decode_as::<Null>().is_ok() => {
                Ok(SignatureAlgorithm::Sm2WithSm3)
            }
            Some(_) => Err(CsrError::malformed("sm2sign-with-sm3 takes no parameters")),
        }
    }
}

/// An SM2 subject public key: `id-ecPublicKey` on `sm2p256v1` with an
/// uncompressed point.
///
/// Only the encoding is checked here; whether the point lies on the curve is
/// for the verifier to decide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublicKeyInfo {
    point: Vec<u8>,
}

impl PublicKeyInfo {
    /// Creates a public key from an uncompressed point.
    ///
    /// # Arguments
    /// * `point` - `0x04 || X || Y` with 32-byte coordinates.
    ///
    /// # Returns
    /// The public key, or `MalformedEncoding` for any other length or format byte.
    pub fn from_uncompressed_point(point: &[u8]) -> Result<Self> {
        if point.len() != UNCOMPRESSED_POINT_LEN || point[0] != UNCOMPRESSED_POINT_TAG {
            return Err(CsrError::MalformedEncoding(format!(
                "SM2 public key must be a {UNCOMPRESSED_POINT_LEN}-byte uncompressed point"
            )));
        }
        Ok(Self {
            point: point.to_vec(),
        })
    }

    /// The uncompressed point bytes.
    pub fn point(&self) -> &[u8] {
        &self.point
    }

    /// `id-ecPublicKey` with the `sm2p256v1` named curve as its parameter.
    pub fn algorithm() -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: ID_EC_PUBLIC_KEY,
            parameters: Some(Any::encode_from(&SM2_P256_V1)?),
        })
    }

    /// Converts the key into a `SubjectPublicKeyInfoOwned` for DER encoding.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        Ok(SubjectPublicKeyInfoOwned {
            algorithm: Self::algorithm()?,
            subject_public_key: BitString::from_bytes(&self.point)?,
        })
    }

    /// Encodes as a standalone `SubjectPublicKeyInfo`.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_spki()?.to_der()?)
    }

    /// Creates a `PublicKeyInfo` from a decoded `SubjectPublicKeyInfo`.
    ///
    /// # Arguments
    /// * `spki` - The decoded key info.
    ///
    /// # Returns
    /// The key, or `MalformedEncoding` if it is not an uncompressed point on
    /// the SM2 named curve.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let algorithm = &spki.algorithm;
        if algorithm.oid != ID_EC_PUBLIC_KEY {
            return Err(CsrError::MalformedEncoding(format!(
                "Unsupported public key algorithm {}",
                algorithm.oid
            )));
        }
        let curve = algorithm
            .parameters
            .as_ref()
            .map(|parameters| parameters.decode_as::<ObjectIdentifier>())
            .transpose()?;
        match curve {
            Some(curve) if curve == SM2_P256_V1 => {}
            Some(curve) => {
                return Err(CsrError::MalformedEncoding(format!(
                    "Unsupported curve {curve}"
                )));
            }
            None => return Err(CsrError::malformed("EC public key without named curve")),
        }
        let point = spki.subject_public_key.as_bytes().ok_or_else(|| {
            CsrError::malformed("subjectPublicKey is not an octet-aligned BIT STRING")
        })?;
        Self::from_uncompressed_point(point)
    }
}

/// The unsigned part of a request.
///
/// ```text
/// CertificationRequestInfo ::= SEQUENCE {
///     version       INTEGER { v1(0) },
///     subject       Name,
///     subjectPKInfo SubjectPublicKeyInfo,
///     attributes    [0] IMPLICIT SET OF Attribute }
/// ```
///
/// # Fields
/// * `subject` - The subject distinguished name.
/// * `public_key` - The SM2 public key being certified.
/// * `attributes` - Attributes of a decoded request, kept as received. Empty
///   for requests built here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificationRequestInfo {
    pub subject: SubjectName,
    pub public_key: PublicKeyInfo,
    pub attributes: Attributes,
}

impl CertificationRequestInfo {
    /// Creates request info with no attributes.
    ///
    /// # Arguments
    /// * `subject` - The subject distinguished name.
    /// * `public_key` - The public key being certified.
    pub fn new(subject: SubjectName, public_key: PublicKeyInfo) -> Self {
        Self {
            subject,
            public_key,
            attributes: Attributes::new(),
        }
    }

    /// Converts the info into a `CertReqInfo` for DER encoding.
    ///
    /// # Returns
    /// A `CertReqInfo` with version v1.
    pub fn to_cert_req_info(&self) -> Result<CertReqInfo> {
        Ok(CertReqInfo {
            version: Version::V1,
            subject: self.subject.to_rdn_sequence()?,
            public_key: self.public_key.to_spki()?,
            attributes: self.attributes.clone(),
        })
    }

    /// The exact bytes a signature is computed over.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_cert_req_info()?.to_der()?)
    }

    /// Creates request info from a decoded `CertReqInfo`.
    ///
    /// Only v1 exists, so the version was already checked while decoding.
    pub fn from_cert_req_info(info: &CertReqInfo) -> Result<Self> {
        Ok(Self {
            subject: SubjectName::from_rdn_sequence(&info.subject)?,
            public_key: PublicKeyInfo::from_spki(&info.public_key)?,
            attributes: info.attributes.clone(),
        })
    }
}

/// A signed request.
///
/// ```text
/// CertificationRequest ::= SEQUENCE {
///     certificationRequestInfo CertificationRequestInfo,
///     signatureAlgorithm       AlgorithmIdentifier,
///     signature                BIT STRING }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificationRequest {
    pub info: CertificationRequestInfo,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// Signature bytes as carried in the BIT STRING.
    pub signature: Vec<u8>,
}

/// A decoded request together with the info bytes exactly as they were read.
#[derive(Clone, Debug)]
pub struct DecodedRequest<'a> {
    pub request: CertificationRequest,
    pub info_der: &'a [u8],
}

impl CertificationRequest {
    /// Puts a signature and its algorithm next to the info it covers.
    ///
    /// # Arguments
    /// * `info` - The signed request info.
    /// * `signature_algorithm` - Identifier of the algorithm that produced `signature`.
    /// * `signature` - The encoded signature.
    pub fn assemble(
        info: CertificationRequestInfo,
        signature_algorithm: AlgorithmIdentifierOwned,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            info,
            signature_algorithm,
            signature,
        }
    }

    /// Converts the request into a `CertReq` for DER encoding.
    pub fn to_cert_req(&self) -> Result<CertReq> {
        Ok(CertReq {
            info: self.info.to_cert_req_info()?,
            algorithm: self.signature_algorithm.clone(),
            signature: BitString::from_bytes(&self.signature)?,
        })
    }

    /// Encodes the complete signed request as DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_cert_req()?.to_der()?)
    }

    /// Decodes a DER request.
    ///
    /// The info bytes are borrowed from `der`, not re-encoded, so they are
    /// exactly what was signed.
    ///
    /// # Arguments
    /// * `der` - A complete DER `CertificationRequest`.
    ///
    /// # Returns
    /// The decoded request, or `MalformedEncoding` for anything other than an
    /// SM2 request signed with `sm2sign-with-sm3`.
    pub fn decode(der: &[u8]) -> Result<DecodedRequest<'_>> {
        let parsed = CertReq::from_der(der)?;
        SignatureAlgorithm::try_from(&parsed.algorithm)?;
        let signature = parsed
            .signature
            .as_bytes()
            .ok_or_else(|| CsrError::malformed("signature is not an octet-aligned BIT STRING"))?
            .to_vec();

        let elements = codec::sequence_elements(der)?;
        let info_der = elements
            .first()
            .map(|info| info.encoded)
            .ok_or_else(|| CsrError::malformed("CertificationRequest without info"))?;

        Ok(DecodedRequest {
            request: Self {
                info: CertificationRequestInfo::from_cert_req_info(&parsed.info)?,
                signature_algorithm: parsed.algorithm,
                signature,
            },
            info_der,
        })
    }
}
