use std::fmt;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec, Utf8StringRef};
use der::{Tag, Tagged};
use pem::LineEnding;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use crate::error::{CsrError, Result};
use crate::signer::DEFAULT_SIGNER_ID;

/// Subject fields as supplied by the caller.
///
/// Every field is optional here so that "absent" and "empty" stay distinct;
/// [`SubjectName::build`] enforces that the common name is present.
///
/// # Fields
/// * `country` - The country (C), encoded as a PrintableString.
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organizational_unit` - The organizational unit (OU).
/// * `common_name` - The common name (CN), required before signing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct SubjectFields {
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organizational_unit: Option<String>,
    #[builder(into)]
    pub common_name: Option<String>,
}

/// Attribute types a subject name can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Country,
    State,
    Locality,
    Organization,
    OrganizationalUnit,
    CommonName,
    /// Any attribute type found while decoding a foreign request.
    Other(ObjectIdentifier),
}

impl AttributeType {
    /// Encoding order used when building a subject.
    pub const ORDER: [AttributeType; 6] = [
        AttributeType::Country,
        AttributeType::State,
        AttributeType::Locality,
        AttributeType::Organization,
        AttributeType::OrganizationalUnit,
        AttributeType::CommonName,
    ];

    pub const COUNTRY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
    pub const STATE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
    pub const LOCALITY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
    pub const ORGANIZATION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
    pub const ORGANIZATIONAL_UNIT_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
    pub const COMMON_NAME_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

    /// Returns the object identifier of the attribute type.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            AttributeType::Country => Self::COUNTRY_OID,
            AttributeType::State => Self::STATE_OID,
            AttributeType::Locality => Self::LOCALITY_OID,
            AttributeType::Organization => Self::ORGANIZATION_OID,
            AttributeType::OrganizationalUnit => Self::ORGANIZATIONAL_UNIT_OID,
            AttributeType::CommonName => Self::COMMON_NAME_OID,
            AttributeType::Other(oid) => *oid,
        }
    }

    /// Maps an object identifier to its attribute type.
    ///
    /// # Arguments
    /// * `oid` - The attribute type OID from a decoded name.
    ///
    /// # Returns
    /// The known type, or [`AttributeType::Other`] for any other OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        Self::ORDER
            .into_iter()
            .find(|kind| kind.oid() == oid)
            .unwrap_or(AttributeType::Other(oid))
    }

    fn select(self, fields: &SubjectFields) -> Option<&str> {
        let value = match self {
            AttributeType::Country => &fields.country,
            AttributeType::State => &fields.state,
            AttributeType::Locality => &fields.locality,
            AttributeType::Organization => &fields.organization,
            AttributeType::OrganizationalUnit => &fields.organizational_unit,
            AttributeType::CommonName => &fields.common_name,
            AttributeType::Other(_) => return None,
        };
        value.as_deref()
    }

}

impl fmt::Display for AttributeType {
    /// Short name (`C`, `ST`, `L`, `O`, `OU`, `CN`) or dotted OID.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Country => f.write_str("C"),
            AttributeType::State => f.write_str("ST"),
            AttributeType::Locality => f.write_str("L"),
            AttributeType::Organization => f.write_str("O"),
            AttributeType::OrganizationalUnit => f.write_str("OU"),
            AttributeType::CommonName => f.write_str("CN"),
            AttributeType::Other(oid) => write!(f, "{oid}"),
        }
    }
}

/// One (type, value) pair of a subject name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameAttribute {
    pub kind: AttributeType,
    pub value: String,
}

impl fmt::Display for NameAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// An ordered distinguished name.
///
/// Equality is order-sensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectName {
    attributes: Vec<NameAttribute>,
}

impl SubjectName {
    /// Validates `fields` and lays them out in C, ST, L, O, OU, CN order,
    /// skipping absent ones.
    pub fn build(fields: &SubjectFields) -> Result<Self> {
        if fields.common_name.as_deref().is_none_or(str::is_empty) {
            return Err(CsrError::MissingRequiredField(
                "Common name (CN) is required".to_string(),
            ));
        }

        let mut attributes = Vec::with_capacity(AttributeType::ORDER.len());
        for kind in AttributeType::ORDER {
            let Some(value) = kind.select(fields) else {
                continue;
            };
            if value.is_empty() {
                return Err(CsrError::InvalidArgument(format!(
                    "Subject field {kind} is present but empty"
                )));
            }
            if kind == AttributeType::Country && PrintableStringRef::new(value).is_err() {
                return Err(CsrError::InvalidArgument(format!(
                    "Country '{value}' is not a PrintableString"
                )));
            }
            attributes.push(NameAttribute {
                kind,
                value: value.to_string(),
            });
        }
        Ok(Self { attributes })
    }

    /// All attributes in encoded order.
    pub fn attributes(&self) -> &[NameAttribute] {
        &self.attributes
    }

    /// First value recorded for `kind`.
    pub fn get(&self, kind: AttributeType) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.kind == kind)
            .map(|attr| attr.value.as_str())
    }

    /// The CN value. Always present for names built here, possibly absent
    /// in a decoded foreign request.
    pub fn common_name(&self) -> Option<&str> {
        self.get(AttributeType::CommonName)
    }

    /// `"Type:Value"` strings in encoded order, e.g. `["C:CN", "CN:www.example.com"]`.
    pub fn to_display_list(&self) -> Vec<String> {
        self.attributes.iter().map(ToString::to_string).collect()
    }

    /// The well-known fields of this name; attributes of other types are dropped.
    pub fn to_fields(&self) -> SubjectFields {
        let owned = |kind| self.get(kind).map(str::to_string);
        SubjectFields {
            country: owned(AttributeType::Country),
            state: owned(AttributeType::State),
            locality: owned(AttributeType::Locality),
            organization: owned(AttributeType::Organization),
            organizational_unit: owned(AttributeType::OrganizationalUnit),
            common_name: owned(AttributeType::CommonName),
        }
    }

    /// Converts the name to an X.509-compatible format, one attribute per RDN.
    ///
    /// # Returns
    /// An `x509_cert::name::RdnSequence` in attribute order. Country is a
    /// PrintableString and everything else a UTF8String.
    pub fn to_rdn_sequence(&self) -> Result<RdnSequence> {
        let mut rdns = Vec::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            let value = match attr.kind {
                AttributeType::Country => {
                    Any::encode_from(&PrintableStringRef::new(&attr.value)?)?
                }
                _ => Any::encode_from(&Utf8StringRef::new(&attr.value)?)?,
            };
            let atv = AttributeTypeAndValue {
                oid: attr.kind.oid(),
                value,
            };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?));
        }
        Ok(RdnSequence::from(rdns))
    }

    /// Creates a `SubjectName` from an X.509-compatible format.
    ///
    /// Multi-valued RDNs are flattened in order and unknown attribute types
    /// are kept as [`AttributeType::Other`].
    ///
    /// # Arguments
    /// * `name` - A decoded `x509_cert::name::RdnSequence`.
    ///
    /// # Returns
    /// The name, or `MalformedEncoding` if a value is not a UTF8String,
    /// PrintableString or IA5String.
    pub fn from_rdn_sequence(name: &RdnSequence) -> Result<Self> {
        let mut attributes = Vec::new();
        for rdn in name.0.iter() {
            for atv in rdn.0.iter() {
                attributes.push(NameAttribute {
                    kind: AttributeType::from_oid(atv.oid),
                    value: directory_string(&atv.value)?,
                });
            }
        }
        Ok(Self { attributes })
    }
}

fn directory_string(value: &Any) -> Result<String> {
    let text = match value.tag() {
        Tag::Utf8String => value.decode_as::<Utf8StringRef<'_>>()?.as_str(),
        Tag::PrintableString => value.decode_as::<PrintableStringRef<'_>>()?.as_str(),
        Tag::Ia5String => value.decode_as::<Ia5StringRef<'_>>()?.as_str(),
        other => {
            return Err(CsrError::MalformedEncoding(format!(
                "unsupported attribute value type {other}"
            )));
        }
    };
    Ok(text.to_string())
}

/// Settings a [`crate::request::CertificateRequest`] is created with.
///
/// # Fields
/// * `signer_id` - SM2 signer ID used by `generate` and `verify` when none is given.
/// * `line_ending` - Line ending for PEM output.
#[derive(Clone, Debug, Builder)]
pub struct RequestConfig {
    #[builder(into, default = DEFAULT_SIGNER_ID.to_string())]
    pub signer_id: String,
    #[builder(default = LineEnding::LF)]
    pub line_ending: LineEnding,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
