//! Generic DER value model.
//!
//! [`DerValue`] is a tree of elements with no knowledge of what they mean.
//! Leaves are the `der` crate's ASN.1 types, which enforce the DER rules for
//! their content on both encode and decode. The tree adds nesting and
//! computes container lengths from the encoded children.
//!
//! ```
//! use sm2_csr::codec::DerValue;
//!
//! let value = DerValue::Sequence(vec![
//!     DerValue::Boolean(true),
//!     DerValue::Utf8String("example".to_string()),
//! ]);
//! let encoded = value.encode().unwrap();
//! assert_eq!(DerValue::decode(&encoded).unwrap(), value);
//! ```

use const_oid::ObjectIdentifier;
use der::asn1::{
    Any, AnyRef, BitString, Ia5StringRef, Int, Null, OctetString, PrintableStringRef,
    Utf8StringRef,
};
use der::{
    Decode, Encode, EncodeValue, Header, Length, Reader, SliceReader, Tag, TagNumber, Tagged,
    Writer,
};

use crate::error::{CsrError, Result};

/// Nesting bound for decoding; requests are at most five levels deep.
const MAX_DEPTH: usize = 32;

/// A decoded DER element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DerValue {
    Boolean(bool),
    Integer(Int),
    BitString(BitString),
    OctetString(OctetString),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Utf8String(String),
    PrintableString(String),
    Ia5String(String),
    Sequence(Vec<DerValue>),
    Set(Vec<DerValue>),
    /// Constructed context-specific element, e.g. `[0] IMPLICIT SET OF`.
    ContextSpecific {
        number: TagNumber,
        children: Vec<DerValue>,
    },
    /// Any other element, kept as received.
    Other(Any),
}

impl DerValue {
    /// Encodes the value as DER.
    ///
    /// Children are written in the order given, so a SET is only canonical
    /// if the caller supplies its elements sorted.
    ///
    /// # Returns
    /// The encoded bytes, or `MalformedEncoding` when a string holds
    /// characters its type does not allow.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_der()?)
    }

    /// Decodes exactly one DER element; anything after it is an error.
    ///
    /// # Arguments
    /// * `bytes` - A complete DER encoding.
    ///
    /// # Returns
    /// The decoded tree, or `MalformedEncoding` for truncated, non-canonical,
    /// over-nested or trailing input.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = SliceReader::new(bytes)?;
        let value = Self::read(&mut reader, 0)?;
        if !reader.is_finished() {
            return Err(CsrError::MalformedEncoding(format!(
                "{} trailing bytes after DER element",
                usize::try_from(reader.remaining_len())?
            )));
        }
        Ok(value)
    }

    fn read(reader: &mut SliceReader<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(CsrError::malformed("DER nesting too deep"));
        }
        let any = AnyRef::decode(reader)?;
        let value = match any.tag() {
            Tag::Boolean => DerValue::Boolean(any.decode_as()?),
            Tag::Integer => DerValue::Integer(any.decode_as()?),
            Tag::BitString => DerValue::BitString(any.decode_as()?),
            Tag::OctetString => DerValue::OctetString(any.decode_as()?),
            Tag::Null => {
                any.decode_as::<Null>()?;
                DerValue::Null
            }
            Tag::ObjectIdentifier => DerValue::ObjectIdentifier(any.decode_as()?),
            Tag::Utf8String => {
                DerValue::Utf8String(any.decode_as::<Utf8StringRef<'_>>()?.as_str().to_string())
            }
            Tag::PrintableString => DerValue::PrintableString(
                any.decode_as::<PrintableStringRef<'_>>()?
                    .as_str()
                    .to_string(),
            ),
            Tag::Ia5String => {
                DerValue::Ia5String(any.decode_as::<Ia5StringRef<'_>>()?.as_str().to_string())
            }
            Tag::Sequence => DerValue::Sequence(Self::read_children(any.value(), depth)?),
            Tag::Set => DerValue::Set(Self::read_children(any.value(), depth)?),
            Tag::ContextSpecific {
                constructed: true,
                number,
            } => DerValue::ContextSpecific {
                number,
                children: Self::read_children(any.value(), depth)?,
            },
            _ => DerValue::Other(any.into()),
        };
        Ok(value)
    }

    fn read_children(content: &[u8], depth: usize) -> Result<Vec<DerValue>> {
        let mut reader = SliceReader::new(content)?;
        let mut children = Vec::new();
        while !reader.is_finished() {
            children.push(Self::read(&mut reader, depth + 1)?);
        }
        Ok(children)
    }

    /// The children of a SEQUENCE, or `None` for any other element.
    pub fn as_sequence(&self) -> Option<&[DerValue]> {
        match self {
            DerValue::Sequence(children) => Some(children),
            _ => None,
        }
    }

    /// Text of any of the three string types.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DerValue::Utf8String(s) | DerValue::PrintableString(s) | DerValue::Ia5String(s) => {
                Some(s)
            }
            _ => None,
        }
    }
}

impl Tagged for DerValue {
    fn tag(&self) -> Tag {
        match self {
            DerValue::Boolean(_) => Tag::Boolean,
            DerValue::Integer(_) => Tag::Integer,
            DerValue::BitString(_) => Tag::BitString,
            DerValue::OctetString(_) => Tag::OctetString,
            DerValue::Null => Tag::Null,
            DerValue::ObjectIdentifier(_) => Tag::ObjectIdentifier,
            DerValue::Utf8String(_) => Tag::Utf8String,
            DerValue::PrintableString(_) => Tag::PrintableString,
            DerValue::Ia5String(_) => Tag::Ia5String,
            DerValue::Sequence(_) => Tag::Sequence,
            DerValue::Set(_) => Tag::Set,
            DerValue::ContextSpecific { number, .. } => Tag::ContextSpecific {
                constructed: true,
                number: *number,
            },
            DerValue::Other(any) => any.tag(),
        }
    }
}

impl EncodeValue for DerValue {
    fn value_len(&self) -> der::Result<Length> {
        match self {
            DerValue::Boolean(value) => value.value_len(),
            DerValue::Integer(value) => value.value_len(),
            DerValue::BitString(value) => value.value_len(),
            DerValue::OctetString(value) => value.value_len(),
            DerValue::Null => Null.value_len(),
            DerValue::ObjectIdentifier(value) => value.value_len(),
            DerValue::Utf8String(value) => Utf8StringRef::new(value)?.value_len(),
            DerValue::PrintableString(value) => PrintableStringRef::new(value)?.value_len(),
            DerValue::Ia5String(value) => Ia5StringRef::new(value)?.value_len(),
            DerValue::Sequence(children)
            | DerValue::Set(children)
            | DerValue::ContextSpecific { children, .. } => children
                .iter()
                .try_fold(Length::ZERO, |len, child| len + child.encoded_len()?),
            DerValue::Other(any) => any.value_len(),
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        match self {
            DerValue::Boolean(value) => value.encode_value(writer),
            DerValue::Integer(value) => value.encode_value(writer),
            DerValue::BitString(value) => value.encode_value(writer),
            DerValue::OctetString(value) => value.encode_value(writer),
            DerValue::Null => Null.encode_value(writer),
            DerValue::ObjectIdentifier(value) => value.encode_value(writer),
            DerValue::Utf8String(value) => Utf8StringRef::new(value)?.encode_value(writer),
            DerValue::PrintableString(value) => {
                PrintableStringRef::new(value)?.encode_value(writer)
            }
            DerValue::Ia5String(value) => Ia5StringRef::new(value)?.encode_value(writer),
            DerValue::Sequence(children)
            | DerValue::Set(children)
            | DerValue::ContextSpecific { children, .. } => children
                .iter()
                .try_for_each(|child| Encode::encode(child, writer)),
            DerValue::Other(any) => any.encode_value(writer),
        }
    }
}

/// A child element borrowed from its enclosing buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawElement<'a> {
    pub tag: Tag,
    pub content: &'a [u8],
    /// The full TLV, header included, exactly as it appears in the input.
    pub encoded: &'a [u8],
}

/// Splits a buffer holding exactly one SEQUENCE into its children without
/// re-encoding them.
///
/// # Arguments
/// * `bytes` - The DER encoding of a single SEQUENCE.
///
/// # Returns
/// The children in order, each borrowing its exact bytes from `bytes`.
pub fn sequence_elements(bytes: &[u8]) -> Result<Vec<RawElement<'_>>> {
    let mut reader = SliceReader::new(bytes)?;
    let header = Header::decode(&mut reader)?;
    if header.tag != Tag::Sequence {
        return Err(CsrError::MalformedEncoding(format!(
            "expected SEQUENCE, found {}",
            header.tag
        )));
    }
    let content = reader.read_slice(header.length)?;
    if !reader.is_finished() {
        return Err(CsrError::malformed("trailing bytes after outer SEQUENCE"));
    }

    let mut inner = SliceReader::new(content)?;
    let mut elements = Vec::new();
    while !inner.is_finished() {
        let start = usize::try_from(inner.position())?;
        let child = Header::decode(&mut inner)?;
        let child_content = inner.read_slice(child.length)?;
        let end = usize::try_from(inner.position())?;
        elements.push(RawElement {
            tag: child.tag,
            content: child_content,
            encoded: &content[start..end],
        });
    }
    tracing::trace!(children = elements.len(), "split DER sequence");
    Ok(elements)
}
