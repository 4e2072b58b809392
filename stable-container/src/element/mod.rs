//! Leaf elements carried by stable container fields.
//!
//! [`ElementType`] is the schema-side description of a field and [`Element`]
//! the value-side. Size classification is a property of the type alone, so
//! the encoder and decoder always agree on which fields are fixed-size.

mod ssz;

use std::{fmt, sync::Arc};

use crate::{StableSchema, StableValue};

/// Type of the element stored in a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    /// A single byte, `0x00` or `0x01`.
    Boolean,
    /// Little-endian unsigned integers.
    Uint8,
    /// 2-byte unsigned integer.
    Uint16,
    /// 4-byte unsigned integer.
    Uint32,
    /// 8-byte unsigned integer.
    Uint64,
    /// 16-byte unsigned integer.
    Uint128,
    /// 32-byte unsigned integer.
    Uint256,
    /// Exactly this many bytes.
    ByteVector(usize),
    /// Up to this many bytes.
    ByteList(usize),
    /// A nested stable container. Always variable-size.
    Stable(Arc<StableSchema>),
}

impl ElementType {
    /// Encoded size if every value of this type has the same length.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ElementType::Boolean | ElementType::Uint8 => Some(1),
            ElementType::Uint16 => Some(2),
            ElementType::Uint32 => Some(4),
            ElementType::Uint64 => Some(8),
            ElementType::Uint128 => Some(16),
            ElementType::Uint256 => Some(32),
            ElementType::ByteVector(len) => Some(*len),
            ElementType::ByteList(_) | ElementType::Stable(_) => None,
        }
    }

    /// Whether values of this type are placed in the variable region.
    pub fn is_variable_size(&self) -> bool {
        self.fixed_size().is_none()
    }

    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Boolean => "boolean",
            ElementType::Uint8 => "uint8",
            ElementType::Uint16 => "uint16",
            ElementType::Uint32 => "uint32",
            ElementType::Uint64 => "uint64",
            ElementType::Uint128 => "uint128",
            ElementType::Uint256 => "uint256",
            ElementType::ByteVector(_) => "byte vector",
            ElementType::ByteList(_) => "byte list",
            ElementType::Stable(_) => "stable container",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::ByteVector(len) => write!(f, "ByteVector[{}]", len),
            ElementType::ByteList(limit) => write!(f, "ByteList[{}]", limit),
            ElementType::Stable(schema) => {
                write!(f, "StableContainer[{}, {}]", schema.name(), schema.capacity())
            }
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A concrete value for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A `Boolean` value.
    Boolean(bool),
    /// A `Uint8` value.
    Uint8(u8),
    /// A `Uint16` value.
    Uint16(u16),
    /// A `Uint32` value.
    Uint32(u32),
    /// A `Uint64` value.
    Uint64(u64),
    /// A `Uint128` value.
    Uint128(u128),
    /// Little-endian bytes of a 256-bit unsigned integer.
    Uint256([u8; 32]),
    /// Bytes of a `ByteVector`; the length must match the type.
    ByteVector(Vec<u8>),
    /// Bytes of a `ByteList`, at most the type's limit.
    ByteList(Vec<u8>),
    /// A nested stable container value.
    Stable(StableValue),
}

impl Element {
    /// Whether this value is a legal instance of `element_type`.
    ///
    /// Nested stable values are checked recursively against their schema.
    pub fn conforms_to(&self, element_type: &ElementType) -> bool {
        match (self, element_type) {
            (Element::Boolean(_), ElementType::Boolean)
            | (Element::Uint8(_), ElementType::Uint8)
            | (Element::Uint16(_), ElementType::Uint16)
            | (Element::Uint32(_), ElementType::Uint32)
            | (Element::Uint64(_), ElementType::Uint64)
            | (Element::Uint128(_), ElementType::Uint128)
            | (Element::Uint256(_), ElementType::Uint256) => true,
            (Element::ByteVector(bytes), ElementType::ByteVector(len)) => bytes.len() == *len,
            (Element::ByteList(bytes), ElementType::ByteList(limit)) => bytes.len() <= *limit,
            (Element::Stable(value), ElementType::Stable(schema)) => {
                schema.check_value(value).is_ok()
            }
            _ => false,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Boolean(_) => "boolean",
            Element::Uint8(_) => "uint8",
            Element::Uint16(_) => "uint16",
            Element::Uint32(_) => "uint32",
            Element::Uint64(_) => "uint64",
            Element::Uint128(_) => "uint128",
            Element::Uint256(_) => "uint256",
            Element::ByteVector(_) => "byte vector",
            Element::ByteList(_) => "byte list",
            Element::Stable(_) => "stable container",
        }
    }
}
