//! SSZ serialization and hash tree roots for leaf elements.
//!
//! Basic values and byte sequences go through `ethereum_ssz`; nested stable
//! containers go through this crate's codec.

use ssz::{Decode, DecodeError, Encode};
use tree_hash::TreeHash;

use super::{Element, ElementType};
use crate::{
    codec,
    hash::{chunk_count, merkleize_bytes, mix_in_length, MerkleHasher},
    merkle, StableContainerError,
};

fn invalid_element(element_type: &ElementType, e: DecodeError) -> StableContainerError {
    StableContainerError::InvalidElement(format!("{}: {:?}", element_type, e))
}

/// Root of a basic value. It fits one chunk, so no hashing is involved and
/// the result holds for every hasher.
fn basic_root<T: TreeHash>(value: &T) -> [u8; 32] {
    value.tree_hash_root().0
}

impl Element {
    /// Append the SSZ encoding of this element to `out`.
    ///
    /// `element_type` is needed to encode nested stable containers.
    pub fn serialize_into(
        &self,
        element_type: &ElementType,
        out: &mut Vec<u8>,
    ) -> Result<(), StableContainerError> {
        match (self, element_type) {
            (Element::Boolean(value), _) => value.ssz_append(out),
            (Element::Uint8(value), _) => value.ssz_append(out),
            (Element::Uint16(value), _) => value.ssz_append(out),
            (Element::Uint32(value), _) => value.ssz_append(out),
            (Element::Uint64(value), _) => value.ssz_append(out),
            (Element::Uint128(value), _) => value.ssz_append(out),
            (Element::Uint256(bytes), _) => bytes.ssz_append(out),
            (Element::ByteVector(bytes), _) | (Element::ByteList(bytes), _) => {
                bytes.ssz_append(out)
            }
            (Element::Stable(value), ElementType::Stable(schema)) => {
                out.extend_from_slice(&codec::encode(schema, value)?)
            }
            (Element::Stable(_), other) => {
                return Err(StableContainerError::InvalidValue(format!(
                    "stable container element does not conform to {}",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Length of this element's SSZ encoding.
    pub fn encoded_len(&self, element_type: &ElementType) -> Result<usize, StableContainerError> {
        let len = match (self, element_type) {
            (Element::Boolean(value), _) => value.ssz_bytes_len(),
            (Element::Uint8(value), _) => value.ssz_bytes_len(),
            (Element::Uint16(value), _) => value.ssz_bytes_len(),
            (Element::Uint32(value), _) => value.ssz_bytes_len(),
            (Element::Uint64(value), _) => value.ssz_bytes_len(),
            (Element::Uint128(value), _) => value.ssz_bytes_len(),
            (Element::Uint256(bytes), _) => bytes.ssz_bytes_len(),
            (Element::ByteVector(bytes), _) | (Element::ByteList(bytes), _) => {
                bytes.ssz_bytes_len()
            }
            (Element::Stable(value), ElementType::Stable(schema)) => {
                codec::encoded_len(schema, value)?
            }
            (Element::Stable(_), other) => {
                return Err(StableContainerError::InvalidValue(format!(
                    "stable container element does not conform to {}",
                    other
                )));
            }
        };
        Ok(len)
    }

    /// Decode an element of `element_type` occupying exactly `bytes`.
    pub fn deserialize(
        bytes: &[u8],
        element_type: &ElementType,
    ) -> Result<Self, StableContainerError> {
        let invalid = |e: DecodeError| invalid_element(element_type, e);
        let element = match element_type {
            ElementType::Boolean => Element::Boolean(bool::from_ssz_bytes(bytes).map_err(invalid)?),
            ElementType::Uint8 => Element::Uint8(u8::from_ssz_bytes(bytes).map_err(invalid)?),
            ElementType::Uint16 => Element::Uint16(u16::from_ssz_bytes(bytes).map_err(invalid)?),
            ElementType::Uint32 => Element::Uint32(u32::from_ssz_bytes(bytes).map_err(invalid)?),
            ElementType::Uint64 => Element::Uint64(u64::from_ssz_bytes(bytes).map_err(invalid)?),
            ElementType::Uint128 => {
                Element::Uint128(u128::from_ssz_bytes(bytes).map_err(invalid)?)
            }
            ElementType::Uint256 => {
                Element::Uint256(<[u8; 32]>::from_ssz_bytes(bytes).map_err(invalid)?)
            }
            ElementType::ByteVector(len) => {
                if bytes.len() != *len {
                    return Err(invalid(DecodeError::InvalidByteLength {
                        len: bytes.len(),
                        expected: *len,
                    }));
                }
                Element::ByteVector(Vec::<u8>::from_ssz_bytes(bytes).map_err(invalid)?)
            }
            ElementType::ByteList(limit) => {
                if bytes.len() > *limit {
                    return Err(invalid(DecodeError::BytesInvalid(format!(
                        "{} bytes exceed the limit",
                        bytes.len()
                    ))));
                }
                Element::ByteList(Vec::<u8>::from_ssz_bytes(bytes).map_err(invalid)?)
            }
            ElementType::Stable(schema) => Element::Stable(codec::decode_nested(bytes, schema)?),
        };
        Ok(element)
    }

    /// Hash tree root of this element as an instance of `element_type`.
    pub fn hash_tree_root<H: MerkleHasher>(
        &self,
        element_type: &ElementType,
    ) -> Result<[u8; 32], StableContainerError> {
        if !self.conforms_to(element_type) {
            return Err(StableContainerError::InvalidValue(format!(
                "{} element does not conform to {}",
                self.type_name(),
                element_type
            )));
        }
        match (self, element_type) {
            (Element::Boolean(value), _) => Ok(basic_root(value)),
            (Element::Uint8(value), _) => Ok(basic_root(value)),
            (Element::Uint16(value), _) => Ok(basic_root(value)),
            (Element::Uint32(value), _) => Ok(basic_root(value)),
            (Element::Uint64(value), _) => Ok(basic_root(value)),
            (Element::Uint128(value), _) => Ok(basic_root(&value.to_le_bytes())),
            (Element::Uint256(bytes), _) => Ok(basic_root(bytes)),
            (Element::ByteVector(bytes), ElementType::ByteVector(len)) => {
                merkleize_bytes::<H>(bytes, chunk_count(*len))
            }
            (Element::ByteList(bytes), ElementType::ByteList(limit)) => {
                let root = merkleize_bytes::<H>(bytes, chunk_count(*limit))?;
                Ok(mix_in_length::<H>(&root, bytes.len()))
            }
            (Element::Stable(value), ElementType::Stable(schema)) => {
                merkle::hash_tree_root_with::<H>(schema, value)
            }
            _ => Err(StableContainerError::InvalidValue(format!(
                "{} element does not conform to {}",
                self.type_name(),
                element_type
            ))),
        }
    }
}
