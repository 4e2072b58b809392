//! Stable containers: records whose field set can grow without breaking old
//! encodings or changing old roots.
//!
//! A stable container type is a [`StableSchema`]: an ordered field list
//! bound to a fixed capacity `N`. Each field is required or optional. Later
//! versions of a type may only append optional fields, and `N` never changes.
//!
//! # Wire format
//!
//! `presence bits (ceil(N/8) bytes) || fixed region || variable region`
//!
//! Only present fields are encoded. See [`codec`].
//!
//! # Root
//!
//! `H(merkleize(field leaves padded to N) || hash_tree_root(presence bits))`
//!
//! Tree depth is fixed by `N`, so a value's root is the same under every
//! schema version that can express it. See [`merkle`].

#![warn(missing_docs)]

pub mod codec;
pub mod element;
mod error;
pub mod hash;
pub mod merkle;
pub mod plan;
mod presence;
pub mod proof;
pub mod schema;
mod value;


pub use codec::{decode, decode_with_capacity, encode, encoded_len};
pub use element::{Element, ElementType};
pub use error::StableContainerError;
#[cfg(feature = "blake3")]
pub use hash::Blake3Hasher;
pub use hash::{MerkleHasher, Sha256Hasher};
pub use merkle::{hash_tree_root, hash_tree_root_with};
pub use plan::{FieldPlan, FieldSlot, SlotSize};
pub use presence::BitPresenceVector;
pub use proof::FieldProof;
pub use schema::{FieldDescriptor, StableSchema, MAX_BYTE_LEN, MAX_CAPACITY};
pub use value::{FieldValue, StableValue};

/// `tracing` target for every event this crate emits.
pub(crate) const LOG_TARGET: &str = "stable_container";
