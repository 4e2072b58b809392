//! Wire format of a stable container.
//!
//! ```text
//! presence bits (ceil(N/8) bytes) || fixed region || variable region
//! ```
//!
//! The fixed region holds, in field order, each active fixed-size element in
//! place and a 4-byte little-endian offset for each active variable-size
//! element. Offsets count from the start of the fixed region. Inactive fields
//! occupy no bytes at all.

mod decode;
mod encode;

pub(crate) use decode::decode_nested;
pub use decode::{decode, decode_with_capacity};
pub use encode::{encode, encoded_len};
