//! Chunk hashing and chunked Merkleization.
//!
//! Every tree in this crate is a complete binary tree of 32-byte chunks whose
//! leaf count is the next power of two at or above a declared limit. Missing
//! leaves are zero chunks, so a missing subtree of depth `d` hashes to
//! `zero_hash(d)`:
//!
//! `zero_hash(0) = [0; 32]`, `zero_hash(d + 1) = H(zero_hash(d) || zero_hash(d))`
//!
//! The SHA-256 trees are the SSZ ones and are built by `tree_hash`. Other
//! hashers get the same construction from the default methods of
//! [`MerkleHasher`].

use tree_hash::Hash256;

use crate::StableContainerError;

/// Size of a Merkle chunk in bytes.
pub const BYTES_PER_CHUNK: usize = tree_hash::BYTES_PER_CHUNK;

/// The all-zero chunk used for absent fields and padding leaves.
pub const ZERO_CHUNK: [u8; 32] = [0u8; 32];

/// Deepest tree any element or container in this crate can produce.
///
/// Byte types are bounded by the 32-bit offset width, so their chunk count
/// stays below `2^27`.
pub const MAX_TREE_DEPTH: u32 = 48;

/// Two-to-one compression function used to build every tree in this crate.
pub trait MerkleHasher {
    /// Hash the concatenation `left || right`.
    fn hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32];

    /// Mix an auxiliary root into a tree root: `H(root || aux)`.
    fn mix_in(root: &[u8; 32], aux: &[u8; 32]) -> [u8; 32] {
        Self::hash(root, aux)
    }

    /// Root of an all-zero subtree of the given depth.
    fn zero_hash(depth: u32) -> [u8; 32] {
        let mut hash = ZERO_CHUNK;
        for _ in 0..depth {
            hash = Self::hash(&hash, &hash);
        }
        hash
    }

    /// Root of `bytes` packed into chunks and padded to `limit` leaves.
    ///
    /// Callers guarantee `bytes` fits in `limit` chunks.
    fn merkle_root(bytes: &[u8], limit: usize) -> [u8; 32] {
        let mut layer: Vec<[u8; 32]> = bytes
            .chunks(BYTES_PER_CHUNK)
            .map(|piece| {
                let mut chunk = ZERO_CHUNK;
                chunk[..piece.len()].copy_from_slice(piece);
                chunk
            })
            .collect();
        let depth = tree_depth(limit);
        if layer.is_empty() {
            return Self::zero_hash(depth);
        }
        let mut zero = ZERO_CHUNK;
        for _ in 0..depth {
            if layer.len() % 2 == 1 {
                layer.push(zero);
            }
            layer = layer
                .chunks(2)
                .map(|pair| Self::hash(&pair[0], &pair[1]))
                .collect();
            zero = Self::hash(&zero, &zero);
        }
        layer[0]
    }

    /// Mix a length into a root: `H(root || len as little-endian uint256)`.
    fn mix_in_length(root: &[u8; 32], length: usize) -> [u8; 32] {
        let mut length_chunk = ZERO_CHUNK;
        length_chunk[..8].copy_from_slice(&(length as u64).to_le_bytes());
        Self::mix_in(root, &length_chunk)
    }
}

/// SHA-256, the hash the SSZ Merkleization rules are defined over.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl MerkleHasher for Sha256Hasher {
    fn hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        ethereum_hashing::hash32_concat(left, right)
    }

    fn zero_hash(depth: u32) -> [u8; 32] {
        let cached: &[[u8; 32]] = &ethereum_hashing::ZERO_HASHES;
        match cached.get(depth as usize) {
            Some(hash) => *hash,
            None => {
                let mut hash = cached[ethereum_hashing::ZERO_HASHES_MAX_INDEX];
                for _ in ethereum_hashing::ZERO_HASHES_MAX_INDEX as u32..depth {
                    hash = Self::hash(&hash, &hash);
                }
                hash
            }
        }
    }

    fn merkle_root(bytes: &[u8], limit: usize) -> [u8; 32] {
        tree_hash::merkle_root(bytes, limit).0
    }

    fn mix_in_length(root: &[u8; 32], length: usize) -> [u8; 32] {
        tree_hash::mix_in_length(&Hash256::from(*root), length).0
    }
}

/// Blake3 over the 64-byte concatenation, matching GroveDB's dense trees.
#[cfg(feature = "blake3")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

#[cfg(feature = "blake3")]
impl MerkleHasher for Blake3Hasher {
    fn hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left);
        hasher.update(right);
        *hasher.finalize().as_bytes()
    }
}

/// Depth of a tree holding `limit` leaves: `ceil(log2(limit))`, with 0 for a
/// limit of 0 or 1.
pub fn tree_depth(limit: usize) -> u32 {
    if limit <= 1 {
        0
    } else {
        usize::BITS - (limit - 1).leading_zeros()
    }
}

/// Root of an all-zero subtree of the given depth.
pub fn zero_hash<H: MerkleHasher>(depth: u32) -> [u8; 32] {
    H::zero_hash(depth)
}

/// Number of chunks needed to hold `byte_len` bytes.
pub fn chunk_count(byte_len: usize) -> usize {
    byte_len.div_ceil(BYTES_PER_CHUNK)
}

fn check_limit(chunks: usize, limit: usize) -> Result<(), StableContainerError> {
    if chunks > limit {
        return Err(StableContainerError::CapacityExceeded {
            fields: chunks,
            capacity: limit,
        });
    }
    if tree_depth(limit) > MAX_TREE_DEPTH {
        return Err(StableContainerError::InvalidSchema(format!(
            "a limit of {} chunks exceeds the maximum tree depth {}",
            limit, MAX_TREE_DEPTH
        )));
    }
    Ok(())
}

/// Merkleize `chunks` into a tree padded to `limit` leaves.
///
/// The tree depth depends only on `limit`, never on how many chunks are
/// supplied. Fails if more chunks than `limit` are supplied.
pub fn merkleize<H: MerkleHasher>(
    chunks: &[[u8; 32]],
    limit: usize,
) -> Result<[u8; 32], StableContainerError> {
    check_limit(chunks.len(), limit)?;
    Ok(H::merkle_root(&chunks.concat(), limit))
}

/// Pack `bytes` into chunks and merkleize them padded to `limit` leaves.
pub fn merkleize_bytes<H: MerkleHasher>(
    bytes: &[u8],
    limit: usize,
) -> Result<[u8; 32], StableContainerError> {
    check_limit(chunk_count(bytes.len()), limit)?;
    Ok(H::merkle_root(bytes, limit))
}

/// Sibling hashes from leaf `index` up to the root of the padded tree.
///
/// The branch always has exactly `tree_depth(limit)` entries.
pub fn merkle_branch<H: MerkleHasher>(
    chunks: &[[u8; 32]],
    limit: usize,
    index: usize,
) -> Result<Vec<[u8; 32]>, StableContainerError> {
    check_limit(chunks.len(), limit)?;
    if index >= limit.max(1) {
        return Err(StableContainerError::InvalidProof(format!(
            "leaf index {} is out of range (limit={})",
            index, limit
        )));
    }

    let depth = tree_depth(limit);
    let mut branch = Vec::with_capacity(depth as usize);
    let mut layer = chunks.to_vec();
    let mut position = index;
    for level in 0..depth {
        let zero = H::zero_hash(level);
        branch.push(layer.get(position ^ 1).copied().unwrap_or(zero));
        if layer.len() % 2 == 1 {
            layer.push(zero);
        }
        layer = layer
            .chunks(2)
            .map(|pair| H::hash(&pair[0], &pair[1]))
            .collect();
        position /= 2;
    }
    Ok(branch)
}

/// Recompute a tree root from a leaf, its index and its sibling branch.
pub fn root_from_branch<H: MerkleHasher>(
    leaf: &[u8; 32],
    branch: &[[u8; 32]],
    index: usize,
) -> [u8; 32] {
    let mut hash = *leaf;
    let mut position = index;
    for sibling in branch {
        hash = if position % 2 == 0 {
            H::hash(&hash, sibling)
        } else {
            H::hash(sibling, &hash)
        };
        position /= 2;
    }
    hash
}

/// Mix a length into a root: `H(root || len as little-endian uint256)`.
pub fn mix_in_length<H: MerkleHasher>(root: &[u8; 32], length: usize) -> [u8; 32] {
    H::mix_in_length(root, length)
}
