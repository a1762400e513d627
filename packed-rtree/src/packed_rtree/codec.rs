//! Encoding of node records.
//!
//! A record is `min_x, min_y, max_x, max_y` as little-endian IEEE-754 f64
//! followed by `offset` as a little-endian u64: 40 bytes, no padding, no
//! framing. Records are stored back to back.

use crate::node_item::NodeItem;

use super::rtree_constants::NODE_ITEM_LEN;
use super::rtree_types::{SpatialError, SpatialResult};

fn config() -> bincode::config::Configuration<
    bincode::config::LittleEndian,
    bincode::config::Fixint,
    bincode::config::NoLimit,
> {
    bincode::config::legacy()
}

/// Writes one record into the first [`NODE_ITEM_LEN`] bytes of `dst`.
pub fn encode_node(node: &NodeItem, dst: &mut [u8]) -> SpatialResult<()> {
    bincode::serde::encode_into_slice(node, dst, config())
        .map(|_| ())
        .map_err(|e| SpatialError::Serialization(e.to_string()))
}

/// Reads one record from the first [`NODE_ITEM_LEN`] bytes of `src`.
pub fn decode_node(src: &[u8]) -> SpatialResult<NodeItem> {
    bincode::serde::decode_from_slice::<NodeItem, _>(src, config())
        .map(|(node, _)| node)
        .map_err(|e| SpatialError::Serialization(e.to_string()))
}

/// Encodes consecutive records into a fresh buffer.
pub fn encode_nodes(nodes: &[NodeItem]) -> SpatialResult<Vec<u8>> {
    let mut buf = vec![0u8; nodes.len() * NODE_ITEM_LEN];
    for (node, chunk) in nodes.iter().zip(buf.chunks_exact_mut(NODE_ITEM_LEN)) {
        encode_node(node, chunk)?;
    }
    Ok(buf)
}

/// Decodes `dst.len()` consecutive records from `src`.
pub fn decode_nodes_into(src: &[u8], dst: &mut [NodeItem]) -> SpatialResult<()> {
    let expected = dst.len() * NODE_ITEM_LEN;
    if src.len() < expected {
        return Err(SpatialError::BufferTooSmall {
            expected: expected as u64,
            actual: src.len() as u64,
        });
    }
    for (node, chunk) in dst.iter_mut().zip(src.chunks_exact(NODE_ITEM_LEN)) {
        *node = decode_node(chunk)?;
    }
    Ok(())
}
