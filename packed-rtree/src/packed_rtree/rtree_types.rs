//! Error, result and statistics types for the packed R-tree.

use std::io;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while building, loading, querying or writing a tree
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: u64, actual: u64 },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

// ============================================================================
// Statistics
// ============================================================================

/// Shape of a built tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub num_items: u64,
    pub num_nodes: u64,
    pub node_size: u16,
    /// Number of levels, leaves included
    pub height: u32,
    /// Serialized size in bytes
    pub size_bytes: u64,
}

/// I/O performed by one streaming query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSearchStats {
    /// Number of windowed read calls issued
    pub reads: u64,
    /// Total node records fetched across all reads
    pub nodes_read: u64,
}
