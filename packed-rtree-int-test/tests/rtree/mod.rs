//! Integration tests for the packed R-tree.
//!
//! These tests persist trees to disk behind a foreign header and query them
//! back through the file-backed and memory-mapped readers.

mod file_search_test;
mod persistence_test;
