//! Node readers over common storage media.
//!
//! A serialized tree usually sits inside a larger file, after whatever header
//! the containing format writes. Every reader here therefore takes the byte
//! offset at which the tree starts; node `i` lives at
//! `base_offset + i * NODE_ITEM_LEN`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::rtree_constants::NODE_ITEM_LEN;
use super::rtree_types::{SpatialError, SpatialResult};
use super::stream_search::NodeReader;

/// Absolute byte position of `node_index` in a tree starting at `base_offset`.
fn byte_offset(base_offset: u64, node_index: u64) -> SpatialResult<u64> {
    node_index
        .checked_mul(NODE_ITEM_LEN as u64)
        .and_then(|rel| rel.checked_add(base_offset))
        .ok_or_else(|| {
            SpatialError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Node index {} is out of addressable range", node_index),
            ))
        })
}

/// Converts a byte position to an in-memory index.
fn to_index(pos: u64) -> SpatialResult<usize> {
    usize::try_from(pos).map_err(|_| {
        SpatialError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Byte position {} is out of addressable range", pos),
        ))
    })
}

/// Copies one window out of an in-memory byte source.
fn copy_window(data: &[u8], base_offset: u64, node_index: u64, buf: &mut [u8]) -> SpatialResult<()> {
    let start = byte_offset(base_offset, node_index)?;
    let end = start.saturating_add(buf.len() as u64);
    if end > data.len() as u64 {
        return Err(SpatialError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "Window {}..{} exceeds source of {} bytes",
                start,
                end,
                data.len()
            ),
        )));
    }
    buf.copy_from_slice(&data[to_index(start)?..to_index(end)?]);
    Ok(())
}

/// Reads nodes from a serialized tree already in memory.
#[derive(Debug, Clone, Copy)]
pub struct SliceNodeReader<'a> {
    data: &'a [u8],
    base_offset: u64,
}

impl<'a> SliceNodeReader<'a> {
    /// Reader over a buffer holding exactly the tree.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base_offset(data, 0)
    }

    /// Reader over a buffer in which the tree starts at `base_offset`.
    pub fn with_base_offset(data: &'a [u8], base_offset: u64) -> Self {
        Self { data, base_offset }
    }
}

impl NodeReader for SliceNodeReader<'_> {
    fn read_nodes(&mut self, buf: &mut [u8], node_index: u64, _count: usize) -> SpatialResult<()> {
        copy_window(self.data, self.base_offset, node_index, buf)
    }
}

/// Reads nodes from a file, one seek and one read per window.
///
/// Nothing is cached: each call to `read_nodes` goes to the file.
#[derive(Debug)]
pub struct FileNodeReader {
    file: File,
    path: Option<PathBuf>,
    base_offset: u64,
}

impl FileNodeReader {
    /// Opens `path` read-only; the tree starts at `base_offset`.
    pub fn open(path: impl AsRef<Path>, base_offset: u64) -> SpatialResult<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            file,
            path: Some(path.as_ref().to_path_buf()),
            base_offset,
        })
    }

    /// Wraps an already opened file; the tree starts at `base_offset`.
    pub fn from_file(file: File, base_offset: u64) -> Self {
        Self {
            file,
            path: None,
            base_offset,
        }
    }

    /// Path the reader was opened from, if it was opened by path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl NodeReader for FileNodeReader {
    fn read_nodes(&mut self, buf: &mut [u8], node_index: u64, _count: usize) -> SpatialResult<()> {
        let offset = byte_offset(self.base_offset, node_index)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }
}

/// Reads nodes from a memory-mapped file.
///
/// The mapping is read-only; the file must not be truncated while mapped.
#[derive(Debug)]
pub struct MmapNodeReader {
    mmap: Mmap,
    base_offset: u64,
}

impl MmapNodeReader {
    /// Maps `path`; the tree starts at `base_offset`.
    pub fn open(path: impl AsRef<Path>, base_offset: u64) -> SpatialResult<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };
        log::debug!("Mapped {:?}: {} bytes", path.as_ref(), mmap.len());
        Ok(Self { mmap, base_offset })
    }

    /// The mapped bytes from the start of the tree to the end of the file.
    ///
    /// Suitable for [`PackedRTree::from_bytes`](crate::PackedRTree::from_bytes).
    /// Empty when the base offset lies past the end of the file.
    pub fn tree_bytes(&self) -> &[u8] {
        let start = usize::try_from(self.base_offset)
            .unwrap_or(usize::MAX)
            .min(self.mmap.len());
        &self.mmap[start..]
    }
}

impl NodeReader for MmapNodeReader {
    fn read_nodes(&mut self, buf: &mut [u8], node_index: u64, _count: usize) -> SpatialResult<()> {
        copy_window(&self.mmap, self.base_offset, node_index, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_item::NodeItem;
    use crate::PackedRTree;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &[u8] = b"FAKEHEADER\0\0";

    fn sample_tree() -> PackedRTree {
        let items: Vec<NodeItem> = (0..300u64)
            .map(|i| {
                let x = (i % 20) as f64;
                let y = (i / 20) as f64;
                NodeItem::with_offset(x, y, x + 0.5, y + 0.5, 1_000 + i)
            })
            .collect();
        PackedRTree::from_items(&items, None).unwrap()
    }

    fn write_with_header(path: &Path, tree: &PackedRTree) {
        let mut file = File::create(path).unwrap();
        file.write_all(HEADER).unwrap();
        tree.stream_write(&mut file).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn test_slice_reader() {
        let tree = sample_tree();
        let bytes = tree.to_bytes().unwrap();
        let mut reader = SliceNodeReader::new(&bytes);

        let query = NodeItem::new(2.0, 2.0, 4.0, 4.0);
        let streamed = PackedRTree::stream_search(300, 16, &query, &mut reader).unwrap();
        assert_eq!(streamed, tree.search_box(&query));
    }

    #[test]
    fn test_slice_reader_out_of_range() {
        let bytes = vec![0u8; 80];
        let mut reader = SliceNodeReader::new(&bytes);
        let mut buf = vec![0u8; 80];

        let err = reader.read_nodes(&mut buf, 1, 2).unwrap_err();
        match err {
            SpatialError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_file_reader_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.bin");
        let tree = sample_tree();
        write_with_header(&path, &tree);

        let mut reader = FileNodeReader::open(&path, HEADER.len() as u64).unwrap();
        assert_eq!(reader.path(), Some(path.as_path()));
        let query = NodeItem::new(10.0, 5.0, 12.0, 9.0);
        let streamed = PackedRTree::stream_search(300, 16, &query, &mut reader).unwrap();
        assert_eq!(streamed, tree.search_box(&query));
        assert!(!streamed.is_empty());
    }

    #[test]
    fn test_file_reader_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        let tree = sample_tree();
        let bytes = tree.to_bytes().unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        // The root sits at the end of the tree, past the truncation point
        let mut reader = FileNodeReader::from_file(File::open(&path).unwrap(), 0);
        let result = PackedRTree::stream_search(300, 16, &tree.extent(), &mut reader);
        assert!(matches!(result, Err(SpatialError::Io(_))));
    }

    #[test]
    fn test_mmap_reader_with_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.bin");
        let tree = sample_tree();
        write_with_header(&path, &tree);

        let mut reader = MmapNodeReader::open(&path, HEADER.len() as u64).unwrap();
        let query = tree.extent();
        let streamed = PackedRTree::stream_search(300, 16, &query, &mut reader).unwrap();
        assert_eq!(streamed.len(), 300);

        let loaded = PackedRTree::from_bytes(reader.tree_bytes(), 300).unwrap();
        assert_eq!(loaded.node_items(), tree.node_items());
    }

    #[test]
    fn test_byte_offset_overflow() {
        assert!(byte_offset(0, u64::MAX).is_err());
        assert_eq!(byte_offset(12, 3).unwrap(), 132);
    }

    #[test]
    fn test_base_offset_past_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.bin");
        write_with_header(&path, &sample_tree());

        let mut reader = MmapNodeReader::open(&path, u64::MAX - 8).unwrap();
        assert!(reader.tree_bytes().is_empty());

        let mut buf = vec![0u8; NODE_ITEM_LEN];
        let err = reader.read_nodes(&mut buf, 0, 1).unwrap_err();
        match err {
            SpatialError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(40).unwrap(), 40);
        if usize::BITS < 64 {
            assert!(to_index(u64::MAX).is_err());
        }
    }
}
