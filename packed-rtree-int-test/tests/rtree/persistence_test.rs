use packed_rtree::{
    size, FileNodeReader, MmapNodeReader, NodeItem, PackedRTree, RTreeConfig,
};
use packed_rtree_int_test::test_util::{
    cleanup, create_test_context, create_test_context_with, random_path, run_test, HEADER,
};
use std::fs;
use std::io::Write;
use std::path::Path;

#[test]
fn test_index_file_length() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = ctx.tree();
            let len = fs::metadata(ctx.index_path())?.len();
            assert_eq!(len, HEADER.len() as u64 + size(tree.num_items(), tree.node_size()));
            assert_eq!(tree.size(), size(tree.num_items(), tree.node_size()));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_reload_from_file_bytes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = ctx.tree();
            let bytes = fs::read(ctx.index_path())?;
            let loaded = PackedRTree::from_bytes(&bytes[HEADER.len()..], tree.num_items())?;

            assert_eq!(loaded.node_items(), tree.node_items());
            assert_eq!(loaded.extent(), tree.extent());
            assert_eq!(loaded.level_bounds(), tree.level_bounds());
            assert_eq!(loaded.stats(), tree.stats());

            let query = NodeItem::new(100.0, 100.0, 300.0, 150.0);
            assert_eq!(loaded.search_box(&query), tree.search_box(&query));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_reload_from_mmap() {
    run_test(
        || create_test_context_with(2_500, &RTreeConfig::new().with_node_size(8)),
        |ctx| {
            let tree = ctx.tree();
            let reader = MmapNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let loaded = PackedRTree::from_bytes_with_config(
                reader.tree_bytes(),
                tree.num_items(),
                &RTreeConfig::new().with_node_size(8),
            )?;

            assert_eq!(loaded.node_size(), 8);
            assert_eq!(loaded.node_items(), tree.node_items());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_diagonal_points_on_disk() {
    run_test(
        || create_test_context_with(0, &RTreeConfig::default()),
        |ctx| {
            let items: Vec<NodeItem> = [0.0, 10.0, 20.0, 30.0]
                .iter()
                .enumerate()
                .map(|(i, &v)| NodeItem::with_offset(v, v, v, v, i as u64))
                .collect();
            let config = RTreeConfig::new().with_node_size(2);
            let tree = PackedRTree::from_items_with_config(&items, None, &config)?;
            let counts: Vec<u64> = tree.level_bounds().iter().map(|b| b.end - b.start).collect();
            assert_eq!(counts, vec![4, 2, 1]);

            let path = Path::new(ctx.path()).join("diagonal.prt");
            let mut file = fs::File::create(&path)?;
            tree.stream_write(&mut file)?;
            file.sync_all()?;

            let mut reader = FileNodeReader::open(&path, 0)?;
            let query = NodeItem::new(5.0, 5.0, 25.0, 25.0);
            let hits = PackedRTree::stream_search(4, 2, &query, &mut reader)?;

            let mut offsets: Vec<u64> = hits.iter().map(|h| h.offset).collect();
            offsets.sort_unstable();
            assert_eq!(offsets, vec![1, 2]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_empty_tree_on_disk() {
    run_test(
        || create_test_context_with(0, &RTreeConfig::default()),
        |ctx| {
            assert_eq!(ctx.tree().num_nodes(), 0);
            assert_eq!(fs::metadata(ctx.index_path())?.len(), HEADER.len() as u64);

            let mut reader = FileNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let hits = PackedRTree::stream_search(0, 16, &NodeItem::new(0.0, 0.0, 1e9, 1e9), &mut reader)?;
            assert!(hits.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_many_trees_in_one_file() {
    let dir = random_path();
    fs::create_dir_all(&dir).unwrap();
    let path = Path::new(&dir).join("multi.prt");

    let first: Vec<NodeItem> = (0..40u64)
        .map(|i| NodeItem::with_offset(i as f64, 0.0, i as f64 + 0.5, 0.5, i))
        .collect();
    let second: Vec<NodeItem> = (0..90u64)
        .map(|i| NodeItem::with_offset(0.0, i as f64, 0.5, i as f64 + 0.5, 1_000 + i))
        .collect();
    let first_tree = PackedRTree::from_items(&first, None).unwrap();
    let second_tree = PackedRTree::from_items(&second, None).unwrap();

    let mut file = fs::File::create(&path).unwrap();
    file.write_all(HEADER).unwrap();
    first_tree.stream_write(&mut file).unwrap();
    second_tree.stream_write(&mut file).unwrap();
    file.sync_all().unwrap();

    let second_base = HEADER.len() as u64 + first_tree.size();
    let mut reader = FileNodeReader::open(&path, second_base).unwrap();
    let hits = PackedRTree::stream_search(90, 16, &NodeItem::new(0.0, 10.0, 1.0, 12.0), &mut reader).unwrap();

    let mut offsets: Vec<u64> = hits.iter().map(|h| h.offset).collect();
    offsets.sort_unstable();
    assert_eq!(offsets, vec![1_010, 1_011, 1_012]);

    fs::remove_dir_all(&dir).unwrap();
}
