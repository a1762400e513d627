use packed_rtree::{
    FileNodeReader, MmapNodeReader, NodeItem, PackedRTree, RTreeConfig, SearchResultItem,
    SpatialError,
};
use packed_rtree_int_test::test_util::{
    cleanup, create_test_context, create_test_context_with, random_query, run_test, HEADER,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sorted_offsets(results: &[SearchResultItem]) -> Vec<u64> {
    let mut offsets: Vec<u64> = results.iter().map(|r| r.offset).collect();
    offsets.sort_unstable();
    offsets
}

#[test]
fn test_file_stream_search_matches_memory() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = ctx.tree();
            let mut reader = FileNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let mut rng = StdRng::seed_from_u64(7);

            for _ in 0..100 {
                let query = random_query(&mut rng, 50.0);
                let streamed = PackedRTree::stream_search(
                    tree.num_items(),
                    tree.node_size(),
                    &query,
                    &mut reader,
                )?;

                assert_eq!(streamed, tree.search_box(&query));
                assert_eq!(sorted_offsets(&streamed), ctx.brute_force(&query));
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_mmap_stream_search_matches_memory() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = ctx.tree();
            let mut reader = MmapNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let mut rng = StdRng::seed_from_u64(11);

            for _ in 0..100 {
                let query = random_query(&mut rng, 120.0);
                let streamed = PackedRTree::stream_search(
                    tree.num_items(),
                    tree.node_size(),
                    &query,
                    &mut reader,
                )?;
                assert_eq!(streamed, tree.search_box(&query));
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_full_extent_returns_every_item_once() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = ctx.tree();
            let mut reader = FileNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let streamed = PackedRTree::stream_search(
                tree.num_items(),
                tree.node_size(),
                &tree.extent(),
                &mut reader,
            )?;

            let expected: Vec<u64> = (0..ctx.items().len() as u64).collect();
            assert_eq!(sorted_offsets(&streamed), expected);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_small_query_reads_a_fraction_of_the_tree() {
    run_test(
        || create_test_context_with(50_000, &RTreeConfig::default()),
        |ctx| {
            let tree = ctx.tree();
            let mut reader = FileNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let query = NodeItem::new(500.0, 500.0, 502.0, 502.0);

            let (results, stats) = PackedRTree::stream_search_with_stats(
                tree.num_items(),
                tree.node_size(),
                &query,
                &mut reader,
            )?;

            log::info!(
                "{} hits, {} reads, {} of {} nodes",
                results.len(),
                stats.reads,
                stats.nodes_read,
                tree.num_nodes()
            );
            assert_eq!(sorted_offsets(&results), ctx.brute_force(&query));
            assert!(stats.reads >= tree.level_bounds().len() as u64);
            assert!(stats.nodes_read * 20 < tree.num_nodes());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_various_node_sizes_on_disk() {
    for node_size in [1u16, 2, 7, 64, 1024] {
        run_test(
            move || create_test_context_with(3_000, &RTreeConfig::new().with_node_size(node_size)),
            move |ctx| {
                let tree = ctx.tree();
                let mut reader = FileNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
                let mut rng = StdRng::seed_from_u64(u64::from(node_size));

                for _ in 0..20 {
                    let query = random_query(&mut rng, 80.0);
                    // Readers pass the requested size; the clamp is applied on both sides
                    let streamed =
                        PackedRTree::stream_search(tree.num_items(), node_size, &query, &mut reader)?;
                    assert_eq!(sorted_offsets(&streamed), ctx.brute_force(&query));
                }
                Ok(())
            },
            |ctx| cleanup(ctx),
        )
    }
}

#[test]
fn test_truncated_index_reports_io_error() {
    run_test(
        || create_test_context_with(1_000, &RTreeConfig::default()),
        |ctx| {
            let tree = ctx.tree();
            let bytes = std::fs::read(ctx.index_path())?;
            // Drop the root record
            std::fs::write(ctx.index_path(), &bytes[..bytes.len() - 40])?;

            let mut reader = FileNodeReader::open(ctx.index_path(), HEADER.len() as u64)?;
            let result = PackedRTree::stream_search(
                tree.num_items(),
                tree.node_size(),
                &tree.extent(),
                &mut reader,
            );
            assert!(matches!(result, Err(SpatialError::Io(_))));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
