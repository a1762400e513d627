use packed_rtree::{NodeItem, PackedRTree, RTreeConfig, SpatialResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::backtrace::Backtrace;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{env, fs, thread};

/// Bytes written before the tree in every test index file.
pub const HEADER: &[u8] = b"PRTREE\0\0\0\0\0\0\0\0\0\0";

/// Runs a test with before/after hooks and error reporting.
/// Tests run on the current thread to avoid thread exhaustion when running many tests in parallel.
/// All test data is seeded, so a failure is reported on the first attempt.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> SpatialResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 1;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    // All retries exhausted - print full details
    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// A built tree, the items it was built from, and its on-disk copy.
#[derive(Clone)]
pub struct TestContext {
    path: String,
    index_path: PathBuf,
    items: Vec<NodeItem>,
    tree: PackedRTree,
}

impl TestContext {
    pub fn new(path: String, index_path: PathBuf, items: Vec<NodeItem>, tree: PackedRTree) -> Self {
        Self {
            path,
            index_path,
            items,
            tree,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File holding [`HEADER`] followed by the serialized tree.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    pub fn tree(&self) -> &PackedRTree {
        &self.tree
    }

    /// Leaf offsets a brute-force scan finds for `query`, sorted.
    pub fn brute_force(&self, query: &NodeItem) -> Vec<u64> {
        let mut offsets: Vec<u64> = self
            .items
            .iter()
            .filter(|item| item.intersects(query))
            .map(|item| item.offset)
            .collect();
        offsets.sort_unstable();
        offsets
    }
}

pub fn random_path() -> String {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(id.to_string()).to_string_lossy().into_owned()
}

/// Random boxes inside `[0, 1000]²`, offsets `0..count`.
pub fn random_items(count: u64, seed: u64) -> Vec<NodeItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|offset| {
            let x = rng.random_range(0.0..990.0);
            let y = rng.random_range(0.0..990.0);
            let w = rng.random_range(0.0..10.0);
            let h = rng.random_range(0.0..10.0);
            NodeItem::with_offset(x, y, x + w, y + h, offset)
        })
        .collect()
}

/// Random query box inside `[0, 1000]²` with sides up to `max_side`.
pub fn random_query<R: Rng>(rng: &mut R, max_side: f64) -> NodeItem {
    let x = rng.random_range(0.0..1000.0);
    let y = rng.random_range(0.0..1000.0);
    let w = rng.random_range(0.0..max_side);
    let h = rng.random_range(0.0..max_side);
    NodeItem::new(x, y, x + w, y + h)
}

pub fn create_test_context() -> SpatialResult<TestContext> {
    create_test_context_with(5_000, &RTreeConfig::default())
}

/// Builds a tree over `num_items` random items and writes it behind [`HEADER`].
pub fn create_test_context_with(num_items: u64, config: &RTreeConfig) -> SpatialResult<TestContext> {
    let path = random_path();
    fs::create_dir_all(&path)?;

    let items = random_items(num_items, 42);
    let tree = PackedRTree::from_items_with_config(&items, None, config)?;

    let index_path = Path::new(&path).join("index.prt");
    let mut file = fs::File::create(&index_path)?;
    file.write_all(HEADER)?;
    tree.stream_write(&mut file)?;
    file.sync_all()?;

    log::debug!(
        "Created test index at {:?}: {} items, {} bytes",
        index_path,
        num_items,
        tree.size()
    );
    Ok(TestContext::new(path, index_path, items, tree))
}

pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    let path = ctx.path().to_string();
    let max_retries = 5;

    for retry in 0..max_retries {
        if !Path::new(&path).exists() {
            return Ok(());
        }
        match fs::remove_dir_all(&path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) if retry < max_retries - 1 => {
                log::warn!("Failed to remove {} (attempt {}): {:?}", path, retry + 1, e);
                thread::sleep(Duration::from_millis(50 * (retry as u64 + 1)));
            }
            Err(e) => {
                // Temp files will be cleaned up by OS eventually
                eprintln!(
                    "Warning: Failed to remove test directory {} after {} attempts: {:?}",
                    path, max_retries, e
                );
                return Ok(());
            }
        }
    }

    Ok(())
}
