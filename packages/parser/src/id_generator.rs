use crc32fast::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix shared by every generated node key
pub const KEY_PREFIX: &str = "cmp";

static DETACHED_COUNT: AtomicU64 = AtomicU64::new(0);

/// CRC32 of a document path, in hex. Separators are normalised first so a
/// view gets the same seed on every platform.
pub fn document_seed(path: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(path.replace('\\', "/").as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Key for a node built outside of a parse (e.g. `Node::new`), unique for
/// the lifetime of the process
pub fn detached_key() -> String {
    let count = DETACHED_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{}-{}", KEY_PREFIX, count)
}

/// Hands out `cmp-<seed>-<n>` keys in document order
#[derive(Clone, Debug)]
pub struct IDGenerator {
    seed: String,
    issued: u32,
}

impl IDGenerator {
    pub fn new(path: &str) -> Self {
        Self {
            seed: document_seed(path),
            issued: 0,
        }
    }

    pub fn new_id(&mut self) -> String {
        self.issued += 1;
        format!("{}-{}-{}", KEY_PREFIX, self.seed, self.issued)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
