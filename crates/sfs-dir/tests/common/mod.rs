#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sfs_error::Result;
use sfs_node::{Inode, MemoryStorage, NodeStorage};
use sfs_types::{DirEntry, FragmentId, NodeKind};

/// Memory storage that counts block reads.
#[derive(Debug, Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let storage = Self::default();
        let reads = Arc::clone(&storage.reads);
        let writes = Arc::clone(&storage.writes);
        (storage, reads, writes)
    }
}

impl NodeStorage for CountingStorage {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_at(buf, offset)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_at(buf, offset)
    }
}

pub fn memory_dir(id: u32, name: &str) -> Inode<MemoryStorage> {
    Inode::new(
        FragmentId::new(id),
        name,
        NodeKind::Directory,
        MemoryStorage::new(),
    )
}

pub fn entry(name: &str, id: u32) -> DirEntry {
    DirEntry::new(name, FragmentId::new(id)).expect("valid test entry name")
}

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}
