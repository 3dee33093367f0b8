//! A node and its exclusive lock.

use std::fmt;

use parking_lot::{Mutex, MutexGuard};
use sfs_error::Result;
use sfs_types::{FragmentId, NodeKind};
use tracing::trace;

use crate::storage::NodeStorage;

/// Mutable node state, reachable only while the node lock is held.
#[derive(Debug)]
pub struct NodeState<S> {
    kind: NodeKind,
    storage: S,
}

/// Proof that the node lock is held.
pub type NodeGuard<'a, S> = MutexGuard<'a, NodeState<S>>;

impl<S: NodeStorage> NodeState<S> {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    /// Current byte length of the node's data.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.storage.size()
    }

    /// Read up to `buf.len()` bytes at `offset`; `0` at end of data.
    pub fn read_internal(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.storage.read_at(buf, offset)
    }

    /// Write all of `buf` at `offset`, extending the node when needed.
    pub fn write_internal(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let old_size = self.storage.size();
        self.storage.write_at(buf, offset)?;
        let new_size = self.storage.size();
        if new_size > old_size {
            trace!(offset, len = buf.len(), old_size, new_size, "node grew");
        }
        Ok(())
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// A file-like object holding the bytes of one directory or file.
pub struct Inode<S> {
    id: FragmentId,
    name: String,
    state: Mutex<NodeState<S>>,
}

impl<S: NodeStorage> Inode<S> {
    pub fn new(id: FragmentId, name: impl Into<String>, kind: NodeKind, storage: S) -> Self {
        Self {
            id,
            name: name.into(),
            state: Mutex::new(NodeState { kind, storage }),
        }
    }

    #[must_use]
    pub fn id(&self) -> FragmentId {
        self.id
    }

    /// Name the node was created under, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the node's exclusive lock. There is no shared mode: readers and
    /// writers serialize on the same lock.
    pub fn lock(&self) -> NodeGuard<'_, S> {
        self.state.lock()
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.lock().kind()
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.lock().size()
    }

    /// Locking write of `buf` at `offset`.
    pub fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        self.lock().write_internal(buf, offset)
    }
}

impl<S> fmt::Debug for Inode<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
