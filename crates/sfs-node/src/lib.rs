//! Nodes: the file-like objects that hold a directory's or file's bytes.
//!
//! A node pairs immutable identity (`id`, `name`) with mutable state behind a
//! single exclusive lock. All byte access goes through the lock guard, so a
//! caller holding a [`NodeGuard`] can chain reads and writes without another
//! thread observing the intermediate state.

pub mod inode;
pub mod storage;

pub use inode::{Inode, NodeGuard, NodeState};
pub use storage::{FileStorage, MemoryStorage, NodeStorage};
