//! The filesystem-side collaborator that directory creation delegates to.

use sfs_error::Result;
use sfs_node::NodeStorage;
use sfs_types::{BlockSize, FragmentId};

use crate::directory::Directory;

/// Allocates fragments for new children and links them into a parent.
///
/// Implementations allocate a fresh id, create and initialize the child node,
/// then insert the resulting entry with [`Directory::add_entry`].
pub trait FragmentAllocator {
    type Storage: NodeStorage;

    fn block_size(&self) -> BlockSize;

    /// Create an empty subdirectory `name` inside `parent`.
    fn make_directory(&self, parent: &Directory<'_, Self::Storage>, name: &str)
    -> Result<FragmentId>;

    /// Create an empty file `name` inside `parent`.
    fn make_file(&self, parent: &Directory<'_, Self::Storage>, name: &str) -> Result<FragmentId>;
}
