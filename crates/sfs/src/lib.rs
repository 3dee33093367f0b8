//! SimpleFS: a filesystem whose directories are ordinary node data.
//!
//! This crate supplies the collaborator the directory layer delegates to:
//! fragment id allocation, the table of open nodes, root formatting and
//! unlinking. Path traversal is left to callers; every operation here works on
//! one directory at a time.

pub mod filesystem;

pub use filesystem::SimpleFilesystem;
pub use sfs_dir::{Directory, DirectoryListing, FragmentAllocator, ListedEntry, ScanControl};
pub use sfs_error::{Result, SfsError};
pub use sfs_node::{Inode, MemoryStorage, NodeStorage};
pub use sfs_types::{BlockSize, DirEntry, FilesystemConfig, FragmentId, INVALID_ID, NodeKind};
