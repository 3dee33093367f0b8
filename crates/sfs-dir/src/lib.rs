//! The directory layer: translation between names and the fragment ids that
//! back files and subdirectories.
//!
//! A directory is ordinary node data: a run of blocks, each packed with
//! fixed-size [`DirEntry`](sfs_types::DirEntry) records. Every operation is
//! built on one block-by-block scan that can stop early and optionally write
//! the block it stopped in back to the node.

pub mod allocator;
pub mod directory;
pub mod listing;

pub use allocator::FragmentAllocator;
pub use directory::{Directory, ScanControl};
pub use listing::{DirectoryListing, ListedEntry};
