//! Core types shared across the SimpleFS crates.

pub mod config;
pub mod dir_entry;

use std::fmt;

use serde::{Deserialize, Serialize};
use sfs_error::{Result, SfsError};

pub use config::FilesystemConfig;
pub use dir_entry::{
    DIR_ENTRY_SIZE, DIR_NAME_LEN, DirEntry, DirEntrySlot, entries_per_block, format_empty_block,
    names_equal, slots_mut,
};

/// Identifier of the fragment/inode a directory entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(u32);

/// Sentinel id of an empty or deleted directory slot.
pub const INVALID_ID: FragmentId = FragmentId(u32::MAX);

impl FragmentId {
    /// Id of the root directory created by `format`.
    pub const ROOT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this id names a real fragment rather than a tombstone.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != INVALID_ID.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("invalid")
        }
    }
}

/// Filesystem block size in bytes: the I/O granularity of directory data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BlockSize(u32);

impl BlockSize {
    pub const MIN: u32 = 512;
    pub const MAX: u32 = 65536;
    pub const DEFAULT: Self = Self(4096);

    /// Validate a raw block size: a power of two in `MIN..=MAX`.
    pub fn new(size: u32) -> Result<Self> {
        if !size.is_power_of_two() {
            return Err(SfsError::InvalidBlockSize {
                size,
                reason: "must be a power of two",
            });
        }
        if !(Self::MIN..=Self::MAX).contains(&size) {
            return Err(SfsError::InvalidBlockSize {
                size,
                reason: "must be between 512 and 65536 bytes",
            });
        }
        Ok(Self(size))
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for BlockSize {
    type Error = SfsError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BlockSize> for u32 {
    fn from(value: BlockSize) -> Self {
        value.0
    }
}

/// What a node's data represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Freshly allocated fragment that has not been typed yet.
    Unknown,
    Directory,
    File,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "UNK",
            Self::Directory => "DIR",
            Self::File => "FILE",
        })
    }
}
