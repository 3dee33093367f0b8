//! Filesystem configuration.

use serde::{Deserialize, Serialize};

use crate::BlockSize;
use crate::dir_entry::entries_per_block;

/// Tunables a filesystem is built from.
///
/// Every field has a default, so an empty document deserializes to the
/// default configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesystemConfig {
    /// Block size of the backing store. Validated on deserialization.
    pub block_size: BlockSize,
}

impl FilesystemConfig {
    /// Directory entries per block under this configuration.
    #[must_use]
    pub const fn entries_per_block(&self) -> usize {
        entries_per_block(self.block_size)
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            block_size: BlockSize::DEFAULT,
        }
    }
}
