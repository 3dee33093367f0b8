//! Error taxonomy shared by every SimpleFS crate.
//!
//! Lookups that find nothing are not errors: the directory layer reports them
//! through the `INVALID_ID` sentinel. Only construction against a non-directory
//! node, duplicate creation and storage-level failures surface here.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = SfsError> = std::result::Result<T, E>;

/// Every failure the directory layer and its collaborators can report.
#[derive(Debug, Error)]
pub enum SfsError {
    /// A directory engine was bound to a node that is not a directory.
    #[error("node {id} ('{name}') is not a directory")]
    NotADirectory { id: u32, name: String },

    /// Creation requested for a name that already has a live entry.
    #[error("entry '{name}' already exists")]
    AlreadyExists { name: String },

    /// A non-final block read returned a partial block.
    ///
    /// This is storage or logic corruption and aborts the current operation.
    #[error("short block read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortBlockRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// A name does not fit the fixed-size name field of a directory entry.
    #[error("name is {len} bytes, directory entries hold at most {max}")]
    NameTooLong { len: usize, max: usize },

    /// A name that can never be stored (empty, or containing NUL).
    #[error("invalid entry name {name:?}")]
    InvalidName { name: String },

    /// Attempt to unlink a directory that still has live entries.
    #[error("directory '{name}' is not empty")]
    NotEmpty { name: String },

    /// No node with this id is present in the node table.
    #[error("no node with id {id}")]
    NodeNotFound { id: u32 },

    /// Rejected block size in the filesystem configuration.
    #[error("invalid block size {size}: {reason}")]
    InvalidBlockSize { size: u32, reason: &'static str },

    /// Underlying storage I/O failure, propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Broken internal invariant that has no dedicated variant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SfsError {
    /// Shorthand for [`SfsError::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error reports corrupted on-disk state or broken internal
    /// logic rather than a caller mistake.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ShortBlockRead { .. } | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_block_read_is_fatal() {
        let err = SfsError::ShortBlockRead {
            offset: 4096,
            expected: 4096,
            actual: 17,
        };
        assert!(err.is_fatal(), "case=short_read_fatal");
        assert_eq!(
            err.to_string(),
            "short block read at offset 4096: expected 4096 bytes, got 17"
        );
    }

    #[test]
    fn caller_errors_are_not_fatal() {
        let exists = SfsError::AlreadyExists {
            name: "etc".to_owned(),
        };
        assert!(!exists.is_fatal(), "case=already_exists_recoverable");
        assert_eq!(exists.to_string(), "entry 'etc' already exists");

        let not_dir = SfsError::NotADirectory {
            id: 7,
            name: "notes.txt".to_owned(),
        };
        assert!(!not_dir.is_fatal(), "case=not_a_directory_recoverable");
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "gone"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, SfsError::Io(_)), "case=io_from");
        assert!(!err.is_fatal());
    }
}
