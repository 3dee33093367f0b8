//! Byte storage backing a node.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use sfs_error::{Result, SfsError};

/// Positional byte storage of one node.
///
/// Implementations are only ever reached through the node lock, so `&mut self`
/// access is exclusive.
pub trait NodeStorage: Send {
    /// Current length of the data in bytes.
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes at `offset`.
    ///
    /// Returns the number of bytes read: `0` at or past the end of data, and a
    /// short count only when the data ends inside the requested range.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Write all of `buf` at `offset`, growing the data if the write extends
    /// past the end. A gap between the old end and `offset` reads as zeros.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()>;
}

fn to_index(offset: u64) -> Result<usize> {
    usize::try_from(offset)
        .map_err(|_| SfsError::internal(format!("offset {offset} exceeds addressable memory")))
}

/// Node data held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl NodeStorage for MemoryStorage {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let start = to_index(offset)?;
        if start >= self.bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let start = to_index(offset)?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| SfsError::internal("write range overflows usize"))?;
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(buf);
        Ok(())
    }
}

/// Node data held in a host file.
#[derive(Debug)]
pub struct FileStorage {
    file: File,
    size: u64,
}

impl FileStorage {
    /// Wrap an open read/write file. The current file length becomes the
    /// node size.
    pub fn new(file: File) -> Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

impl NodeStorage for FileStorage {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if offset >= self.size {
            return Ok(0);
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or_else(|| SfsError::internal("write range overflows u64"))?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.size = self.size.max(end);
        Ok(())
    }
}
