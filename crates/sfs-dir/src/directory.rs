//! Directory scan engine.
//!
//! `Directory` binds a directory node to the filesystem block size and
//! implements lookup, insert, tombstone-delete, the emptiness test and the
//! administrative listing on top of a single visitor-driven scan.
//!
//! Locking: every public operation takes the node's exclusive lock for the
//! duration of its scan. [`Directory::add_entry`] holds that one acquisition
//! across the tombstone search and the append, so no thread observes the
//! directory between the two. The internal scan primitive only accepts a held
//! [`NodeGuard`] and never locks on its own.

use sfs_error::{Result, SfsError};
use sfs_node::{Inode, NodeGuard, NodeStorage};
use sfs_types::{
    BlockSize, DIR_ENTRY_SIZE, DirEntry, DirEntrySlot, FragmentId, NodeKind, format_empty_block,
    slots_mut,
};
use tracing::{debug, error, info, trace};

use crate::allocator::FragmentAllocator;
use crate::listing::{DirectoryListing, ListedEntry};

/// What a scan visitor asks the engine to do after seeing a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Move on to the next slot.
    Continue,
    /// End the scan. Edits made to the current block are discarded.
    Stop,
    /// Write the current block back at its original offset, then end the scan.
    StopAndPersist,
}

/// Directory engine bound to one open directory node.
///
/// Holds no state beyond the node reference and the cached block size, so it
/// is cheap to build per call.
#[derive(Debug)]
pub struct Directory<'a, S: NodeStorage> {
    node: &'a Inode<S>,
    block_size: BlockSize,
}

impl<'a, S: NodeStorage> Directory<'a, S> {
    /// Bind to `node`, which must be a directory.
    ///
    /// The kind is checked under the node lock; the lock is released before
    /// this returns.
    pub fn open(node: &'a Inode<S>, block_size: BlockSize) -> Result<Self> {
        let kind = node.lock().kind();
        if kind != NodeKind::Directory {
            return Err(SfsError::NotADirectory {
                id: node.id().get(),
                name: node.name().to_owned(),
            });
        }
        Ok(Self { node, block_size })
    }

    #[must_use]
    pub fn node(&self) -> &'a Inode<S> {
        self.node
    }

    #[must_use]
    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// Visit every slot of the directory under the node lock.
    ///
    /// The visitor gets a mutable view into the engine's block buffer; see
    /// [`ScanControl`] for how its edits are persisted.
    pub fn scan<F>(&self, visitor: F) -> Result<()>
    where
        F: FnMut(DirEntrySlot<'_>) -> ScanControl,
    {
        let mut guard = self.node.lock();
        self.scan_locked(&mut guard, visitor)
    }

    /// Scan with the lock already held by the caller.
    ///
    /// Reads one block at a time from offset 0. A zero-length read ends the
    /// scan; any other read shorter than a block is corruption and fails with
    /// [`SfsError::ShortBlockRead`].
    fn scan_locked<F>(&self, guard: &mut NodeGuard<'_, S>, mut visitor: F) -> Result<()>
    where
        F: FnMut(DirEntrySlot<'_>) -> ScanControl,
    {
        let block_len = self.block_size.as_usize();
        let mut block = vec![0_u8; block_len];
        let mut offset = 0_u64;

        loop {
            let read = guard.read_internal(&mut block, offset)?;
            if read == 0 {
                return Ok(());
            }
            if read != block_len {
                error!(
                    dir = self.node.id().get(),
                    offset,
                    expected = block_len,
                    actual = read,
                    "partial directory block read"
                );
                return Err(SfsError::ShortBlockRead {
                    offset,
                    expected: block_len,
                    actual: read,
                });
            }
            trace!(dir = self.node.id().get(), offset, "scanning directory block");

            let mut control = ScanControl::Continue;
            let mut stopped_at = 0;
            for (index, slot) in slots_mut(&mut block).enumerate() {
                control = visitor(slot);
                if control != ScanControl::Continue {
                    stopped_at = index;
                    break;
                }
            }
            match control {
                ScanControl::Continue => {}
                ScanControl::Stop => return Ok(()),
                ScanControl::StopAndPersist => {
                    trace!(
                        dir = self.node.id().get(),
                        offset,
                        slot = stopped_at,
                        "persisting directory block"
                    );
                    return guard.write_internal(&block, offset);
                }
            }
            offset += block_len as u64;
        }
    }

    /// Initialize the node as an empty directory holding one tombstoned block.
    pub fn create(&self) -> Result<()> {
        let mut block = vec![0_u8; self.block_size.as_usize()];
        format_empty_block(&mut block);
        self.node.write(&block, 0)?;
        debug!(
            dir = self.node.id().get(),
            name = self.node.name(),
            block_size = self.block_size.get(),
            "created empty directory"
        );
        Ok(())
    }

    /// Look up a live entry by name.
    ///
    /// Absence is not an error: the returned entry's id is `INVALID_ID`.
    pub fn find(&self, name: &str) -> Result<DirEntry> {
        let mut found = DirEntry::tombstone();
        self.scan(|slot| {
            if slot.is_tombstone() || !slot.matches(name) {
                return ScanControl::Continue;
            }
            found = slot.to_entry();
            ScanControl::Stop
        })?;
        Ok(found)
    }

    /// Insert `entry` into the first tombstoned slot, or append a new block
    /// holding it in slot 0 when every slot is live.
    ///
    /// Callers check for an existing live entry of the same name first.
    pub fn add_entry(&self, entry: &DirEntry) -> Result<()> {
        if !entry.is_live() {
            return Err(SfsError::internal(
                "refusing to insert an entry carrying the invalid id",
            ));
        }
        debug!(
            dir = self.node.id().get(),
            name = %entry.name(),
            id = entry.id().get(),
            "add directory entry"
        );

        let mut guard = self.node.lock();
        let mut reused = false;
        self.scan_locked(&mut guard, |mut slot| {
            if !slot.is_tombstone() {
                return ScanControl::Continue;
            }
            slot.store(entry);
            reused = true;
            ScanControl::StopAndPersist
        })?;
        if reused {
            return Ok(());
        }

        let mut block = vec![0_u8; self.block_size.as_usize()];
        format_empty_block(&mut block);
        let first = block
            .first_chunk_mut::<DIR_ENTRY_SIZE>()
            .ok_or_else(|| SfsError::internal("block cannot hold a directory entry"))?;
        DirEntrySlot::new(first).store(entry);
        let end = guard.size();
        guard.write_internal(&block, end)?;
        debug!(
            dir = self.node.id().get(),
            offset = end,
            new_size = guard.size(),
            "appended directory block"
        );
        Ok(())
    }

    /// Tombstone the live entry called `name` and return a copy of it.
    ///
    /// Removing an absent name writes nothing and returns an entry whose id
    /// is `INVALID_ID`.
    pub fn remove_entry(&self, name: &str) -> Result<DirEntry> {
        self.remove_where(name, |_| true)
    }

    /// Tombstone the first live entry called `name` only if it still links
    /// `id`.
    ///
    /// Lets a caller that inspected the child behind `name` remove exactly
    /// that child. When the first live `name` links some other id, or nothing
    /// matches, nothing is written and the returned id is `INVALID_ID`.
    pub fn remove_linked(&self, name: &str, id: FragmentId) -> Result<DirEntry> {
        self.remove_where(name, |linked| linked == id)
    }

    fn remove_where(&self, name: &str, accept: impl Fn(FragmentId) -> bool) -> Result<DirEntry> {
        debug!(
            dir = self.node.id().get(),
            dir_name = self.node.name(),
            name,
            "remove directory entry"
        );
        let mut removed = DirEntry::tombstone();
        self.scan(|mut slot| {
            if slot.is_tombstone() || !slot.matches(name) {
                return ScanControl::Continue;
            }
            if !accept(slot.id()) {
                return ScanControl::Stop;
            }
            removed = slot.to_entry();
            slot.tombstone();
            ScanControl::StopAndPersist
        })?;
        Ok(removed)
    }

    /// Whether the directory has no live entries. Stops at the first live one.
    pub fn is_empty(&self) -> Result<bool> {
        let mut empty = true;
        self.scan(|slot| {
            if slot.is_tombstone() {
                return ScanControl::Continue;
            }
            empty = false;
            ScanControl::Stop
        })?;
        Ok(empty)
    }

    /// Snapshot of every live slot for administrative listings.
    pub fn list(&self) -> Result<DirectoryListing> {
        let mut entries = Vec::new();
        let mut index = 0_usize;
        let size = {
            let mut guard = self.node.lock();
            self.scan_locked(&mut guard, |slot| {
                if !slot.is_tombstone() {
                    entries.push(ListedEntry {
                        slot: index,
                        id: slot.id(),
                        name: String::from_utf8_lossy(slot.name_bytes()).into_owned(),
                    });
                }
                index += 1;
                ScanControl::Continue
            })?;
            guard.size()
        };
        let listing = DirectoryListing {
            id: self.node.id(),
            name: self.node.name().to_owned(),
            size,
            slots: index,
            entries,
        };
        debug!(
            dir = listing.id.get(),
            slots = listing.slots,
            live = listing.entries.len(),
            "listed directory"
        );
        Ok(listing)
    }

    /// Create subdirectory `name` through the filesystem allocator.
    ///
    /// The existence check and the allocator's eventual insert take the node
    /// lock separately, with allocation in between. Two concurrent calls for
    /// the same name can both pass the check and leave two live entries with
    /// that name.
    pub fn make_directory<A>(&self, fs: &A, name: &str) -> Result<FragmentId>
    where
        A: FragmentAllocator<Storage = S>,
    {
        self.check_allocator(fs)?;
        self.ensure_absent(name)?;
        let id = fs.make_directory(self, name)?;
        info!(dir = self.node.id().get(), name, id = id.get(), "made directory");
        Ok(id)
    }

    /// Create file `name` through the filesystem allocator.
    ///
    /// Not atomic with respect to concurrent creation of the same name; see
    /// [`Directory::make_directory`].
    pub fn make_file<A>(&self, fs: &A, name: &str) -> Result<FragmentId>
    where
        A: FragmentAllocator<Storage = S>,
    {
        self.check_allocator(fs)?;
        self.ensure_absent(name)?;
        let id = fs.make_file(self, name)?;
        info!(dir = self.node.id().get(), name, id = id.get(), "made file");
        Ok(id)
    }

    /// Children are laid out in the allocator's block size, which must be the
    /// one this directory is scanned with.
    fn check_allocator<A>(&self, fs: &A) -> Result<()>
    where
        A: FragmentAllocator<Storage = S>,
    {
        let fs_block_size = fs.block_size();
        if fs_block_size != self.block_size {
            return Err(SfsError::internal(format!(
                "directory {} opened with block size {} but the filesystem uses {}",
                self.node.id(),
                self.block_size.get(),
                fs_block_size.get()
            )));
        }
        Ok(())
    }

    fn ensure_absent(&self, name: &str) -> Result<()> {
        if self.find(name)?.is_live() {
            return Err(SfsError::AlreadyExists {
                name: name.to_owned(),
            });
        }
        Ok(())
    }
}
