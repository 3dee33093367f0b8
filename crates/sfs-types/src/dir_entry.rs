//! On-disk directory-entry record.
//!
//! A directory's data is a sequence of blocks, each packed with fixed-size
//! records:
//!
//! ```text
//! offset  len  field
//!      0   96  name (64-byte primary + 32-byte continuation, NUL padded)
//!     96    4  fragment id, little-endian u32 (INVALID_ID = tombstone)
//!    100    4  reserved, zero
//! ```
//!
//! Remainder bytes at the end of a block that cannot hold a whole record are
//! unused padding.

use std::borrow::Cow;
use std::fmt;

use sfs_error::{Result, SfsError};

use crate::{BlockSize, FragmentId, INVALID_ID};

/// Capacity of the name field in bytes.
pub const DIR_NAME_LEN: usize = 64 + 32;
/// Size of one packed directory-entry record in bytes.
pub const DIR_ENTRY_SIZE: usize = 104;

const ID_OFFSET: usize = DIR_NAME_LEN;
const ID_END: usize = ID_OFFSET + 4;

/// Number of whole records that fit in one block.
#[inline]
#[must_use]
pub const fn entries_per_block(block_size: BlockSize) -> usize {
    block_size.as_usize() / DIR_ENTRY_SIZE
}

/// Bounded C-string comparison of a stored name field against `target`.
///
/// Bytes are compared position by position over at most [`DIR_NAME_LEN`]
/// bytes; the comparison ends equal as soon as both sides hit NUL. Bytes of
/// `target` beyond the field width are never looked at.
#[must_use]
pub fn names_equal(stored: &[u8], target: &[u8]) -> bool {
    for i in 0..DIR_NAME_LEN {
        let a = stored.get(i).copied().unwrap_or(0);
        let b = target.get(i).copied().unwrap_or(0);
        if a != b {
            return false;
        }
        if a == 0 {
            return true;
        }
    }
    true
}

/// Tombstone every slot of a block buffer and zero the trailing padding.
///
/// Emptiness is written explicitly as [`INVALID_ID`] rather than assumed from
/// a fill byte.
pub fn format_empty_block(block: &mut [u8]) {
    block.fill(0);
    for mut slot in slots_mut(block) {
        slot.set_id(INVALID_ID);
    }
}

/// Mutable views of every whole record in a block buffer, in slot order.
///
/// Trailing bytes too short to hold a record are skipped.
pub fn slots_mut(block: &mut [u8]) -> impl Iterator<Item = DirEntrySlot<'_>> {
    block
        .chunks_exact_mut(DIR_ENTRY_SIZE)
        .filter_map(|raw| <&mut [u8; DIR_ENTRY_SIZE]>::try_from(raw).ok())
        .map(DirEntrySlot::new)
}

fn name_prefix(field: &[u8]) -> &[u8] {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..len]
}

/// Owned copy of a directory-entry record.
#[derive(Clone, PartialEq, Eq)]
pub struct DirEntry {
    id: FragmentId,
    name: [u8; DIR_NAME_LEN],
}

impl DirEntry {
    /// An absent entry: the value lookups report when nothing matched.
    #[must_use]
    pub const fn tombstone() -> Self {
        Self {
            id: INVALID_ID,
            name: [0; DIR_NAME_LEN],
        }
    }

    /// Build an entry for insertion.
    ///
    /// Names must be non-empty, free of NUL and at most [`DIR_NAME_LEN`]
    /// bytes. A name of exactly `DIR_NAME_LEN` bytes is stored without a
    /// terminator.
    pub fn new(name: &str, id: FragmentId) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.contains(&0) {
            return Err(SfsError::InvalidName {
                name: name.to_owned(),
            });
        }
        if bytes.len() > DIR_NAME_LEN {
            return Err(SfsError::NameTooLong {
                len: bytes.len(),
                max: DIR_NAME_LEN,
            });
        }
        let mut field = [0_u8; DIR_NAME_LEN];
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { id, name: field })
    }

    #[must_use]
    pub fn decode(raw: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0_u8; DIR_NAME_LEN];
        name.copy_from_slice(&raw[..DIR_NAME_LEN]);
        let mut id = [0_u8; 4];
        id.copy_from_slice(&raw[ID_OFFSET..ID_END]);
        Self {
            id: FragmentId::new(u32::from_le_bytes(id)),
            name,
        }
    }

    pub fn encode_into(&self, out: &mut [u8; DIR_ENTRY_SIZE]) {
        out[..DIR_NAME_LEN].copy_from_slice(&self.name);
        out[ID_OFFSET..ID_END].copy_from_slice(&self.id.get().to_le_bytes());
        out[ID_END..DIR_ENTRY_SIZE].fill(0);
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> FragmentId {
        self.id
    }

    /// Whether this entry names a live child.
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.id.is_valid()
    }

    /// Stored name up to the first NUL.
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        name_prefix(&self.name)
    }

    #[must_use]
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        names_equal(&self.name, name.as_bytes())
    }
}

impl Default for DirEntry {
    fn default() -> Self {
        Self::tombstone()
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntry")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

/// Mutable view of one record inside a block buffer.
///
/// Edits land directly in the buffer that owns the bytes, so a scan that
/// persists the block after a visitor edits a slot writes those edits back.
pub struct DirEntrySlot<'a> {
    raw: &'a mut [u8; DIR_ENTRY_SIZE],
}

impl<'a> DirEntrySlot<'a> {
    pub fn new(raw: &'a mut [u8; DIR_ENTRY_SIZE]) -> Self {
        Self { raw }
    }

    #[must_use]
    pub fn id(&self) -> FragmentId {
        let mut id = [0_u8; 4];
        id.copy_from_slice(&self.raw[ID_OFFSET..ID_END]);
        FragmentId::new(u32::from_le_bytes(id))
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        !self.id().is_valid()
    }

    pub fn set_id(&mut self, id: FragmentId) {
        self.raw[ID_OFFSET..ID_END].copy_from_slice(&id.get().to_le_bytes());
    }

    /// Mark the slot empty. The name bytes are left as they were.
    pub fn tombstone(&mut self) {
        self.set_id(INVALID_ID);
    }

    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        name_prefix(&self.raw[..DIR_NAME_LEN])
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        names_equal(&self.raw[..DIR_NAME_LEN], name.as_bytes())
    }

    #[must_use]
    pub fn to_entry(&self) -> DirEntry {
        DirEntry::decode(&*self.raw)
    }

    /// Overwrite the whole record with `entry`.
    pub fn store(&mut self, entry: &DirEntry) {
        entry.encode_into(self.raw);
    }
}

impl fmt::Debug for DirEntrySlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntrySlot")
            .field("id", &self.id())
            .field("name", &String::from_utf8_lossy(self.name_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn record_layout_fits_default_block() {
        assert_eq!(entries_per_block(BlockSize::DEFAULT), 39);
        assert_eq!(entries_per_block(BlockSize::new(512).unwrap()), 4);
        assert_eq!(DIR_NAME_LEN + 4 + 4, DIR_ENTRY_SIZE);
    }

    #[test]
    fn entry_layout_is_little_endian() {
        let entry = DirEntry::new("boot", FragmentId::new(0x0102_0304)).unwrap();
        let mut raw = [0xAA_u8; DIR_ENTRY_SIZE];
        entry.encode_into(&mut raw);
        assert_eq!(&raw[..4], b"boot");
        assert!(raw[4..DIR_NAME_LEN].iter().all(|&b| b == 0));
        assert_eq!(&raw[96..100], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&raw[100..104], &[0, 0, 0, 0], "case=padding_zeroed");
        assert_eq!(DirEntry::decode(&raw), entry);
    }

    #[test]
    fn rejects_unstorable_names() {
        assert!(matches!(
            DirEntry::new("", FragmentId::new(1)),
            Err(SfsError::InvalidName { .. })
        ));
        assert!(matches!(
            DirEntry::new("a\0b", FragmentId::new(1)),
            Err(SfsError::InvalidName { .. })
        ));
        let long = "x".repeat(DIR_NAME_LEN + 1);
        assert!(matches!(
            DirEntry::new(&long, FragmentId::new(1)),
            Err(SfsError::NameTooLong { len: 97, max: 96 })
        ));
    }

    #[test]
    fn full_width_name_has_no_terminator() {
        let name = "n".repeat(DIR_NAME_LEN);
        let entry = DirEntry::new(&name, FragmentId::new(3)).unwrap();
        assert_eq!(entry.name_bytes().len(), DIR_NAME_LEN);
        assert!(entry.matches(&name));
        // Only the first 96 bytes take part in the comparison.
        let longer = format!("{name}-suffix");
        assert!(entry.matches(&longer), "case=compare_bounded_to_field");
    }

    #[test]
    fn names_equal_stops_at_nul() {
        let mut field = [0_u8; DIR_NAME_LEN];
        field[..3].copy_from_slice(b"abc");
        field[4] = b'z';
        assert!(names_equal(&field, b"abc"));
        assert!(!names_equal(&field, b"ab"));
        assert!(!names_equal(&field, b"abcd"));
    }

    #[test]
    fn formatted_block_is_all_tombstones() {
        let mut block = vec![0x5A_u8; BlockSize::DEFAULT.as_usize()];
        format_empty_block(&mut block);
        let slots = entries_per_block(BlockSize::DEFAULT);
        let mut seen = 0;
        for (i, slot) in slots_mut(&mut block).enumerate() {
            assert!(slot.is_tombstone(), "case=slot_{i}");
            seen += 1;
        }
        assert_eq!(seen, slots, "case=partial_tail_skipped");
        let tail = &block[slots * DIR_ENTRY_SIZE..];
        assert_eq!(tail.len(), 4096 - 39 * 104);
        assert!(tail.iter().all(|&b| b == 0), "case=padding_zeroed");
    }

    #[test]
    fn slots_mut_skips_partial_record() {
        let mut buf = vec![0_u8; 2 * DIR_ENTRY_SIZE + 50];
        let entry = DirEntry::new("tail", FragmentId::new(4)).unwrap();
        let mut count = 0;
        for mut slot in slots_mut(&mut buf) {
            slot.store(&entry);
            count += 1;
        }
        assert_eq!(count, 2);
        assert!(buf[2 * DIR_ENTRY_SIZE..].iter().all(|&b| b == 0), "case=tail_untouched");

        let mut short = [0_u8; DIR_ENTRY_SIZE - 1];
        assert_eq!(slots_mut(&mut short).count(), 0, "case=no_whole_record");
    }

    #[test]
    fn slot_edits_land_in_buffer() {
        let mut raw = [0_u8; DIR_ENTRY_SIZE];
        let entry = DirEntry::new("var", FragmentId::new(9)).unwrap();
        {
            let mut slot = DirEntrySlot::new(&mut raw);
            slot.store(&entry);
            assert!(slot.matches("var"));
            slot.tombstone();
            assert!(slot.is_tombstone());
            assert_eq!(slot.name_bytes(), b"var", "case=tombstone_keeps_name");
        }
        assert!(!DirEntry::decode(&raw).is_live());
    }

    proptest! {
        #[test]
        fn prop_stored_name_matches_itself(name in "[a-zA-Z0-9._-]{1,96}", id in 0_u32..u32::MAX) {
            let entry = DirEntry::new(&name, FragmentId::new(id)).unwrap();
            let mut raw = [0_u8; DIR_ENTRY_SIZE];
            entry.encode_into(&mut raw);
            let slot = DirEntrySlot::new(&mut raw);
            prop_assert!(slot.matches(&name));
            prop_assert_eq!(slot.id().get(), id);
            prop_assert_eq!(slot.name_bytes(), name.as_bytes());
        }
    }
}
