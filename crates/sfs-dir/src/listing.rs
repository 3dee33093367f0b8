//! Administrative directory listing.

use std::fmt;

use sfs_types::FragmentId;

/// One live slot seen during a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    /// Slot index counted across all blocks, tombstones included.
    pub slot: usize,
    pub id: FragmentId,
    pub name: String,
}

/// Snapshot of a directory for operators and debugging tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    pub id: FragmentId,
    pub name: String,
    /// Byte size of the directory node.
    pub size: u64,
    /// Total number of slots visited.
    pub slots: usize,
    pub entries: Vec<ListedEntry>,
}

impl fmt::Display for DirectoryListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  Listing of id={}, name='{}', with size={}",
            self.id, self.name, self.size
        )?;
        for entry in &self.entries {
            writeln!(f, "  {:3}: {:7} '{}'", entry.slot, entry.id.get(), entry.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_rows() {
        let listing = DirectoryListing {
            id: FragmentId::new(0),
            name: "/".to_owned(),
            size: 4096,
            slots: 39,
            entries: vec![
                ListedEntry {
                    slot: 0,
                    id: FragmentId::new(1),
                    name: "bin".to_owned(),
                },
                ListedEntry {
                    slot: 12,
                    id: FragmentId::new(1234),
                    name: "home".to_owned(),
                },
            ],
        };
        assert_eq!(
            listing.to_string(),
            "  Listing of id=0, name='/', with size=4096\n\
             \x20   0:       1 'bin'\n\
             \x20  12:    1234 'home'\n"
        );
    }
}
