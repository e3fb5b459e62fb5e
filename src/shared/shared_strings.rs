//! Shared string table

use crate::error::{Error, Result};
use crate::shared::intern::InternTable;
use crate::workbook::RichText;

/// Deduplicated strings referenced by index from cells
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedStringTable {
    strings: InternTable<RichText>,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `text`, appending it if unseen.
    pub fn intern(&mut self, text: RichText) -> u32 {
        self.strings.intern(text)
    }

    /// Append an entry read from a file, keeping duplicates at their index.
    pub fn push(&mut self, text: RichText) -> u32 {
        self.strings.push(text)
    }

    pub fn get(&self, index: u32) -> Result<&RichText> {
        self.strings.get(index).ok_or_else(|| {
            Error::InvalidReference(format!(
                "shared string {} of {}",
                index,
                self.strings.len()
            ))
        })
    }

    pub fn find(&self, text: &RichText) -> Option<u32> {
        self.strings.find(text)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RichText> {
        self.strings.iter()
    }

    pub fn clear(&mut self) {
        self.strings.clear();
    }
}
