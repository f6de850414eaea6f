//! Page Collection Manager.
//!
//! The ordered list of page entries. Its order is the order the user sees
//! and the order a merge uses; there is no second copy to drift out of sync.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use super::ids::{FileId, PageId};
use super::rotation::Rotation;
use crate::error::{PdfCollateError, Result};
use crate::render::Thumbnail;

/// One page of one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    /// Session-unique page id.
    pub id: PageId,
    /// File the page comes from. Lookup only.
    pub file_id: FileId,
    /// 1-based page number within the file.
    pub page_number: u32,
    /// Rendered thumbnail.
    #[serde(skip)]
    pub thumbnail: Arc<Thumbnail>,
    /// Rotation applied on merge.
    pub rotation: Rotation,
    /// Caption, e.g. `File 1 - Page 3`.
    pub label: String,
}

impl PageEntry {
    /// Build an unrotated entry with the standard caption.
    pub fn new(
        id: PageId,
        file_id: FileId,
        display_name: &str,
        page_number: u32,
        thumbnail: Thumbnail,
    ) -> Self {
        Self {
            id,
            file_id,
            page_number,
            thumbnail: Arc::new(thumbnail),
            rotation: Rotation::NONE,
            label: format!("{display_name} - Page {page_number}"),
        }
    }
}

/// Ordered page entries with unique ids.
#[derive(Debug, Clone, Default)]
pub struct PageCollection {
    entries: Vec<PageEntry>,
}

impl PageCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end.
    pub fn append(&mut self, entry: PageEntry) -> Result<()> {
        if self.position(entry.id).is_some() {
            return Err(PdfCollateError::DuplicatePage(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Remove an entry. Absent ids are ignored.
    pub fn remove(&mut self, page_id: PageId) -> Option<PageEntry> {
        self.position(page_id)
            .map(|index| self.entries.remove(index))
    }

    /// Replace the order with `ids`.
    ///
    /// Unknown ids are dropped, a repeated id keeps its first position and
    /// entries not named in `ids` leave the collection. Returns the number
    /// of ids that were dropped.
    pub fn reorder(&mut self, ids: &[PageId]) -> usize {
        let mut remaining = std::mem::take(&mut self.entries);
        let mut seen = HashSet::with_capacity(ids.len());
        let mut dropped = 0;

        for &id in ids {
            if !seen.insert(id) {
                dropped += 1;
                continue;
            }
            match remaining.iter().position(|entry| entry.id == id) {
                Some(index) => self.entries.push(remaining.swap_remove(index)),
                None => dropped += 1,
            }
        }

        dropped
    }

    /// Reorder from the element ids the sortable widget reports.
    ///
    /// Ids that do not parse are treated like unknown ids.
    pub fn reorder_from_element_ids<S: AsRef<str>>(&mut self, element_ids: &[S]) -> usize {
        let mut unparsable = 0;
        let ids: Vec<PageId> = element_ids
            .iter()
            .filter_map(|raw| {
                let parsed = raw.as_ref().parse().ok();
                if parsed.is_none() {
                    unparsable += 1;
                }
                parsed
            })
            .collect();

        unparsable + self.reorder(&ids)
    }

    /// Add `delta` degrees to a page's rotation.
    ///
    /// Returns the new rotation, or `None` if the page is not present.
    pub fn rotate(&mut self, page_id: PageId, delta: i32) -> Result<Option<Rotation>> {
        let Some(index) = self.position(page_id) else {
            return Ok(None);
        };
        let entry = &mut self.entries[index];
        entry.rotation = entry.rotation.rotated_by(delta)?;
        Ok(Some(entry.rotation))
    }

    /// Copy of the current order, for a merge.
    pub fn snapshot(&self) -> Vec<PageEntry> {
        self.entries.clone()
    }

    /// Page ids in order.
    pub fn ids(&self) -> Vec<PageId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    /// Look up an entry.
    pub fn get(&self, page_id: PageId) -> Option<&PageEntry> {
        self.position(page_id).map(|index| &self.entries[index])
    }

    /// Entries backed by `file_id`, in collection order.
    pub fn pages_for_file(&self, file_id: FileId) -> Vec<&PageEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.file_id == file_id)
            .collect()
    }

    /// Whether any entry is backed by `file_id`.
    pub fn references_file(&self, file_id: FileId) -> bool {
        self.entries.iter().any(|entry| entry.file_id == file_id)
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = &PageEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, page_id: PageId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == page_id)
    }
}
