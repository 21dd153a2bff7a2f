//! Ordered collection of render items.

use slidecast_common::error::{SlidecastError, SlidecastResult};

use crate::item::{Bitmap, ItemId, RenderItem};

/// Insertion-ordered list of [`RenderItem`]s; order is playback order.
///
/// There is no reordering operation. A render borrows the sequence
/// immutably, so it cannot be mutated while a render is running.
#[derive(Debug, Clone, Default)]
pub struct ItemSequence {
    items: Vec<RenderItem>,
}

impl ItemSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the end of the sequence.
    ///
    /// Fails if an item with the same id is already present.
    pub fn append(&mut self, item: RenderItem) -> SlidecastResult<ItemId> {
        let id = item.id();
        if self.get(id).is_some() {
            return Err(SlidecastError::sequence(format!(
                "Item {id} is already in the sequence"
            )));
        }
        self.items.push(item);
        Ok(id)
    }

    /// Build an item with a fresh id and append it.
    pub fn push(
        &mut self,
        image: Bitmap,
        transition_pad_secs: f64,
        caption: impl Into<String>,
    ) -> ItemId {
        let item = RenderItem::new(image, transition_pad_secs, caption);
        let id = item.id();
        self.items.push(item);
        id
    }

    /// Remove the item with the given id, returning it if present.
    pub fn remove_by_id(&mut self, id: ItemId) -> Option<RenderItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: ItemId) -> Option<&RenderItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(RenderItem::id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[RenderItem] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a ItemSequence {
    type Item = &'a RenderItem;
    type IntoIter = std::slice::Iter<'a, RenderItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
