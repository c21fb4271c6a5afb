//! Ordered selection set and the view flags derived from it.

use crate::shapes::EntityId;
use serde::{Deserialize, Serialize};

/// Reference to a selectable entity, resolved through the store's tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Item(EntityId),
    Group(EntityId),
}

impl EntityRef {
    pub fn item(id: impl Into<EntityId>) -> Self {
        Self::Item(id.into())
    }

    pub fn group(id: impl Into<EntityId>) -> Self {
        Self::Group(id.into())
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Self::Item(id) | Self::Group(id) => id,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

/// Ordered set of selected entities. Membership is keyed on id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    entries: Vec<EntityRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.position(entity.id()).is_some()
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Append the entity if absent, otherwise remove it.
    /// Returns true if the entity is selected afterwards.
    pub fn toggle(&mut self, entity: EntityRef) -> bool {
        match self.position(entity.id()) {
            Some(index) => {
                self.entries.remove(index);
                false
            }
            None => {
                self.entries.push(entity);
                true
            }
        }
    }

    /// Remove the entity if present. Returns true if something was removed.
    pub fn remove(&mut self, entity: &EntityRef) -> bool {
        match self.position(entity.id()) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[EntityRef] {
        &self.entries
    }

    /// Ids of the selected items, in selection order.
    pub fn item_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.iter().filter_map(|e| match e {
            EntityRef::Item(id) => Some(id),
            EntityRef::Group(_) => None,
        })
    }

    /// Ids of the selected groups, in selection order.
    pub fn group_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.iter().filter_map(|e| match e {
            EntityRef::Group(id) => Some(id),
            EntityRef::Item(_) => None,
        })
    }

    pub fn show_selector(&self) -> bool {
        !self.is_empty()
    }

    pub fn show_internal_draggable(&self) -> bool {
        self.len() > 1
    }

    pub fn any_group(&self) -> bool {
        self.entries.iter().any(EntityRef::is_group)
    }

    /// True when every selected entity is a group (vacuously true when empty).
    pub fn all_group(&self) -> bool {
        self.entries.iter().all(EntityRef::is_group)
    }

    pub fn show_group(&self) -> bool {
        self.len() > 1 && !self.any_group()
    }

    pub fn show_un_group(&self) -> bool {
        !self.is_empty() && self.all_group()
    }

    pub fn hide_resizing_middle(&self) -> bool {
        self.len() > 1 || self.any_group()
    }

    pub fn hide_any_resizing(&self) -> bool {
        self.len() > 1 && self.any_group()
    }
}
