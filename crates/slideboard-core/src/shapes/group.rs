//! Group: a rotatable container holding a frozen snapshot of its members.

use super::{EntityId, ItemSnapshot};
use crate::geometry::rotated_bounds;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A group of items that is moved and rotated as a single unit.
///
/// Members keep living in the store's item table with group-local
/// coordinates; `grouped_items` records their state at grouping time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) id: EntityId,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the group's center.
    pub rotate: f64,
    pub(crate) z_index: i32,
    grouped_items: Vec<ItemSnapshot>,
}

impl Group {
    /// Create a group occupying `frame` with the given member snapshots.
    pub fn new(id: EntityId, frame: Rect, z_index: i32, grouped_items: Vec<ItemSnapshot>) -> Self {
        Self {
            id,
            left: frame.x0,
            top: frame.y0,
            width: frame.width(),
            height: frame.height(),
            rotate: 0.0,
            z_index,
            grouped_items,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Member snapshots taken when the group was created.
    pub fn grouped_items(&self) -> &[ItemSnapshot] {
        &self.grouped_items
    }

    /// Consume the group and hand back its member snapshots.
    pub fn ungroup(self) -> Vec<ItemSnapshot> {
        self.grouped_items
    }

    pub fn set_position(&mut self, left: f64, top: f64) {
        self.left = left;
        self.top = top;
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn frame(&self) -> Rect {
        Rect::new(self.left, self.top, self.left + self.width, self.top + self.height)
    }

    pub fn bounds(&self) -> Rect {
        rotated_bounds(self.frame(), self.rotate)
    }
}
