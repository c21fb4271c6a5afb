//! Item: a positioned, sized, rotatable rectangle on the canvas.

use super::EntityId;
use crate::geometry::rotated_bounds;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A rectangle placed on the canvas.
///
/// While the item belongs to a group, `left`/`top` are relative to the
/// group's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub(crate) id: EntityId,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees around the item's center.
    pub rotate: f64,
    /// Owning group, if any. This is a back-reference only.
    pub(crate) id_group: Option<EntityId>,
}

impl Item {
    /// Default width/height for payloads that omit them.
    pub const DEFAULT_SIZE: f64 = 100.0;

    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            id: EntityId::new(),
            left,
            top,
            width,
            height,
            rotate: 0.0,
            id_group: None,
        }
    }

    /// Build an item from an add payload, generating an id when none is given.
    pub fn from_spec(spec: ItemSpec) -> Self {
        Self {
            id: spec.id.unwrap_or_default(),
            left: spec.left,
            top: spec.top,
            width: spec.width,
            height: spec.height,
            rotate: spec.rotate,
            id_group: None,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn id_group(&self) -> Option<&EntityId> {
        self.id_group.as_ref()
    }

    pub fn set_position(&mut self, left: f64, top: f64) {
        self.left = left;
        self.top = top;
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Unrotated frame in the item's own coordinate space.
    pub fn frame(&self) -> Rect {
        Rect::new(self.left, self.top, self.left + self.width, self.top + self.height)
    }

    /// Axis-aligned bounds including rotation.
    pub fn bounds(&self) -> Rect {
        rotated_bounds(self.frame(), self.rotate)
    }

    /// Deep copy of the current state, detached from this item.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot(self.clone())
    }
}

/// Frozen copy of an [`Item`] captured when a group is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSnapshot(Item);

impl ItemSnapshot {
    pub fn id(&self) -> &EntityId {
        &self.0.id
    }

    pub fn left(&self) -> f64 {
        self.0.left
    }

    pub fn top(&self) -> f64 {
        self.0.top
    }

    pub fn width(&self) -> f64 {
        self.0.width
    }

    pub fn height(&self) -> f64 {
        self.0.height
    }

    pub fn rotate(&self) -> f64 {
        self.0.rotate
    }

    pub fn id_group(&self) -> Option<&EntityId> {
        self.0.id_group.as_ref()
    }
}

/// Payload accepted by `SceneStore::add_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default = "default_size")]
    pub width: f64,
    #[serde(default = "default_size")]
    pub height: f64,
    #[serde(default)]
    pub rotate: f64,
}

fn default_size() -> f64 {
    Item::DEFAULT_SIZE
}

impl Default for ItemSpec {
    fn default() -> Self {
        Self {
            id: None,
            left: 0.0,
            top: 0.0,
            width: Item::DEFAULT_SIZE,
            height: Item::DEFAULT_SIZE,
            rotate: 0.0,
        }
    }
}

impl ItemSpec {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rotate(mut self, degrees: f64) -> Self {
        self.rotate = degrees;
        self
    }
}
