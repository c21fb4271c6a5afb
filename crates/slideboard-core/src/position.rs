//! Access to on-screen positions owned by the rendering layer.

use crate::shapes::EntityId;
use kurbo::Point;
use std::collections::HashMap;

/// Supplies the final rendered top-left position of an entity at drag end.
pub trait PositionProvider {
    fn position(&self, id: &EntityId) -> Option<Point>;
}

impl PositionProvider for HashMap<EntityId, Point> {
    fn position(&self, id: &EntityId) -> Option<Point> {
        self.get(id).copied()
    }
}

impl<F> PositionProvider for F
where
    F: Fn(&EntityId) -> Option<Point>,
{
    fn position(&self, id: &EntityId) -> Option<Point> {
        self(id)
    }
}
