//! Bounding-box overlays that follow the current selection.
//!
//! The store keeps two of them: the selector (drawn around whatever is
//! selected) and the internal draggable (the multi-selection box that seeds
//! group geometry). The renderer may substitute its own implementations.

use kurbo::Rect;

/// An overlay tracking the visual extent of a selection.
pub trait Overlay {
    /// Current box, or `None` when the overlay has nothing to show.
    fn data(&self) -> Option<Rect>;

    /// Recompute the box from the bounds of the selected entities.
    fn update_position(&mut self, selection_bounds: &[Rect]);
}

/// Overlay that covers the union of the selection bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsOverlay {
    bounds: Option<Rect>,
}

impl BoundsOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay pinned to a fixed box until the next update.
    pub fn with_bounds(bounds: Rect) -> Self {
        Self { bounds: Some(bounds) }
    }
}

impl Overlay for BoundsOverlay {
    fn data(&self) -> Option<Rect> {
        self.bounds
    }

    fn update_position(&mut self, selection_bounds: &[Rect]) {
        self.bounds = selection_bounds
            .iter()
            .copied()
            .reduce(|acc, rect| acc.union(rect));
    }
}

/// Which of the store's overlays an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Selector,
    InternalDraggable,
}
