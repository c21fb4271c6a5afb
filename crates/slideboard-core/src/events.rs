//! Change notifications for the rendering layer.

use crate::overlay::OverlayKind;
use crate::shapes::EntityId;

/// Something in the store changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Items were appended to the scene.
    ItemsAdded { ids: Vec<EntityId> },
    /// Item or group geometry changed.
    GeometryChanged { ids: Vec<EntityId> },
    /// The selection set changed.
    SelectionChanged,
    /// A gesture flag or the step value changed.
    GestureChanged,
    DragStarted,
    DragEnded,
    GroupCreated { id: EntityId },
    GroupsDestroyed { ids: Vec<EntityId> },
    /// An overlay recomputed its box.
    OverlayUpdated { kind: OverlayKind },
    /// Everything was cleared.
    Reset,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Observer list notified after every store mutation.
#[derive(Default)]
pub struct Subscribers {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
