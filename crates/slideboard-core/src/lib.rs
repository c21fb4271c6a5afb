//! SlideBoard Core Library
//!
//! Platform-agnostic scene state for the SlideBoard canvas editor: items,
//! selection, grouping and the geometry behind group/ungroup.

pub mod config;
pub mod deferred;
pub mod error;
pub mod events;
pub mod geometry;
pub mod overlay;
pub mod position;
pub mod selection;
pub mod shapes;
pub mod store;

pub use config::{StoreConfig, UngroupScope};
pub use deferred::{DeferredTask, DeferredTasks, TaskHandle};
pub use error::{StoreError, StoreResult};
pub use events::{StoreEvent, SubscriptionId};
pub use geometry::{rotate, rotate_about_origin, rotated_bounds};
pub use overlay::{BoundsOverlay, Overlay, OverlayKind};
pub use position::PositionProvider;
pub use selection::{EntityRef, Selection};
pub use shapes::{EntityId, Group, Item, ItemSnapshot, ItemSpec};
pub use store::SceneStore;
