//! Scene store: owns items and groups and exposes every scene mutation.

use crate::config::{StoreConfig, UngroupScope};
use crate::deferred::{DeferredTask, DeferredTasks, TaskHandle};
use crate::error::{StoreError, StoreResult};
use crate::events::{StoreEvent, SubscriptionId, Subscribers};
use crate::geometry::{rotate, rotate_about_origin};
use crate::overlay::{BoundsOverlay, Overlay, OverlayKind};
use crate::position::PositionProvider;
use crate::selection::{EntityRef, Selection};
use crate::shapes::{EntityId, Group, Item, ItemSpec};
use kurbo::{Point, Rect};
use std::collections::{HashMap, HashSet};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Top-level aggregate for a canvas scene.
pub struct SceneStore {
    config: StoreConfig,
    /// All items, keyed by id.
    items: HashMap<EntityId, Item>,
    /// Insertion order of items.
    item_order: Vec<EntityId>,
    groups: Vec<Group>,
    selection: Selection,
    is_dragging: bool,
    is_rotating: bool,
    is_resizing: bool,
    /// Step used for nudging and zoom.
    delta: f64,
    /// Box drawn around the current selection.
    selector: Box<dyn Overlay>,
    /// Multi-selection box; seeds the geometry of new groups.
    internal_draggable: Box<dyn Overlay>,
    deferred: DeferredTasks,
    subscribers: Subscribers,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Create an empty store, rejecting an unusable configuration.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        Self {
            delta: config.default_delta,
            config,
            items: HashMap::new(),
            item_order: Vec::new(),
            groups: Vec::new(),
            selection: Selection::new(),
            is_dragging: false,
            is_rotating: false,
            is_resizing: false,
            selector: Box::new(BoundsOverlay::new()),
            internal_draggable: Box::new(BoundsOverlay::new()),
            deferred: DeferredTasks::new(),
            subscribers: Subscribers::new(),
        }
    }

    /// Replace the selector and multi-selection overlays.
    pub fn with_overlays(
        mut self,
        selector: impl Overlay + 'static,
        internal_draggable: impl Overlay + 'static,
    ) -> Self {
        self.selector = Box::new(selector);
        self.internal_draggable = Box::new(internal_draggable);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Lookups ---------------------------------------------------------

    pub fn item(&self, id: &EntityId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.item_order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn group(&self, id: &EntityId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.id == id)
    }

    fn group_mut(&mut self, id: &EntityId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| &g.id == id)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected(&self) -> &[EntityRef] {
        self.selection.as_slice()
    }

    pub fn is_selected(&self, entity: &EntityRef) -> bool {
        self.selection.contains(entity)
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn is_rotating(&self) -> bool {
        self.is_rotating
    }

    pub fn is_resizing(&self) -> bool {
        self.is_resizing
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn selector(&self) -> &dyn Overlay {
        self.selector.as_ref()
    }

    pub fn internal_draggable(&self) -> &dyn Overlay {
        self.internal_draggable.as_ref()
    }

    fn exists(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Item(id) => self.items.contains_key(id),
            EntityRef::Group(id) => self.group(id).is_some(),
        }
    }

    fn resolve(&self, entity: &EntityRef) -> StoreResult<()> {
        if self.exists(entity) {
            Ok(())
        } else {
            Err(StoreError::UnknownEntity(entity.id().clone()))
        }
    }

    fn id_in_use(&self, id: &EntityId) -> bool {
        self.items.contains_key(id) || self.group(id).is_some()
    }

    /// Scene-space bounds of an entity. Grouped items are offset by their group.
    pub fn entity_bounds(&self, entity: &EntityRef) -> Option<Rect> {
        match entity {
            EntityRef::Item(id) => {
                let item = self.items.get(id)?;
                let bounds = item.bounds();
                match item.id_group.as_ref().and_then(|g| self.group(g)) {
                    Some(group) => Some(bounds + group.top_left().to_vec2()),
                    None => Some(bounds),
                }
            }
            EntityRef::Group(id) => self.group(id).map(Group::bounds),
        }
    }

    fn selection_bounds(&self) -> Vec<Rect> {
        self.selection
            .iter()
            .filter_map(|e| self.entity_bounds(e))
            .collect()
    }

    fn top_left(&self, entity: &EntityRef) -> Option<Point> {
        match entity {
            EntityRef::Item(id) => self.items.get(id).map(|i| Point::new(i.left, i.top)),
            EntityRef::Group(id) => self.group(id).map(Group::top_left),
        }
    }

    fn set_position(&mut self, entity: &EntityRef, position: Point) {
        match entity {
            EntityRef::Item(id) => {
                if let Some(item) = self.items.get_mut(id) {
                    item.set_position(position.x, position.y);
                }
            }
            EntityRef::Group(id) => {
                if let Some(group) = self.group_mut(id) {
                    group.set_position(position.x, position.y);
                }
            }
        }
    }

    // --- Views -----------------------------------------------------------

    pub fn show_selector(&self) -> bool {
        self.selection.show_selector()
    }

    pub fn show_internal_draggable(&self) -> bool {
        self.selection.show_internal_draggable()
    }

    pub fn any_group(&self) -> bool {
        self.selection.any_group()
    }

    pub fn all_group(&self) -> bool {
        self.selection.all_group()
    }

    pub fn show_group(&self) -> bool {
        self.selection.show_group()
    }

    pub fn show_un_group(&self) -> bool {
        self.selection.show_un_group()
    }

    pub fn hide_resizing_middle(&self) -> bool {
        self.selection.hide_resizing_middle()
    }

    pub fn hide_any_resizing(&self) -> bool {
        self.selection.hide_any_resizing()
    }

    // --- Notifications ---------------------------------------------------

    /// Register a listener called after every mutation.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&StoreEvent) + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers.emit(&event);
    }

    /// Overlays follow the selection; recompute them before announcing it.
    fn selection_changed(&mut self) {
        self.refresh_overlays();
        self.notify(StoreEvent::SelectionChanged);
    }

    // --- Items -----------------------------------------------------------

    /// Append one item per spec, preserving order. Returns the new ids.
    pub fn add_items(
        &mut self,
        specs: impl IntoIterator<Item = ItemSpec>,
    ) -> StoreResult<Vec<EntityId>> {
        let new_items: Vec<Item> = specs.into_iter().map(Item::from_spec).collect();

        let mut seen = HashSet::new();
        for item in &new_items {
            if self.id_in_use(&item.id) || !seen.insert(item.id.clone()) {
                return Err(StoreError::DuplicateId(item.id.clone()));
            }
        }

        let ids: Vec<EntityId> = new_items.iter().map(|i| i.id.clone()).collect();
        for item in new_items {
            self.item_order.push(item.id.clone());
            self.items.insert(item.id.clone(), item);
        }

        log::debug!("Added {} item(s)", ids.len());
        self.notify(StoreEvent::ItemsAdded { ids: ids.clone() });
        Ok(ids)
    }

    /// Commit a new size for an item or group.
    pub fn set_size(&mut self, entity: &EntityRef, width: f64, height: f64) -> StoreResult<()> {
        match entity {
            EntityRef::Item(id) => {
                let item = self
                    .items
                    .get_mut(id)
                    .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
                item.width = width;
                item.height = height;
            }
            EntityRef::Group(id) => {
                let group = self
                    .group_mut(id)
                    .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
                group.width = width;
                group.height = height;
            }
        }
        self.refresh_overlays();
        self.notify(StoreEvent::GeometryChanged { ids: vec![entity.id().clone()] });
        Ok(())
    }

    /// Commit a new rotation (degrees) for an item or group.
    pub fn set_rotation(&mut self, entity: &EntityRef, degrees: f64) -> StoreResult<()> {
        match entity {
            EntityRef::Item(id) => {
                let item = self
                    .items
                    .get_mut(id)
                    .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
                item.rotate = degrees;
            }
            EntityRef::Group(id) => {
                let group = self
                    .group_mut(id)
                    .ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
                group.rotate = degrees;
            }
        }
        self.refresh_overlays();
        self.notify(StoreEvent::GeometryChanged { ids: vec![entity.id().clone()] });
        Ok(())
    }

    // --- Selection -------------------------------------------------------

    /// Toggle an entity in the selection. Returns true if it is now selected.
    pub fn select_item(&mut self, entity: EntityRef) -> StoreResult<bool> {
        self.resolve(&entity)?;
        let selected = self.selection.toggle(entity);
        log::debug!("Selection toggled, {} selected", self.selection.len());
        self.selection_changed();
        Ok(selected)
    }

    /// Remove an entity from the selection if present.
    pub fn un_select_item(&mut self, entity: &EntityRef) {
        if self.selection.remove(entity) {
            self.selection_changed();
        }
    }

    /// Clear the selection. No-op when already empty.
    pub fn clean_all(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.selection_changed();
        }
    }

    // --- Gestures --------------------------------------------------------

    /// Begin a drag. Dragging an unselected entity makes it the only selection.
    pub fn start_drag(&mut self, item_to_move: Option<EntityRef>) -> StoreResult<()> {
        if let Some(entity) = &item_to_move {
            self.resolve(entity)?;
        }

        self.is_dragging = true;
        if let Some(entity) = item_to_move {
            if !self.selection.contains(&entity) {
                self.clean_all();
                self.select_item(entity)?;
            }
        }

        self.notify(StoreEvent::DragStarted);
        Ok(())
    }

    /// Finish a drag, committing the rendered position of every selected entity.
    ///
    /// All positions are read and validated before any is written, so a
    /// failed call leaves the scene and the drag untouched.
    pub fn end_drag<P>(&mut self, positions: &P) -> StoreResult<()>
    where
        P: PositionProvider + ?Sized,
    {
        if !self.is_dragging {
            return Err(StoreError::NotDragging);
        }

        let mut commits = Vec::with_capacity(self.selection.len());
        for entity in self.selection.iter() {
            let id = entity.id();
            let point = positions
                .position(id)
                .ok_or_else(|| StoreError::PositionUnavailable(id.clone()))?;
            if !point.is_finite() {
                return Err(StoreError::InvalidPosition { id: id.clone(), x: point.x, y: point.y });
            }
            commits.push((entity.clone(), point));
        }

        let ids = commits.iter().map(|(e, _)| e.id().clone()).collect();
        for (entity, point) in &commits {
            self.set_position(entity, *point);
        }
        self.is_dragging = false;

        log::debug!("Drag ended, committed {} position(s)", commits.len());
        self.refresh_overlays();
        self.notify(StoreEvent::GeometryChanged { ids });
        self.notify(StoreEvent::DragEnded);
        Ok(())
    }

    pub fn set_rotating(&mut self, rotating: bool) {
        self.is_rotating = rotating;
        self.notify(StoreEvent::GestureChanged);
    }

    pub fn set_resizing(&mut self, resizing: bool) {
        self.is_resizing = resizing;
        self.notify(StoreEvent::GestureChanged);
    }

    /// Set the nudge/zoom step. Must be finite and positive.
    pub fn set_delta(&mut self, delta: f64) -> StoreResult<()> {
        if !delta.is_finite() || delta <= 0.0 {
            return Err(StoreError::InvalidDelta(delta));
        }
        self.delta = delta;
        self.notify(StoreEvent::GestureChanged);
        Ok(())
    }

    /// Move every selected entity by the given number of steps.
    pub fn nudge_selection(&mut self, dx_steps: f64, dy_steps: f64) {
        if self.selection.is_empty() {
            return;
        }

        let offset = kurbo::Vec2::new(dx_steps * self.delta, dy_steps * self.delta);
        let moves: Vec<(EntityRef, Point)> = self
            .selection
            .iter()
            .filter_map(|e| self.top_left(e).map(|p| (e.clone(), p + offset)))
            .collect();

        let ids = moves.iter().map(|(e, _)| e.id().clone()).collect();
        for (entity, point) in &moves {
            self.set_position(entity, *point);
        }
        self.refresh_overlays();
        self.notify(StoreEvent::GeometryChanged { ids });
    }

    // --- Grouping --------------------------------------------------------

    /// Group the selected items into a new group named `group_id`.
    ///
    /// The group takes the box of the multi-selection overlay. Members switch
    /// to group-local coordinates and the new group becomes the selection.
    pub fn create_group(&mut self, group_id: impl Into<EntityId>) -> StoreResult<EntityId> {
        let group_id = group_id.into();

        let count = self.selection.len();
        if count < 2 {
            return Err(StoreError::NotEnoughSelected(count));
        }
        if let Some(nested) = self.selection.group_ids().next() {
            return Err(StoreError::CannotNestGroups(nested.clone()));
        }
        if self.id_in_use(&group_id) {
            return Err(StoreError::DuplicateId(group_id));
        }

        let members: Vec<EntityId> = self.selection.item_ids().cloned().collect();
        let mut snapshots = Vec::with_capacity(members.len());
        for id in &members {
            let item = self.items.get(id).ok_or_else(|| StoreError::UnknownEntity(id.clone()))?;
            if let Some(owner) = &item.id_group {
                return Err(StoreError::CannotNestGroups(owner.clone()));
            }
            snapshots.push(item.snapshot());
        }

        let frame = self
            .internal_draggable
            .data()
            .ok_or(StoreError::OverlayUnavailable)?;
        let group = Group::new(group_id.clone(), frame, self.config.group_z_index, snapshots);

        for id in &members {
            if let Some(item) = self.items.get_mut(id) {
                item.id_group = Some(group_id.clone());
                item.top -= group.top;
                item.left -= group.left;
            }
        }

        self.selection.clear();
        self.groups.push(group);
        self.selection.toggle(EntityRef::Group(group_id.clone()));

        self.deferred.schedule(
            DeferredTask::RefreshSelector,
            Instant::now(),
            self.config.overlay_refresh_delay(),
        );

        log::info!("Created group {} with {} item(s)", group_id, members.len());
        self.notify(StoreEvent::GeometryChanged { ids: members });
        self.notify(StoreEvent::GroupCreated { id: group_id.clone() });
        self.selection_changed();
        Ok(group_id)
    }

    /// Dissolve groups, baking each group's rotation into its members.
    ///
    /// Which groups are dissolved follows [`StoreConfig::ungroup_scope`].
    /// Returns the ids of the dissolved groups.
    pub fn destroy_group(&mut self) -> Vec<EntityId> {
        let targets: Vec<Group> = match self.config.ungroup_scope {
            UngroupScope::AllGroups => std::mem::take(&mut self.groups),
            UngroupScope::Selected => {
                let selected: HashSet<EntityId> = self.selection.group_ids().cloned().collect();
                let (targets, kept): (Vec<Group>, Vec<Group>) = std::mem::take(&mut self.groups)
                    .into_iter()
                    .partition(|g| selected.contains(&g.id));
                self.groups = kept;
                targets
            }
        };

        let mut ids = Vec::with_capacity(targets.len());
        let mut touched = Vec::new();
        for group in targets {
            ids.push(group.id.clone());
            touched.extend(self.dissolve(group));
        }

        self.clean_all();
        self.refresh_overlays();

        log::info!("Destroyed {} group(s)", ids.len());
        if !touched.is_empty() {
            self.notify(StoreEvent::GeometryChanged { ids: touched });
        }
        self.notify(StoreEvent::GroupsDestroyed { ids: ids.clone() });
        ids
    }

    /// Move a group's members back to scene coordinates.
    fn dissolve(&mut self, group: Group) -> Vec<EntityId> {
        let new_position_group = rotate_about_origin(group.rotate)(group.top_left());
        let turn = rotate(group.rotate, group.center());

        let mut touched = Vec::new();
        for member in group.grouped_items() {
            let Some(item) = self.items.get_mut(member.id()) else {
                log::warn!("Group {} lists missing item {}", group.id, member.id());
                continue;
            };
            if item.id_group.as_ref() != Some(&group.id) {
                log::warn!("Item {} no longer belongs to group {}", item.id, group.id);
                continue;
            }

            item.id_group = None;
            let center = turn(item.center());
            item.left = center.x - item.width / 2.0 + new_position_group.x;
            item.top = center.y - item.height / 2.0 + new_position_group.y;
            item.rotate += group.rotate;
            touched.push(item.id.clone());
        }
        touched
    }

    // --- Overlays and deferred work --------------------------------------

    /// Recompute both overlays from the current selection.
    pub fn refresh_overlays(&mut self) {
        self.refresh_selector();
        let bounds = self.selection_bounds();
        self.internal_draggable.update_position(&bounds);
        self.notify(StoreEvent::OverlayUpdated { kind: OverlayKind::InternalDraggable });
    }

    fn refresh_selector(&mut self) {
        let bounds = self.selection_bounds();
        self.selector.update_position(&bounds);
        self.notify(StoreEvent::OverlayUpdated { kind: OverlayKind::Selector });
    }

    /// Run every deferred task due at `now`. Returns how many ran.
    pub fn run_pending_tasks(&mut self, now: Instant) -> usize {
        let due = self.deferred.take_due(now);
        for task in &due {
            match task {
                DeferredTask::RefreshSelector => self.refresh_selector(),
                DeferredTask::RefreshOverlays => self.refresh_overlays(),
            }
        }
        due.len()
    }

    /// Queue a refresh of both overlays after the configured delay.
    pub fn schedule_overlay_refresh(&mut self) -> TaskHandle {
        self.deferred.schedule(
            DeferredTask::RefreshOverlays,
            Instant::now(),
            self.config.overlay_refresh_delay(),
        )
    }

    /// Cancel a queued task. Returns true if it had not run yet.
    pub fn cancel_task(&mut self, handle: TaskHandle) -> bool {
        self.deferred.cancel(handle)
    }

    pub fn pending_task_count(&self) -> usize {
        self.deferred.len()
    }

    /// Cancel deferred work and drop all listeners.
    pub fn dispose(&mut self) {
        let cancelled = self.deferred.cancel_all();
        if cancelled > 0 {
            log::debug!("Disposed store, cancelled {} pending task(s)", cancelled);
        }
        self.subscribers.clear();
    }

    /// Clear the whole scene: items, groups, selection, flags and pending work.
    pub fn reset(&mut self) {
        self.items.clear();
        self.item_order.clear();
        self.groups.clear();
        self.selection.clear();
        self.is_dragging = false;
        self.is_rotating = false;
        self.is_resizing = false;
        self.delta = self.config.default_delta;
        self.deferred.cancel_all();
        self.selector.update_position(&[]);
        self.internal_draggable.update_position(&[]);

        log::info!("Scene reset");
        self.notify(StoreEvent::Reset);
    }
}

impl std::fmt::Debug for SceneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneStore")
            .field("items", &self.items.len())
            .field("groups", &self.groups.len())
            .field("selection", &self.selection)
            .field("is_dragging", &self.is_dragging)
            .field("is_rotating", &self.is_rotating)
            .field("is_resizing", &self.is_resizing)
            .field("delta", &self.delta)
            .field("pending_tasks", &self.deferred.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < EPS, "{} != {}", actual, expected);
    }

    /// A(0,0,10,10) and B(20,0,10,10), both selected.
    fn two_selected() -> (SceneStore, EntityId, EntityId) {
        let mut store = SceneStore::new();
        let ids = store
            .add_items([
                ItemSpec::new(0.0, 0.0, 10.0, 10.0).with_id("a"),
                ItemSpec::new(20.0, 0.0, 10.0, 10.0).with_id("b"),
            ])
            .unwrap();
        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();
        (store, ids[0].clone(), ids[1].clone())
    }

    #[test]
    fn test_add_items_preserves_order() {
        let mut store = SceneStore::new();
        let ids = store
            .add_items([ItemSpec::new(1.0, 0.0, 5.0, 5.0), ItemSpec::new(2.0, 0.0, 5.0, 5.0)])
            .unwrap();

        let lefts: Vec<f64> = store.items().map(|i| i.left).collect();
        assert_eq!(lefts, vec![1.0, 2.0]);
        assert_eq!(store.items().map(|i| i.id().clone()).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_add_items_from_json_payload() {
        let payload = r#"[{"left": 4, "top": 8, "width": 12, "height": 6, "rotate": 30}, {}]"#;
        let specs: Vec<ItemSpec> = serde_json::from_str(payload).unwrap();
        let mut store = SceneStore::new();
        let ids = store.add_items(specs).unwrap();

        let first = store.item(&ids[0]).unwrap();
        assert_close(first.rotate, 30.0);
        let second = store.item(&ids[1]).unwrap();
        assert_close(second.width, Item::DEFAULT_SIZE);
    }

    #[test]
    fn test_add_items_rejects_duplicates() {
        let mut store = SceneStore::new();
        store.add_items([ItemSpec::default().with_id("a")]).unwrap();

        let err = store
            .add_items([ItemSpec::default().with_id("c"), ItemSpec::default().with_id("a")])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id.as_str() == "a"));
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_select_item_twice_restores_selection() {
        let (mut store, _, _) = two_selected();
        store.add_items([ItemSpec::default().with_id("c")]).unwrap();
        let before = store.selection().clone();

        assert!(store.select_item(EntityRef::item("c")).unwrap());
        assert!(!store.select_item(EntityRef::item("c")).unwrap());
        assert_eq!(store.selection(), &before);
    }

    #[test]
    fn test_select_unknown_entity() {
        let mut store = SceneStore::new();
        let err = store.select_item(EntityRef::item("ghost")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownEntity(_)));
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_un_select_and_clean_all() {
        let (mut store, a, _) = two_selected();
        store.un_select_item(&EntityRef::Item(a.clone()));
        store.un_select_item(&EntityRef::Item(a));
        assert_eq!(store.selected().len(), 1);

        store.clean_all();
        assert!(store.selection().is_empty());
        store.clean_all();
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_clean_all_on_empty_emits_nothing() {
        let mut store = SceneStore::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        store.clean_all();
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_show_group_views() {
        let (mut store, _, _) = two_selected();
        assert!(store.show_group());
        assert!(store.show_internal_draggable());
        assert!(store.hide_resizing_middle());
        assert!(!store.hide_any_resizing());

        store.create_group("g1").unwrap();
        assert!(!store.show_group());
        assert!(store.show_un_group());
        assert!(store.any_group());
        assert!(store.all_group());
    }

    #[test]
    fn test_start_drag_selects_unselected_item() {
        let (mut store, _, _) = two_selected();
        store.add_items([ItemSpec::default().with_id("c")]).unwrap();

        store.start_drag(Some(EntityRef::item("c"))).unwrap();
        assert!(store.is_dragging());
        assert_eq!(store.selected(), &[EntityRef::item("c")]);
    }

    #[test]
    fn test_start_drag_keeps_selection_when_already_selected() {
        let (mut store, a, _) = two_selected();
        store.start_drag(Some(EntityRef::Item(a))).unwrap();
        assert_eq!(store.selected().len(), 2);

        store.start_drag(None).unwrap();
        assert_eq!(store.selected().len(), 2);
    }

    #[test]
    fn test_end_drag_commits_positions() {
        let (mut store, a, b) = two_selected();
        store.start_drag(None).unwrap();

        let mut positions = HashMap::new();
        positions.insert(a.clone(), Point::new(5.0, 6.0));
        positions.insert(b.clone(), Point::new(25.0, 6.0));
        store.end_drag(&positions).unwrap();

        assert!(!store.is_dragging());
        let item_a = store.item(&a).unwrap();
        assert_close(item_a.left, 5.0);
        assert_close(item_a.top, 6.0);
        assert_close(store.item(&b).unwrap().left, 25.0);
    }

    #[test]
    fn test_end_drag_preconditions() {
        let (mut store, a, _) = two_selected();
        let everywhere = |_: &EntityId| Some(Point::new(1.0, 1.0));
        assert!(matches!(store.end_drag(&everywhere), Err(StoreError::NotDragging)));

        store.start_drag(None).unwrap();
        let only_a = |id: &EntityId| (id.as_str() == "a").then_some(Point::new(9.0, 9.0));
        assert!(matches!(
            store.end_drag(&only_a),
            Err(StoreError::PositionUnavailable(id)) if id.as_str() == "b"
        ));
        // Nothing committed on failure.
        assert_close(store.item(&a).unwrap().left, 0.0);
        assert!(store.is_dragging());

        let broken = |_: &EntityId| Some(Point::new(f64::NAN, 0.0));
        assert!(matches!(store.end_drag(&broken), Err(StoreError::InvalidPosition { .. })));
    }

    #[test]
    fn test_create_group_scenario() {
        let (mut store, a, b) = two_selected();
        assert_eq!(store.internal_draggable().data(), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));

        let gid = store.create_group("g1").unwrap();

        let item_a = store.item(&a).unwrap();
        let item_b = store.item(&b).unwrap();
        assert_close(item_a.left, 0.0);
        assert_close(item_a.top, 0.0);
        assert_close(item_b.left, 20.0);
        assert_close(item_b.top, 0.0);
        assert_eq!(item_a.id_group(), Some(&gid));
        assert_eq!(item_b.id_group(), Some(&gid));

        let group = store.group(&gid).unwrap();
        assert_eq!(group.z_index(), 10);
        assert_close(group.width, 30.0);
        assert_close(group.height, 10.0);
        let members: Vec<&str> = group.grouped_items().iter().map(|s| s.id().as_str()).collect();
        assert_eq!(members, ["a", "b"]);
        assert_eq!(store.selected(), &[EntityRef::group("g1")]);
    }

    #[test]
    fn test_create_group_uses_group_local_coordinates() {
        let mut store = SceneStore::new();
        store
            .add_items([
                ItemSpec::new(100.0, 50.0, 10.0, 10.0).with_id("a"),
                ItemSpec::new(130.0, 70.0, 10.0, 10.0).with_id("b"),
            ])
            .unwrap();
        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();
        store.create_group("g").unwrap();

        let b = store.item(&EntityId::from("b")).unwrap();
        assert_close(b.left, 30.0);
        assert_close(b.top, 20.0);

        let snapshot = &store.group(&EntityId::from("g")).unwrap().grouped_items()[1];
        assert_close(snapshot.left(), 130.0);
        assert!(snapshot.id_group().is_none());
    }

    #[test]
    fn test_select_then_group_without_manual_refresh() {
        let (mut store, _, _) = two_selected();
        let gid = store.create_group("g0").unwrap();

        let group = store.group(&gid).unwrap();
        assert_eq!(group.frame(), Rect::new(0.0, 0.0, 30.0, 10.0));
        assert_eq!(store.selector().data(), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));
    }

    #[test]
    fn test_group_frame_follows_selection_changes() {
        let (mut store, _, _) = two_selected();
        store.add_items([ItemSpec::new(100.0, 100.0, 10.0, 10.0).with_id("c")]).unwrap();
        store.select_item(EntityRef::item("c")).unwrap();
        assert_eq!(store.internal_draggable().data(), Some(Rect::new(0.0, 0.0, 110.0, 110.0)));

        let gid = store.create_group("g").unwrap();
        let frame = store.group(&gid).unwrap().frame();
        let c = store.item(&EntityId::from("c")).unwrap();
        assert_close(c.left, 100.0);
        assert_close(c.top, 100.0);
        assert!(c.left + c.width <= frame.width() && c.top + c.height <= frame.height());

        // Deselecting shrinks the box again.
        store.clean_all();
        assert!(store.internal_draggable().data().is_none());
    }

    #[test]
    fn test_create_group_preconditions() {
        let mut store = SceneStore::new();
        store
            .add_items([ItemSpec::default().with_id("a"), ItemSpec::default().with_id("b")])
            .unwrap();
        assert!(matches!(store.create_group("g"), Err(StoreError::NotEnoughSelected(0))));

        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();
        assert!(matches!(store.create_group("a"), Err(StoreError::DuplicateId(_))));

        store.create_group("g").unwrap();
        store.add_items([ItemSpec::default().with_id("c")]).unwrap();
        store.select_item(EntityRef::item("c")).unwrap();
        assert!(matches!(store.create_group("h"), Err(StoreError::CannotNestGroups(_))));
    }

    #[test]
    fn test_create_group_with_custom_overlay() {
        let mut store = SceneStore::new().with_overlays(
            BoundsOverlay::new(),
            FixedOverlay(Rect::new(-5.0, -5.0, 35.0, 15.0)),
        );
        store
            .add_items([
                ItemSpec::new(0.0, 0.0, 10.0, 10.0).with_id("a"),
                ItemSpec::new(20.0, 0.0, 10.0, 10.0).with_id("b"),
            ])
            .unwrap();
        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();
        store.create_group("g").unwrap();

        let a = store.item(&EntityId::from("a")).unwrap();
        assert_close(a.left, 5.0);
        assert_close(a.top, 5.0);
    }

    #[test]
    fn test_create_group_needs_overlay_box() {
        let mut store = SceneStore::new().with_overlays(BoundsOverlay::new(), NoBox);
        store
            .add_items([ItemSpec::default().with_id("a"), ItemSpec::default().with_id("b")])
            .unwrap();
        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();

        assert!(matches!(store.create_group("g"), Err(StoreError::OverlayUnavailable)));
        assert!(store.groups().is_empty());
    }

    struct NoBox;

    impl Overlay for NoBox {
        fn data(&self) -> Option<Rect> {
            None
        }

        fn update_position(&mut self, _selection_bounds: &[Rect]) {}
    }

    struct FixedOverlay(Rect);

    impl Overlay for FixedOverlay {
        fn data(&self) -> Option<Rect> {
            Some(self.0)
        }

        fn update_position(&mut self, _selection_bounds: &[Rect]) {}
    }

    #[test]
    fn test_destroy_group_scenario() {
        let (mut store, a, b) = two_selected();
        store.create_group("g1").unwrap();

        let destroyed = store.destroy_group();
        assert_eq!(destroyed, vec![EntityId::from("g1")]);

        let item_a = store.item(&a).unwrap();
        let item_b = store.item(&b).unwrap();
        assert_close(item_a.left, 0.0);
        assert_close(item_a.top, 0.0);
        assert_close(item_b.left, 20.0);
        assert_close(item_b.top, 0.0);
        assert_close(item_a.rotate, 0.0);
        assert!(item_a.id_group().is_none());
        assert!(item_b.id_group().is_none());
        assert!(store.groups().is_empty());
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_group_roundtrip_restores_geometry() {
        let mut store = SceneStore::new();
        store
            .add_items([
                ItemSpec::new(37.5, 12.25, 10.0, 20.0).with_id("a").with_rotate(15.0),
                ItemSpec::new(80.0, 44.0, 30.0, 5.0).with_id("b").with_rotate(-40.0),
                ItemSpec::new(55.0, 90.0, 8.0, 8.0).with_id("c"),
            ])
            .unwrap();
        let before: Vec<Item> = store.items().cloned().collect();

        for id in ["a", "b", "c"] {
            store.select_item(EntityRef::item(id)).unwrap();
        }
        store.create_group("g").unwrap();
        store.destroy_group();

        for original in &before {
            let item = store.item(original.id()).unwrap();
            assert_close(item.left, original.left);
            assert_close(item.top, original.top);
            assert_close(item.rotate, original.rotate);
            assert!(item.id_group().is_none());
        }
    }

    #[test]
    fn test_destroy_rotated_group() {
        let mut store = SceneStore::new().with_overlays(
            BoundsOverlay::new(),
            FixedOverlay(Rect::new(10.0, 10.0, 30.0, 30.0)),
        );
        store
            .add_items([
                ItemSpec::new(10.0, 10.0, 10.0, 10.0).with_id("a"),
                ItemSpec::new(20.0, 20.0, 10.0, 10.0).with_id("b").with_rotate(5.0),
            ])
            .unwrap();
        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();
        store.create_group("g").unwrap();
        store.set_rotation(&EntityRef::group("g"), 90.0).unwrap();

        store.destroy_group();

        // Group center (20, 20); a's center (15, 15) turns clockwise to (25, 15).
        let a = store.item(&EntityId::from("a")).unwrap();
        assert_close(a.left, 20.0);
        assert_close(a.top, 10.0);
        assert_close(a.rotate, 90.0);

        // b's center (25, 25) turns to (15, 25).
        let b = store.item(&EntityId::from("b")).unwrap();
        assert_close(b.left, 10.0);
        assert_close(b.top, 20.0);
        assert_close(b.rotate, 95.0);
    }

    #[test]
    fn test_destroy_all_groups_by_default() {
        let mut store = SceneStore::new();
        let specs = ["a", "b", "c", "d"].map(|id| ItemSpec::new(0.0, 0.0, 10.0, 10.0).with_id(id));
        store.add_items(specs).unwrap();
        for (pair, gid) in [(["a", "b"], "g1"), (["c", "d"], "g2")] {
            store.clean_all();
            for id in pair {
                store.select_item(EntityRef::item(id)).unwrap();
            }
                store.create_group(gid).unwrap();
        }

        store.clean_all();
        store.select_item(EntityRef::group("g1")).unwrap();
        let destroyed = store.destroy_group();
        assert_eq!(destroyed.len(), 2);
        assert!(store.groups().is_empty());
    }

    #[test]
    fn test_destroy_selected_groups_only() {
        let config =
            StoreConfig { ungroup_scope: UngroupScope::Selected, ..StoreConfig::default() };
        let mut store = SceneStore::with_config(config).unwrap();
        let specs = ["a", "b", "c", "d"].map(|id| ItemSpec::new(0.0, 0.0, 10.0, 10.0).with_id(id));
        store.add_items(specs).unwrap();
        for (pair, gid) in [(["a", "b"], "g1"), (["c", "d"], "g2")] {
            store.clean_all();
            for id in pair {
                store.select_item(EntityRef::item(id)).unwrap();
            }
                store.create_group(gid).unwrap();
        }

        store.clean_all();
        store.select_item(EntityRef::group("g1")).unwrap();
        let destroyed = store.destroy_group();

        assert_eq!(destroyed, vec![EntityId::from("g1")]);
        assert_eq!(store.groups().len(), 1);
        assert!(store.item(&EntityId::from("a")).unwrap().id_group().is_none());
        let c = store.item(&EntityId::from("c")).unwrap();
        assert_eq!(c.id_group(), Some(&EntityId::from("g2")));
    }

    #[test]
    fn test_deferred_selector_refresh() {
        let (mut store, _, _) = two_selected();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        store.create_group("g1").unwrap();
        assert_eq!(store.pending_task_count(), 1);
        assert_eq!(store.run_pending_tasks(Instant::now()), 0);

        let later = Instant::now() + Duration::from_millis(250);
        assert_eq!(store.run_pending_tasks(later), 1);
        assert_eq!(store.pending_task_count(), 0);
        assert!(events
            .borrow()
            .contains(&StoreEvent::OverlayUpdated { kind: OverlayKind::Selector }));
        assert_eq!(store.selector().data(), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));
    }

    #[test]
    fn test_scheduled_overlay_refresh_can_be_cancelled() {
        let (mut store, _, _) = two_selected();
        let later = Instant::now() + Duration::from_secs(1);

        let handle = store.schedule_overlay_refresh();
        assert!(store.cancel_task(handle));
        assert_eq!(store.run_pending_tasks(later), 0);

        store.schedule_overlay_refresh();
        store.clean_all();
        assert_eq!(store.run_pending_tasks(later), 1);
        assert!(store.selector().data().is_none());
        assert!(store.internal_draggable().data().is_none());
    }

    #[test]
    fn test_dispose_cancels_deferred_work() {
        let (mut store, _, _) = two_selected();
        store.create_group("g1").unwrap();

        store.dispose();
        assert_eq!(store.pending_task_count(), 0);
        assert_eq!(store.run_pending_tasks(Instant::now() + Duration::from_secs(5)), 0);
    }

    #[test]
    fn test_events_for_grouping() {
        let (mut store, _, _) = two_selected();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let sub = store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        store.create_group("g1").unwrap();
        assert!(events.borrow().contains(&StoreEvent::GroupCreated { id: EntityId::from("g1") }));

        store.destroy_group();
        assert!(events
            .borrow()
            .contains(&StoreEvent::GroupsDestroyed { ids: vec![EntityId::from("g1")] }));

        assert!(store.unsubscribe(sub));
        let seen = events.borrow().len();
        store.clean_all();
        store.set_rotating(true);
        assert_eq!(events.borrow().len(), seen);
    }

    #[test]
    fn test_gesture_flags_are_independent() {
        let mut store = SceneStore::new();
        store.start_drag(None).unwrap();
        store.set_rotating(true);
        store.set_resizing(true);
        assert!(store.is_dragging() && store.is_rotating() && store.is_resizing());

        store.set_rotating(false);
        assert!(store.is_dragging());
        assert!(!store.is_rotating());
    }

    #[test]
    fn test_with_config_rejects_unusable_delta() {
        for delta in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let config = StoreConfig { default_delta: delta, ..StoreConfig::default() };
            assert!(matches!(SceneStore::with_config(config), Err(StoreError::InvalidDelta(_))));
        }

        let config = StoreConfig { default_delta: 4.0, ..StoreConfig::default() };
        let mut store = SceneStore::with_config(config).unwrap();
        store.set_delta(2.0).unwrap();
        store.reset();
        assert_close(store.delta(), 4.0);
    }

    #[test]
    fn test_delta_and_nudge() {
        let (mut store, a, b) = two_selected();
        assert_close(store.delta(), 1.0);
        assert!(matches!(store.set_delta(0.0), Err(StoreError::InvalidDelta(_))));
        assert!(matches!(store.set_delta(f64::NAN), Err(StoreError::InvalidDelta(_))));

        store.set_delta(5.0).unwrap();
        store.nudge_selection(1.0, -2.0);
        assert_close(store.item(&a).unwrap().left, 5.0);
        assert_close(store.item(&a).unwrap().top, -10.0);
        assert_close(store.item(&b).unwrap().left, 25.0);
    }

    #[test]
    fn test_set_size_and_rotation() {
        let (mut store, a, _) = two_selected();
        store.set_size(&EntityRef::Item(a.clone()), 40.0, 12.0).unwrap();
        store.set_rotation(&EntityRef::Item(a.clone()), 30.0).unwrap();

        let item = store.item(&a).unwrap();
        assert_close(item.width, 40.0);
        assert_close(item.height, 12.0);
        assert_close(item.rotate, 30.0);

        assert!(matches!(
            store.set_size(&EntityRef::group("nope"), 1.0, 1.0),
            Err(StoreError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_grouped_item_bounds_are_offset() {
        let mut store = SceneStore::new().with_overlays(
            BoundsOverlay::new(),
            FixedOverlay(Rect::new(100.0, 100.0, 130.0, 110.0)),
        );
        store
            .add_items([
                ItemSpec::new(100.0, 100.0, 10.0, 10.0).with_id("a"),
                ItemSpec::new(120.0, 100.0, 10.0, 10.0).with_id("b"),
            ])
            .unwrap();
        store.select_item(EntityRef::item("a")).unwrap();
        store.select_item(EntityRef::item("b")).unwrap();
        store.create_group("g").unwrap();

        let bounds = store.entity_bounds(&EntityRef::item("b")).unwrap();
        assert_eq!(bounds, Rect::new(120.0, 100.0, 130.0, 110.0));
    }

    #[test]
    fn test_reset() {
        let (mut store, _, _) = two_selected();
        store.create_group("g1").unwrap();
        store.set_delta(3.0).unwrap();
        store.start_drag(None).unwrap();

        store.reset();
        assert_eq!(store.item_count(), 0);
        assert!(store.groups().is_empty());
        assert!(store.selection().is_empty());
        assert!(!store.is_dragging());
        assert_close(store.delta(), 1.0);
        assert_eq!(store.pending_task_count(), 0);
        assert!(store.internal_draggable().data().is_none());
    }
}
