//! Map surface abstraction.
//!
//! The rendering layer (Leaflet, MapLibre, a test double) sits behind
//! [`MapSurface`]. Everything the interaction core creates on the map is
//! addressed by an opaque id so that ownership stays on this side.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::geo::LngLat;

pub type MarkerId = u64;
pub type ListenerId = u64;
pub type PopupId = u64;

pub type ClickCallback = Box<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    /// "Add a restaurant here" form
    Add,
    /// "Save / cancel" bar shown while dragging a marker
    Move,
}

pub trait MapSurface {
    fn add_marker(&self, at: LngLat) -> MarkerId;
    fn remove_marker(&self, marker: MarkerId);
    fn set_marker_position(&self, marker: MarkerId, at: LngLat);
    /// Where the marker is currently rendered
    fn marker_position(&self, marker: MarkerId) -> Option<LngLat>;
    fn set_marker_draggable(&self, marker: MarkerId, draggable: bool);

    fn on_marker_click(&self, marker: MarkerId, callback: ClickCallback) -> ListenerId;
    fn remove_listener(&self, listener: ListenerId);

    fn open_popup(&self, kind: PopupKind, at: LngLat) -> PopupId;
    fn move_popup(&self, popup: PopupId, at: LngLat);
    fn close_popup(&self, popup: PopupId);
}

/// A popup attached to the map for as long as the handle lives
pub struct PopupHandle {
    id: PopupId,
    kind: PopupKind,
    surface: Rc<dyn MapSurface>,
}

impl PopupHandle {
    pub fn open(surface: &Rc<dyn MapSurface>, kind: PopupKind, at: LngLat) -> Self {
        let id = surface.open_popup(kind, at);
        Self {
            id,
            kind,
            surface: Rc::clone(surface),
        }
    }

    pub fn id(&self) -> PopupId {
        self.id
    }

    pub fn kind(&self) -> PopupKind {
        self.kind
    }

    pub fn move_to(&self, at: LngLat) {
        self.surface.move_popup(self.id, at);
    }
}

impl Drop for PopupHandle {
    fn drop(&mut self) {
        self.surface.close_popup(self.id);
    }
}

impl fmt::Debug for PopupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

// ============================================================================
// Headless surface
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessMarker {
    pub at: LngLat,
    pub draggable: bool,
}

#[derive(Default)]
struct HeadlessInner {
    next_id: u64,
    markers: HashMap<MarkerId, HeadlessMarker>,
    listeners: HashMap<ListenerId, (MarkerId, Rc<dyn Fn()>)>,
    popups: HashMap<PopupId, (PopupKind, LngLat)>,
    popups_opened: usize,
    popups_closed: usize,
    stray_closes: usize,
    marker_moves: usize,
}

impl HeadlessInner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory surface with no rendering. Records everything it is asked to
/// do so the interaction core can be driven and inspected without a map.
#[derive(Default)]
pub struct HeadlessSurface {
    inner: RefCell<HeadlessInner>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, marker: MarkerId) -> Option<HeadlessMarker> {
        self.inner.borrow().markers.get(&marker).copied()
    }

    pub fn marker_count(&self) -> usize {
        self.inner.borrow().markers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn has_listener(&self, listener: ListenerId) -> bool {
        self.inner.borrow().listeners.contains_key(&listener)
    }

    pub fn open_popups(&self) -> Vec<(PopupKind, LngLat)> {
        self.inner.borrow().popups.values().copied().collect()
    }

    pub fn popups_opened(&self) -> usize {
        self.inner.borrow().popups_opened
    }

    pub fn popups_closed(&self) -> usize {
        self.inner.borrow().popups_closed
    }

    /// Close requests for popups that were not open
    pub fn stray_closes(&self) -> usize {
        self.inner.borrow().stray_closes
    }

    /// Position updates issued for existing markers
    pub fn marker_moves(&self) -> usize {
        self.inner.borrow().marker_moves
    }

    /// Simulates a user click on a marker. Returns `false` when nothing
    /// listens to it.
    pub fn click_marker(&self, marker: MarkerId) -> bool {
        let callbacks: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .listeners
            .values()
            .filter(|(target, _)| *target == marker)
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        // no borrow is held while the callbacks run; they may call back in
        for callback in &callbacks {
            callback();
        }
        !callbacks.is_empty()
    }

    /// Simulates the user dragging a marker. Markers that are not draggable
    /// stay where they are.
    pub fn drag_marker(&self, marker: MarkerId, to: LngLat) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.markers.get_mut(&marker) {
            Some(rendered) if rendered.draggable => {
                rendered.at = to;
                true
            }
            _ => false,
        }
    }
}

impl MapSurface for HeadlessSurface {
    fn add_marker(&self, at: LngLat) -> MarkerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id();
        inner.markers.insert(
            id,
            HeadlessMarker {
                at,
                draggable: false,
            },
        );
        id
    }

    fn remove_marker(&self, marker: MarkerId) {
        self.inner.borrow_mut().markers.remove(&marker);
    }

    fn set_marker_position(&self, marker: MarkerId, at: LngLat) {
        let mut inner = self.inner.borrow_mut();
        if let Some(rendered) = inner.markers.get_mut(&marker) {
            rendered.at = at;
            inner.marker_moves += 1;
        }
    }

    fn marker_position(&self, marker: MarkerId) -> Option<LngLat> {
        self.inner.borrow().markers.get(&marker).map(|m| m.at)
    }

    fn set_marker_draggable(&self, marker: MarkerId, draggable: bool) {
        if let Some(rendered) = self.inner.borrow_mut().markers.get_mut(&marker) {
            rendered.draggable = draggable;
        }
    }

    fn on_marker_click(&self, marker: MarkerId, callback: ClickCallback) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id();
        inner.listeners.insert(id, (marker, Rc::from(callback)));
        id
    }

    fn remove_listener(&self, listener: ListenerId) {
        self.inner.borrow_mut().listeners.remove(&listener);
    }

    fn open_popup(&self, kind: PopupKind, at: LngLat) -> PopupId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id();
        inner.popups.insert(id, (kind, at));
        inner.popups_opened += 1;
        id
    }

    fn move_popup(&self, popup: PopupId, at: LngLat) {
        if let Some(entry) = self.inner.borrow_mut().popups.get_mut(&popup) {
            entry.1 = at;
        }
    }

    fn close_popup(&self, popup: PopupId) {
        let mut inner = self.inner.borrow_mut();
        if inner.popups.remove(&popup).is_some() {
            inner.popups_closed += 1;
        } else {
            inner.stray_closes += 1;
        }
    }
}
