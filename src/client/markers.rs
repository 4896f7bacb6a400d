//! Marker registry: keeps one map marker per located restaurant in step
//! with the latest restaurant list.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::geo::LngLat;
use super::surface::{ClickCallback, ListenerId, MapSurface, MarkerId};
use crate::restaurants::Restaurant;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MarkerEntry {
    marker: MarkerId,
    listener: ListenerId,
}

/// What a reconciliation pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub moved: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: HashMap<String, MarkerEntry>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the surface in line with `restaurants`.
    ///
    /// Entries missing from the list are torn down, markers that are
    /// rendered somewhere other than their stored location are moved back,
    /// and new restaurants get a marker with the click listener produced by
    /// `listener_for`. Restaurants without a location have no marker.
    pub fn reconcile<F>(
        &mut self,
        surface: &dyn MapSurface,
        restaurants: &[Restaurant],
        mut listener_for: F,
    ) -> ReconcileReport
    where
        F: FnMut(&str) -> ClickCallback,
    {
        let mut report = ReconcileReport::default();

        let located: Vec<(&Restaurant, LngLat)> = restaurants
            .iter()
            .filter_map(|r| LngLat::of(r).map(|at| (r, at)))
            .collect();
        let present: HashSet<&str> = located.iter().map(|(r, _)| r.id.as_str()).collect();

        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = self.entries.remove(&id) {
                tear_down(surface, entry);
                report.removed += 1;
            }
        }

        for (restaurant, at) in located {
            match self.entries.get(&restaurant.id) {
                Some(entry) => {
                    if surface.marker_position(entry.marker) != Some(at) {
                        surface.set_marker_position(entry.marker, at);
                        report.moved += 1;
                    }
                }
                None => {
                    let marker = surface.add_marker(at);
                    let listener = surface.on_marker_click(marker, listener_for(&restaurant.id));
                    self.entries
                        .insert(restaurant.id.clone(), MarkerEntry { marker, listener });
                    report.added += 1;
                }
            }
        }

        debug!(
            added = report.added,
            moved = report.moved,
            removed = report.removed,
            markers = self.entries.len(),
            "Reconciled markers"
        );
        report
    }

    /// Removes every marker, whatever the data says
    pub fn clear(&mut self, surface: &dyn MapSurface) {
        for (_, entry) in self.entries.drain() {
            tear_down(surface, entry);
        }
    }

    pub fn marker_for(&self, id: &str) -> Option<MarkerId> {
        self.entries.get(id).map(|entry| entry.marker)
    }

    pub fn listener_for(&self, id: &str) -> Option<ListenerId> {
        self.entries.get(id).map(|entry| entry.listener)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&str, MarkerId)> {
        self.entries
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.marker))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tear_down(surface: &dyn MapSurface, entry: MarkerEntry) {
    surface.remove_listener(entry.listener);
    surface.remove_marker(entry.marker);
}
