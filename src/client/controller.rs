//! Map controller: the gesture boundary of the interaction core.
//!
//! Gestures become state machine events, mutations go through the
//! [`RestaurantApi`], and every successful mutation is followed by a full
//! refetch that the [`MarkerRegistry`] reconciles against the map. No
//! `RefCell` borrow is held across an `.await`; async completions re-read
//! the current mode before acting on it, and a refetch only lands while it
//! is the latest one for the same signed-in user.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use super::api::{ClientError, RestaurantApi, Result};
use super::geo::LngLat;
use super::markers::{MarkerRegistry, ReconcileReport};
use super::state::{Event, InteractionStore, Mode, SubscriptionId};
use super::surface::{ClickCallback, MapSurface, MarkerId};
use crate::auth::models::CurrentUser;
use crate::restaurants::{CreateRestaurant, Restaurant, RestaurantPatch};

struct Inner {
    api: Rc<dyn RestaurantApi>,
    surface: Rc<dyn MapSurface>,
    store: RefCell<InteractionStore>,
    registry: RefCell<MarkerRegistry>,
    restaurants: RefCell<Vec<Restaurant>>,
    user: RefCell<Option<CurrentUser>>,
    last_error: RefCell<Option<ClientError>>,
    refresh_generation: Cell<u64>,
}

#[derive(Clone)]
pub struct MapController {
    inner: Rc<Inner>,
}

impl MapController {
    pub fn new(api: Rc<dyn RestaurantApi>, surface: Rc<dyn MapSurface>) -> Self {
        let store = InteractionStore::new(Rc::clone(&surface));
        Self {
            inner: Rc::new(Inner {
                api,
                surface,
                store: RefCell::new(store),
                registry: RefCell::new(MarkerRegistry::new()),
                restaurants: RefCell::new(Vec::new()),
                user: RefCell::new(None),
                last_error: RefCell::new(None),
                refresh_generation: Cell::new(0),
            }),
        }
    }

    /// Resolves the session and, when signed in, loads the restaurants
    pub async fn start(&self) -> Result<()> {
        let user = self.track(self.inner.api.current_user().await)?;
        match user {
            Some(user) => {
                info!(user_id = %user.user_id, "Signed in");
                *self.inner.user.borrow_mut() = Some(user);
                self.refresh().await?;
            }
            None => {
                debug!("Anonymous visitor");
                self.sign_out_locally();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub fn is_authenticated(&self) -> bool {
        self.inner.user.borrow().is_some()
    }

    pub fn user(&self) -> Option<CurrentUser> {
        self.inner.user.borrow().clone()
    }

    pub fn mode(&self) -> Mode {
        self.inner.store.borrow().mode()
    }

    pub fn restaurants(&self) -> Vec<Restaurant> {
        self.inner.restaurants.borrow().clone()
    }

    pub fn marker_for(&self, id: &str) -> Option<MarkerId> {
        self.inner.registry.borrow().marker_for(id)
    }

    pub fn marker_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.inner.last_error.borrow().clone()
    }

    pub fn subscribe(&self, subscriber: impl Fn(&Mode) + 'static) -> SubscriptionId {
        self.inner.store.borrow_mut().subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.store.borrow_mut().unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    pub fn click_map(&self, at: LngLat) -> bool {
        self.gesture(Event::MapClick { at })
    }

    /// Selects a restaurant at the position its marker is rendered at
    pub fn click_marker(&self, id: &str) -> bool {
        let Some(at) = self.current_position(id) else {
            debug!(restaurant_id = %id, "Click on unknown marker ignored");
            return false;
        };
        self.gesture(Event::MarkerClick {
            id: id.to_string(),
            at,
        })
    }

    pub fn request_move(&self) -> bool {
        self.gesture(Event::RequestMove)
    }

    pub fn drag_marker(&self, id: &str, at: LngLat) -> bool {
        self.gesture(Event::MarkerDrag {
            id: id.to_string(),
            at,
        })
    }

    pub fn cancel_move(&self) -> bool {
        self.gesture(Event::CancelMove)
    }

    fn gesture(&self, event: Event) -> bool {
        if !self.is_authenticated() {
            debug!(?event, "Gesture ignored while signed out");
            return false;
        }
        self.dispatch(&event)
    }

    /// Subscribers run after the store borrow has ended, so they may read
    /// the controller.
    fn dispatch(&self, event: &Event) -> bool {
        let (next, subscribers) = {
            let mut store = self.inner.store.borrow_mut();
            match store.apply(event) {
                Some(next) => (next, store.subscribers()),
                None => return false,
            }
        };
        self.sync_draggable();
        for subscriber in subscribers {
            subscriber(&next);
        }
        true
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Stores the restaurant drafted in the add popup at the clicked
    /// coordinate. On failure the popup stays open.
    pub async fn submit_new_restaurant(&self, mut draft: CreateRestaurant) -> Result<Restaurant> {
        let Mode::ClickEmptyToAdd { at } = self.mode() else {
            return Err(self.record(ClientError::InvalidState(
                "no location picked for the new restaurant".to_string(),
            )));
        };
        draft.longitude = Some(at.lng);
        draft.latitude = Some(at.lat);

        let created = self.track(self.inner.api.create(&draft).await)?;
        info!(restaurant_id = %created.id, "Restaurant added");

        // the user may have moved on while the request was in flight
        if self.mode() == (Mode::ClickEmptyToAdd { at }) {
            self.dispatch(&Event::RestaurantCreated);
        }
        self.refresh().await?;
        Ok(created)
    }

    /// Saves the dragged position of the restaurant being moved
    pub async fn confirm_move(&self) -> Result<Restaurant> {
        let Mode::MovingRestaurant { id, drag, .. } = self.mode() else {
            return Err(self.record(ClientError::InvalidState(
                "no restaurant is being moved".to_string(),
            )));
        };

        let patch = RestaurantPatch::relocate(drag.lng, drag.lat);
        let updated = self.track(self.inner.api.update(&id, &patch).await)?;
        info!(restaurant_id = %id, lng = drag.lng, lat = drag.lat, "Restaurant moved");

        let at = LngLat::of(&updated).unwrap_or(drag);
        self.dispatch(&Event::MoveSaved { id, at });
        self.refresh().await?;
        Ok(updated)
    }

    /// Saves edits to the selected restaurant's details. The selection stays
    /// on it and follows its stored location.
    pub async fn update_selected(&self, patch: RestaurantPatch) -> Result<Restaurant> {
        let Mode::SelectRestaurant { id, .. } = self.mode() else {
            return Err(self.record(ClientError::InvalidState(
                "no restaurant selected".to_string(),
            )));
        };

        let updated = self.track(self.inner.api.update(&id, &patch).await)?;
        info!(restaurant_id = %id, "Restaurant updated");

        if let (Mode::SelectRestaurant { id: selected, at }, Some(stored)) =
            (self.mode(), LngLat::of(&updated))
        {
            if selected == id && stored != at {
                self.dispatch(&Event::MarkerClick { id, at: stored });
            }
        }
        self.refresh().await?;
        Ok(updated)
    }

    /// Deletes the selected (or moving) restaurant
    pub async fn delete_selected(&self) -> Result<()> {
        let id = match self.mode() {
            Mode::SelectRestaurant { id, .. } | Mode::MovingRestaurant { id, .. } => id,
            _ => {
                return Err(self.record(ClientError::InvalidState(
                    "no restaurant selected".to_string(),
                )))
            }
        };

        self.track(self.inner.api.delete(&id).await)?;
        info!(restaurant_id = %id, "Restaurant deleted");

        self.dispatch(&Event::DeleteConfirmed);
        self.refresh().await
    }

    /// Refetches the restaurant list and reconciles the markers
    pub async fn refresh(&self) -> Result<()> {
        let Some(owner) = self.user_id() else {
            return Ok(());
        };
        let generation = self.next_refresh_generation();

        let listed = self.inner.api.list().await;

        // another refetch was issued, or the user changed, while this one
        // was loading
        if !self.is_current_refresh(generation, &owner) {
            debug!(user_id = %owner, generation, "Superseded restaurant list dropped");
            return Ok(());
        }

        let restaurants = match listed {
            Ok(restaurants) => restaurants,
            Err(ClientError::Unauthenticated) => {
                warn!("Session no longer valid, signing out");
                self.sign_out_locally();
                return Err(self.record(ClientError::Unauthenticated));
            }
            Err(e) => return Err(self.record(e)),
        };

        self.reconcile(&restaurants);
        *self.inner.restaurants.borrow_mut() = restaurants;
        self.inner.last_error.borrow_mut().take();
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        let result = self.inner.api.logout().await;
        self.sign_out_locally();
        info!("Signed out");
        self.track(result)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn reconcile(&self, restaurants: &[Restaurant]) -> ReconcileReport {
        let weak = Rc::downgrade(&self.inner);
        let report = self.inner.registry.borrow_mut().reconcile(
            &*self.inner.surface,
            restaurants,
            |id| click_listener(weak.clone(), id.to_string()),
        );
        self.sync_draggable();
        report
    }

    fn user_id(&self) -> Option<String> {
        self.inner
            .user
            .borrow()
            .as_ref()
            .map(|user| user.user_id.clone())
    }

    fn next_refresh_generation(&self) -> u64 {
        let generation = self.inner.refresh_generation.get() + 1;
        self.inner.refresh_generation.set(generation);
        generation
    }

    fn is_current_refresh(&self, generation: u64, owner: &str) -> bool {
        self.inner.refresh_generation.get() == generation
            && self.user_id().as_deref() == Some(owner)
    }

    fn sign_out_locally(&self) {
        self.inner.user.borrow_mut().take();
        self.next_refresh_generation();
        self.dispatch(&Event::LoggedOut);
        self.inner
            .registry
            .borrow_mut()
            .clear(&*self.inner.surface);
        self.inner.restaurants.borrow_mut().clear();
    }

    /// Only the restaurant being moved can be dragged
    fn sync_draggable(&self) {
        let moving = match self.mode() {
            Mode::MovingRestaurant { id, .. } => Some(id),
            _ => None,
        };
        let registry = self.inner.registry.borrow();
        for (id, marker) in registry.markers() {
            let draggable = moving.as_deref() == Some(id);
            self.inner.surface.set_marker_draggable(marker, draggable);
        }
    }

    fn current_position(&self, id: &str) -> Option<LngLat> {
        let rendered = self
            .inner
            .registry
            .borrow()
            .marker_for(id)
            .and_then(|marker| self.inner.surface.marker_position(marker));

        rendered.or_else(|| {
            self.inner
                .restaurants
                .borrow()
                .iter()
                .find(|r| r.id == id)
                .and_then(LngLat::of)
        })
    }

    fn record(&self, error: ClientError) -> ClientError {
        warn!(error = %error, "Map action failed");
        *self.inner.last_error.borrow_mut() = Some(error.clone());
        error
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.record(e))
    }
}

fn click_listener(controller: Weak<Inner>, id: String) -> ClickCallback {
    Box::new(move || {
        if let Some(inner) = controller.upgrade() {
            MapController { inner }.click_marker(&id);
        }
    })
}
