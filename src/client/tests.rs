//! Tests for client module
//!
//! These tests verify:
//! - the transition table and popup ownership of the interaction store
//! - marker reconciliation
//! - the controller's sign-in guard and mutation handling

#[cfg(test)]
mod tests {
    use super::super::api::Result;
    use super::super::*;
    use crate::auth::models::CurrentUser;
    use crate::restaurants::{CreateRestaurant, Restaurant, RestaurantPatch};
    use async_trait::async_trait;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tokio::sync::oneshot;

    fn restaurant(id: &str, lng: f64, lat: f64) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            user_id: "alice".to_string(),
            name: format!("Restaurant {}", id),
            address: None,
            latitude: Some(lat),
            longitude: Some(lng),
            rating: None,
            price_range: None,
            descriptors: Vec::new(),
            menu_items: Vec::new(),
            notes: None,
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn surface() -> (Rc<HeadlessSurface>, Rc<dyn MapSurface>) {
        let headless = Rc::new(HeadlessSurface::new());
        let shared: Rc<dyn MapSurface> = headless.clone();
        (headless, shared)
    }

    fn noop_listener(_: &str) -> Box<dyn Fn()> {
        Box::new(|| {})
    }

    // ------------------------------------------------------------------
    // Transition table
    // ------------------------------------------------------------------

    const HERE: LngLat = LngLat::new(-78.83, 43.90);
    const THERE: LngLat = LngLat::new(1.0, 1.0);

    fn select(id: &str, at: LngLat) -> Mode {
        Mode::SelectRestaurant {
            id: id.to_string(),
            at,
        }
    }

    #[test]
    fn test_idle_transitions() {
        assert_eq!(
            next_mode(&Mode::Idle, &Event::MapClick { at: HERE }),
            Some(Mode::ClickEmptyToAdd { at: HERE })
        );
        assert_eq!(
            next_mode(
                &Mode::Idle,
                &Event::MarkerClick {
                    id: "r1".to_string(),
                    at: HERE
                }
            ),
            Some(select("r1", HERE))
        );
    }

    #[test]
    fn test_moving_is_unreachable_from_idle() {
        assert_eq!(next_mode(&Mode::Idle, &Event::RequestMove), None);
        assert_eq!(
            next_mode(
                &Mode::Idle,
                &Event::MarkerDrag {
                    id: "r1".to_string(),
                    at: HERE
                }
            ),
            None
        );
        assert_eq!(
            next_mode(&Mode::ClickEmptyToAdd { at: HERE }, &Event::RequestMove),
            None
        );
    }

    #[test]
    fn test_move_lifecycle() {
        let moving = next_mode(&select("r1", HERE), &Event::RequestMove).unwrap();
        assert_eq!(
            moving,
            Mode::MovingRestaurant {
                id: "r1".to_string(),
                start: HERE,
                drag: HERE
            }
        );

        let dragged = next_mode(
            &moving,
            &Event::MarkerDrag {
                id: "r1".to_string(),
                at: THERE,
            },
        )
        .unwrap();
        assert_eq!(
            dragged,
            Mode::MovingRestaurant {
                id: "r1".to_string(),
                start: HERE,
                drag: THERE
            }
        );

        // another marker's drag does not count
        assert_eq!(
            next_mode(
                &dragged,
                &Event::MarkerDrag {
                    id: "r2".to_string(),
                    at: HERE
                }
            ),
            None
        );

        assert_eq!(next_mode(&dragged, &Event::CancelMove), Some(select("r1", HERE)));
        assert_eq!(
            next_mode(&dragged, &Event::MapClick { at: HERE }),
            Some(Mode::Idle)
        );
        assert_eq!(
            next_mode(
                &dragged,
                &Event::MoveSaved {
                    id: "r1".to_string(),
                    at: THERE
                }
            ),
            Some(select("r1", THERE))
        );
        assert_eq!(
            next_mode(
                &dragged,
                &Event::MoveSaved {
                    id: "r2".to_string(),
                    at: THERE
                }
            ),
            None
        );
    }

    #[test]
    fn test_delete_and_logout_always_return_to_idle() {
        let modes = [
            Mode::Idle,
            Mode::ClickEmptyToAdd { at: HERE },
            select("r1", HERE),
            Mode::MovingRestaurant {
                id: "r1".to_string(),
                start: HERE,
                drag: THERE,
            },
        ];
        for mode in &modes {
            assert_eq!(next_mode(mode, &Event::DeleteConfirmed), Some(Mode::Idle));
            assert_eq!(next_mode(mode, &Event::LoggedOut), Some(Mode::Idle));
        }
    }

    #[test]
    fn test_created_only_closes_the_add_state() {
        assert_eq!(
            next_mode(&Mode::ClickEmptyToAdd { at: HERE }, &Event::RestaurantCreated),
            Some(Mode::Idle)
        );
        assert_eq!(next_mode(&select("r1", HERE), &Event::RestaurantCreated), None);
    }

    // ------------------------------------------------------------------
    // Store and popups
    // ------------------------------------------------------------------

    #[test]
    fn test_toggling_add_releases_popup_exactly_once() {
        let (headless, shared) = surface();
        let mut store = InteractionStore::new(shared);

        assert!(store.dispatch(&Event::MapClick { at: HERE }));
        assert_eq!(headless.open_popups(), vec![(PopupKind::Add, HERE)]);

        assert!(store.dispatch(&Event::MapClick { at: HERE }));
        assert_eq!(store.mode(), Mode::Idle);
        assert!(headless.open_popups().is_empty());
        assert_eq!(headless.popups_opened(), 1);
        assert_eq!(headless.popups_closed(), 1);
        assert_eq!(headless.stray_closes(), 0);

        drop(store);
        assert_eq!(headless.popups_closed(), 1);
        assert_eq!(headless.stray_closes(), 0);
    }

    #[test]
    fn test_at_most_one_popup_is_attached() {
        let (headless, shared) = surface();
        let mut store = InteractionStore::new(shared);

        store.dispatch(&Event::MapClick { at: HERE });
        store.dispatch(&Event::MarkerClick {
            id: "r1".to_string(),
            at: HERE,
        });
        assert!(headless.open_popups().is_empty());

        store.dispatch(&Event::RequestMove);
        assert_eq!(headless.open_popups(), vec![(PopupKind::Move, HERE)]);

        store.dispatch(&Event::MarkerClick {
            id: "r2".to_string(),
            at: THERE,
        });
        store.dispatch(&Event::RequestMove);
        assert_eq!(headless.open_popups(), vec![(PopupKind::Move, THERE)]);
        assert_eq!(headless.stray_closes(), 0);
    }

    #[test]
    fn test_drag_moves_the_existing_popup() {
        let (headless, shared) = surface();
        let mut store = InteractionStore::new(shared);

        store.dispatch(&Event::MarkerClick {
            id: "r1".to_string(),
            at: HERE,
        });
        store.dispatch(&Event::RequestMove);
        let popup = store.state().popup().map(|p| p.id());

        store.dispatch(&Event::MarkerDrag {
            id: "r1".to_string(),
            at: THERE,
        });
        assert_eq!(store.state().popup().map(|p| p.id()), popup);
        assert_eq!(headless.open_popups(), vec![(PopupKind::Move, THERE)]);
        assert_eq!(headless.popups_opened(), 1);
    }

    #[test]
    fn test_subscribers_see_every_transition() {
        let (_headless, shared) = surface();
        let mut store = InteractionStore::new(shared);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let id = store.subscribe(move |mode| sink.borrow_mut().push(mode.clone()));

        store.dispatch(&Event::MapClick { at: HERE });
        store.dispatch(&Event::RequestMove); // ignored
        store.dispatch(&Event::MapClick { at: HERE });
        assert_eq!(
            *seen.borrow(),
            vec![Mode::ClickEmptyToAdd { at: HERE }, Mode::Idle]
        );

        assert!(store.unsubscribe(id));
        store.dispatch(&Event::MapClick { at: HERE });
        assert_eq!(seen.borrow().len(), 2);
    }

    // ------------------------------------------------------------------
    // Marker reconciliation
    // ------------------------------------------------------------------

    #[test]
    fn test_reconcile_replaces_missing_and_adds_new() {
        let (headless, _) = surface();
        let mut registry = MarkerRegistry::new();

        registry.reconcile(
            &*headless,
            &[restaurant("A", 0.0, 0.0), restaurant("B", 1.0, 1.0)],
            noop_listener,
        );
        let listener_a = registry.listener_for("A").unwrap();
        let marker_b = registry.marker_for("B").unwrap();

        let report = registry.reconcile(
            &*headless,
            &[restaurant("B", 2.0, 2.0), restaurant("C", 3.0, 3.0)],
            noop_listener,
        );

        let mut ids: Vec<&str> = registry.ids().collect();
        ids.sort();
        assert_eq!(ids, vec!["B", "C"]);
        assert_eq!(
            report,
            ReconcileReport {
                added: 1,
                moved: 1,
                removed: 1
            }
        );
        assert!(!headless.has_listener(listener_a));
        assert_eq!(registry.marker_for("B"), Some(marker_b));
        assert_eq!(headless.marker(marker_b).unwrap().at, LngLat::new(2.0, 2.0));
        assert_eq!(headless.marker_count(), 2);
        assert_eq!(headless.listener_count(), 2);
    }

    #[test]
    fn test_reconcile_skips_unchanged_markers() {
        let (headless, _) = surface();
        let mut registry = MarkerRegistry::new();
        let list = [restaurant("A", 0.0, 0.0)];

        registry.reconcile(&*headless, &list, noop_listener);
        let report = registry.reconcile(&*headless, &list, noop_listener);

        assert_eq!(report, ReconcileReport::default());
        assert_eq!(headless.marker_moves(), 0);
    }

    #[test]
    fn test_reconcile_resets_a_discarded_drag() {
        let (headless, _) = surface();
        let mut registry = MarkerRegistry::new();
        let list = [restaurant("A", 0.0, 0.0)];

        registry.reconcile(&*headless, &list, noop_listener);
        let marker = registry.marker_for("A").unwrap();
        headless.set_marker_draggable(marker, true);
        headless.drag_marker(marker, THERE);

        let report = registry.reconcile(&*headless, &list, noop_listener);
        assert_eq!(report.moved, 1);
        assert_eq!(headless.marker(marker).unwrap().at, LngLat::new(0.0, 0.0));
    }

    #[test]
    fn test_unlocated_restaurants_have_no_marker() {
        let (headless, _) = surface();
        let mut registry = MarkerRegistry::new();
        let mut unlocated = restaurant("A", 0.0, 0.0);

        registry.reconcile(&*headless, &[unlocated.clone()], noop_listener);
        assert_eq!(registry.len(), 1);

        unlocated.latitude = None;
        unlocated.longitude = None;
        registry.reconcile(&*headless, &[unlocated], noop_listener);
        assert!(registry.is_empty());
        assert_eq!(headless.marker_count(), 0);
    }

    #[test]
    fn test_clear_tears_everything_down() {
        let (headless, _) = surface();
        let mut registry = MarkerRegistry::new();

        registry.reconcile(
            &*headless,
            &[restaurant("A", 0.0, 0.0), restaurant("B", 1.0, 1.0)],
            noop_listener,
        );
        registry.clear(&*headless);

        assert!(registry.is_empty());
        assert_eq!(headless.marker_count(), 0);
        assert_eq!(headless.listener_count(), 0);
    }

    // ------------------------------------------------------------------
    // Controller
    // ------------------------------------------------------------------

    /// In-memory API double
    #[derive(Default)]
    struct FakeApi {
        user: RefCell<Option<CurrentUser>>,
        restaurants: RefCell<Vec<Restaurant>>,
        fail_writes: Cell<bool>,
        next_id: Cell<u32>,
        updates: RefCell<Vec<(String, RestaurantPatch)>>,
        held_lists: RefCell<VecDeque<oneshot::Receiver<Vec<Restaurant>>>>,
    }

    impl FakeApi {
        fn signed_in() -> Self {
            let api = Self::default();
            *api.user.borrow_mut() = Some(CurrentUser {
                user_id: "alice".to_string(),
                email: "alice@example.com".to_string(),
            });
            api
        }

        fn with_restaurant(self, restaurant: Restaurant) -> Self {
            self.restaurants.borrow_mut().push(restaurant);
            self
        }

        fn sign_in_as(&self, user_id: &str) {
            *self.user.borrow_mut() = Some(CurrentUser {
                user_id: user_id.to_string(),
                email: format!("{}@example.com", user_id),
            });
        }

        /// The next `list` call waits until the returned sender delivers
        fn hold_next_list(&self) -> oneshot::Sender<Vec<Restaurant>> {
            let (tx, rx) = oneshot::channel();
            self.held_lists.borrow_mut().push_back(rx);
            tx
        }

        fn write_guard(&self) -> Result<()> {
            if self.user.borrow().is_none() {
                return Err(ClientError::Unauthenticated);
            }
            if self.fail_writes.get() {
                return Err(ClientError::Server {
                    status: 500,
                    message: "Database operation failed".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait(?Send)]
    impl RestaurantApi for FakeApi {
        async fn current_user(&self) -> Result<Option<CurrentUser>> {
            Ok(self.user.borrow().clone())
        }

        async fn list(&self) -> Result<Vec<Restaurant>> {
            if self.user.borrow().is_none() {
                return Err(ClientError::Unauthenticated);
            }
            let held = self.held_lists.borrow_mut().pop_front();
            if let Some(held) = held {
                return held
                    .await
                    .map_err(|e| ClientError::Transport(e.to_string()));
            }
            Ok(self.restaurants.borrow().clone())
        }

        async fn create(&self, data: &CreateRestaurant) -> Result<Restaurant> {
            self.write_guard()?;
            self.next_id.set(self.next_id.get() + 1);
            let mut created = restaurant(&format!("new-{}", self.next_id.get()), 0.0, 0.0);
            created.name = data.name.clone();
            created.latitude = data.latitude;
            created.longitude = data.longitude;
            self.restaurants.borrow_mut().push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: &str, patch: &RestaurantPatch) -> Result<Restaurant> {
            self.write_guard()?;
            self.updates
                .borrow_mut()
                .push((id.to_string(), patch.clone()));
            let mut restaurants = self.restaurants.borrow_mut();
            let target = restaurants
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(ClientError::NotFound)?;
            if let Some(name) = &patch.name {
                target.name = name.clone();
            }
            if let Some(address) = &patch.address {
                target.address = address.clone();
            }
            if let (Some(lat), Some(lng)) = (patch.latitude, patch.longitude) {
                target.latitude = lat;
                target.longitude = lng;
            }
            if let Some(rating) = patch.rating {
                target.rating = rating;
            }
            if let Some(price_range) = patch.price_range {
                target.price_range = price_range;
            }
            if let Some(descriptors) = &patch.descriptors {
                target.descriptors = descriptors.clone();
            }
            if let Some(menu_items) = &patch.menu_items {
                target.menu_items = menu_items.clone();
            }
            if let Some(notes) = &patch.notes {
                target.notes = notes.clone();
            }
            Ok(target.clone())
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.write_guard()?;
            let mut restaurants = self.restaurants.borrow_mut();
            let before = restaurants.len();
            restaurants.retain(|r| r.id != id);
            if restaurants.len() == before {
                return Err(ClientError::NotFound);
            }
            Ok(())
        }

        async fn logout(&self) -> Result<()> {
            self.user.borrow_mut().take();
            Ok(())
        }
    }

    async fn controller(api: FakeApi) -> (Rc<FakeApi>, Rc<HeadlessSurface>, MapController) {
        let api = Rc::new(api);
        let (headless, shared) = surface();
        let controller = MapController::new(api.clone(), shared);
        controller.start().await.unwrap();
        (api, headless, controller)
    }

    #[tokio::test]
    async fn test_anonymous_gestures_are_swallowed() {
        let (_api, headless, controller) = controller(FakeApi::default()).await;

        assert!(!controller.is_authenticated());
        assert!(!controller.click_map(HERE));
        assert!(!controller.request_move());
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(headless.popups_opened(), 0);
    }

    #[tokio::test]
    async fn test_add_flow_returns_to_idle_with_new_marker() {
        let (api, headless, controller) = controller(FakeApi::signed_in()).await;

        assert!(controller.click_map(HERE));
        assert_eq!(controller.mode(), Mode::ClickEmptyToAdd { at: HERE });

        let created = controller
            .submit_new_restaurant(CreateRestaurant {
                name: "Test Cafe".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.lng_lat(), Some((HERE.lng, HERE.lat)));
        assert_eq!(api.restaurants.borrow().len(), 1);
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(controller.marker_count(), 1);
        let marker = controller.marker_for(&created.id).unwrap();
        assert_eq!(headless.marker(marker).unwrap().at, HERE);
        assert!(headless.open_popups().is_empty());
    }

    #[tokio::test]
    async fn test_marker_click_selects_through_the_surface() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (_api, headless, controller) = controller(api).await;

        let marker = controller.marker_for("r1").unwrap();
        assert!(headless.click_marker(marker));
        assert_eq!(controller.mode(), select("r1", LngLat::new(0.0, 0.0)));
    }

    #[tokio::test]
    async fn test_move_flow_saves_drag_coordinate() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (api, headless, controller) = controller(api).await;
        let marker = controller.marker_for("r1").unwrap();

        controller.click_marker("r1");
        assert!(controller.request_move());
        assert!(headless.marker(marker).unwrap().draggable);

        assert!(headless.drag_marker(marker, THERE));
        controller.drag_marker("r1", THERE);

        controller.confirm_move().await.unwrap();

        assert_eq!(api.updates.borrow()[0], ("r1".to_string(), RestaurantPatch::relocate(1.0, 1.0)));
        assert_eq!(controller.mode(), select("r1", THERE));
        assert_eq!(headless.marker(marker).unwrap().at, THERE);
        assert!(!headless.marker(marker).unwrap().draggable);
        assert!(headless.open_popups().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_state_unchanged() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (api, headless, controller) = controller(api).await;

        controller.click_marker("r1");
        controller.request_move();
        controller.drag_marker("r1", THERE);
        api.fail_writes.set(true);

        let before = controller.mode();
        let err = controller.confirm_move().await.unwrap_err();

        assert!(matches!(err, ClientError::Server { status: 500, .. }));
        assert_eq!(controller.mode(), before);
        assert_eq!(controller.last_error(), Some(err));
        assert_eq!(headless.open_popups(), vec![(PopupKind::Move, THERE)]);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_the_add_popup() {
        let api = FakeApi::signed_in();
        api.fail_writes.set(true);
        let (_api, headless, controller) = controller(api).await;

        controller.click_map(HERE);
        let result = controller
            .submit_new_restaurant(CreateRestaurant {
                name: "Test Cafe".to_string(),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(controller.mode(), Mode::ClickEmptyToAdd { at: HERE });
        assert_eq!(headless.open_popups(), vec![(PopupKind::Add, HERE)]);
    }

    #[tokio::test]
    async fn test_cancel_move_restores_start() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (api, _headless, controller) = controller(api).await;

        controller.click_marker("r1");
        controller.request_move();
        controller.drag_marker("r1", THERE);
        controller.cancel_move();

        assert_eq!(controller.mode(), select("r1", LngLat::new(0.0, 0.0)));
        assert!(api.updates.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_outside_their_state_are_rejected() {
        let (api, _headless, controller) = controller(FakeApi::signed_in()).await;

        let err = controller.confirm_move().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        let err = controller
            .submit_new_restaurant(CreateRestaurant::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        let err = controller
            .update_selected(RestaurantPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert!(controller.delete_selected().await.is_err());
        assert!(api.updates.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_delete_selected_removes_marker() {
        let api = FakeApi::signed_in()
            .with_restaurant(restaurant("r1", 0.0, 0.0))
            .with_restaurant(restaurant("r2", 1.0, 1.0));
        let (_api, headless, controller) = controller(api).await;

        controller.click_marker("r1");
        controller.delete_selected().await.unwrap();

        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(controller.marker_for("r1"), None);
        assert_eq!(headless.marker_count(), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_markers_and_state() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (_api, headless, controller) = controller(api).await;

        controller.click_marker("r1");
        controller.request_move();
        controller.logout().await.unwrap();

        assert!(!controller.is_authenticated());
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(headless.marker_count(), 0);
        assert_eq!(headless.listener_count(), 0);
        assert!(headless.open_popups().is_empty());
        assert!(!controller.click_map(HERE));
    }

    #[tokio::test]
    async fn test_expired_session_on_refresh_signs_out() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (api, headless, controller) = controller(api).await;
        assert_eq!(headless.marker_count(), 1);

        api.user.borrow_mut().take();
        let err = controller.refresh().await.unwrap_err();

        assert_eq!(err, ClientError::Unauthenticated);
        assert!(!controller.is_authenticated());
        assert_eq!(headless.marker_count(), 0);
    }

    #[tokio::test]
    async fn test_update_selected_keeps_the_selection() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (api, headless, controller) = controller(api).await;
        let marker = controller.marker_for("r1").unwrap();

        controller.click_marker("r1");
        let updated = controller
            .update_selected(RestaurantPatch {
                rating: Some(Some(8.5)),
                price_range: Some(Some(2)),
                descriptors: Some(vec!["cozy".to_string()]),
                notes: Some(Some("patio".to_string())),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.rating, Some(8.5));
        assert_eq!(api.updates.borrow().len(), 1);
        assert_eq!(controller.mode(), select("r1", LngLat::new(0.0, 0.0)));
        let listed = controller.restaurants();
        assert_eq!(listed[0].notes.as_deref(), Some("patio"));
        assert_eq!(listed[0].descriptors, vec!["cozy".to_string()]);
        assert_eq!(controller.marker_for("r1"), Some(marker));
        assert_eq!(headless.marker_count(), 1);
    }

    #[tokio::test]
    async fn test_update_selected_follows_a_new_location() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (_api, headless, controller) = controller(api).await;
        let marker = controller.marker_for("r1").unwrap();

        controller.click_marker("r1");
        controller
            .update_selected(RestaurantPatch::relocate(THERE.lng, THERE.lat))
            .await
            .unwrap();

        assert_eq!(controller.mode(), select("r1", THERE));
        assert_eq!(headless.marker(marker).unwrap().at, THERE);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_selection_and_data() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (api, _headless, controller) = controller(api).await;

        controller.click_marker("r1");
        api.fail_writes.set(true);

        let before = controller.mode();
        let err = controller
            .update_selected(RestaurantPatch {
                rating: Some(Some(3.0)),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Server { status: 500, .. }));
        assert_eq!(controller.mode(), before);
        assert_eq!(controller.last_error(), Some(err));
        assert_eq!(controller.restaurants()[0].rating, None);
    }

    #[tokio::test]
    async fn test_subscribers_can_read_the_controller() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("r1", 0.0, 0.0));
        let (_api, _headless, controller) = controller(api).await;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let observer = controller.clone();
        let log = seen.clone();
        controller.subscribe(move |mode| {
            log.borrow_mut()
                .push((mode.clone(), observer.mode(), observer.marker_count()));
        });

        controller.click_map(HERE);
        controller.click_marker("r1");

        let at = LngLat::new(0.0, 0.0);
        assert_eq!(
            *seen.borrow(),
            vec![
                (
                    Mode::ClickEmptyToAdd { at: HERE },
                    Mode::ClickEmptyToAdd { at: HERE },
                    1
                ),
                (select("r1", at), select("r1", at), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_loaded_for_previous_user_is_dropped() {
        let api = FakeApi::signed_in().with_restaurant(restaurant("alice-r1", 0.0, 0.0));
        let (api, headless, controller) = controller(api).await;
        assert_eq!(headless.marker_count(), 1);

        let held = api.hold_next_list();
        let stale = controller.refresh();
        tokio::pin!(stale);
        assert!(futures::poll!(&mut stale).is_pending());

        controller.logout().await.unwrap();
        *api.restaurants.borrow_mut() = vec![restaurant("bob-r1", 5.0, 5.0)];
        api.sign_in_as("bob");
        controller.start().await.unwrap();

        held.send(vec![restaurant("alice-r1", 0.0, 0.0)]).unwrap();
        stale.await.unwrap();

        assert_eq!(controller.user().unwrap().user_id, "bob");
        assert_eq!(headless.marker_count(), 1);
        assert_eq!(controller.marker_for("alice-r1"), None);
        assert!(controller.marker_for("bob-r1").is_some());
        let ids: Vec<String> = controller.restaurants().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["bob-r1".to_string()]);
    }

    #[tokio::test]
    async fn test_older_list_does_not_overwrite_newer() {
        let api = FakeApi::signed_in();
        let (api, headless, controller) = controller(api).await;

        let older_list = api.hold_next_list();
        let newer_list = api.hold_next_list();
        let older = controller.refresh();
        tokio::pin!(older);
        assert!(futures::poll!(&mut older).is_pending());
        let newer = controller.refresh();
        tokio::pin!(newer);
        assert!(futures::poll!(&mut newer).is_pending());

        newer_list.send(vec![restaurant("r2", 1.0, 1.0)]).unwrap();
        newer.await.unwrap();
        older_list.send(vec![restaurant("r1", 0.0, 0.0)]).unwrap();
        older.await.unwrap();

        assert_eq!(headless.marker_count(), 1);
        assert!(controller.marker_for("r2").is_some());
        assert_eq!(controller.marker_for("r1"), None);
        assert_eq!(controller.restaurants()[0].id, "r2");
    }
}
