//! Interaction state machine.
//!
//! [`next_mode`] is the transition table over plain [`Mode`] snapshots.
//! [`InteractionStore`] applies it to the live [`InteractionState`], which
//! additionally owns the popup of the states that show one.

use std::rc::Rc;

use tracing::debug;

use super::geo::LngLat;
use super::surface::{MapSurface, PopupHandle, PopupKind};

/// What the user is doing on the map
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Idle,
    ClickEmptyToAdd {
        at: LngLat,
    },
    SelectRestaurant {
        id: String,
        at: LngLat,
    },
    MovingRestaurant {
        id: String,
        start: LngLat,
        drag: LngLat,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Click on empty map space
    MapClick { at: LngLat },
    MarkerClick { id: String, at: LngLat },
    RequestMove,
    MarkerDrag { id: String, at: LngLat },
    CancelMove,
    /// The relocation of `id` to `at` was stored
    MoveSaved { id: String, at: LngLat },
    /// The restaurant drafted in the add popup was stored
    RestaurantCreated,
    DeleteConfirmed,
    LoggedOut,
}

/// `None` when the event has no effect in the current mode
pub fn next_mode(current: &Mode, event: &Event) -> Option<Mode> {
    use Event as E;
    use Mode as M;

    match (current, event) {
        (_, E::DeleteConfirmed) | (_, E::LoggedOut) => Some(M::Idle),

        (M::Idle, E::MapClick { at }) => Some(M::ClickEmptyToAdd { at: *at }),
        (M::ClickEmptyToAdd { .. }, E::MapClick { .. })
        | (M::SelectRestaurant { .. }, E::MapClick { .. })
        | (M::MovingRestaurant { .. }, E::MapClick { .. }) => Some(M::Idle),

        (_, E::MarkerClick { id, at }) => Some(M::SelectRestaurant {
            id: id.clone(),
            at: *at,
        }),

        (M::ClickEmptyToAdd { .. }, E::RestaurantCreated) => Some(M::Idle),

        (M::SelectRestaurant { id, at }, E::RequestMove) => Some(M::MovingRestaurant {
            id: id.clone(),
            start: *at,
            drag: *at,
        }),

        (M::MovingRestaurant { id, start, .. }, E::MarkerDrag { id: dragged, at })
            if id == dragged =>
        {
            Some(M::MovingRestaurant {
                id: id.clone(),
                start: *start,
                drag: *at,
            })
        }
        (M::MovingRestaurant { id, start, .. }, E::CancelMove) => Some(M::SelectRestaurant {
            id: id.clone(),
            at: *start,
        }),
        (M::MovingRestaurant { id, .. }, E::MoveSaved { id: saved, at }) if id == saved => {
            Some(M::SelectRestaurant {
                id: id.clone(),
                at: *at,
            })
        }

        _ => None,
    }
}

/// Live interaction state. A popup is owned by the state that shows it and
/// closes when the state is replaced.
#[derive(Debug)]
pub enum InteractionState {
    Idle,
    ClickEmptyToAdd {
        at: LngLat,
        popup: PopupHandle,
    },
    SelectRestaurant {
        id: String,
        at: LngLat,
    },
    MovingRestaurant {
        id: String,
        start: LngLat,
        drag: LngLat,
        popup: PopupHandle,
    },
}

impl InteractionState {
    pub fn mode(&self) -> Mode {
        match self {
            InteractionState::Idle => Mode::Idle,
            InteractionState::ClickEmptyToAdd { at, .. } => Mode::ClickEmptyToAdd { at: *at },
            InteractionState::SelectRestaurant { id, at } => Mode::SelectRestaurant {
                id: id.clone(),
                at: *at,
            },
            InteractionState::MovingRestaurant { id, start, drag, .. } => {
                Mode::MovingRestaurant {
                    id: id.clone(),
                    start: *start,
                    drag: *drag,
                }
            }
        }
    }

    pub fn popup(&self) -> Option<&PopupHandle> {
        match self {
            InteractionState::ClickEmptyToAdd { popup, .. }
            | InteractionState::MovingRestaurant { popup, .. } => Some(popup),
            _ => None,
        }
    }
}

pub type SubscriptionId = u64;

pub type Subscriber = Rc<dyn Fn(&Mode)>;

/// Holds the single interaction state and the subscribers told about every
/// transition.
pub struct InteractionStore {
    surface: Rc<dyn MapSurface>,
    state: InteractionState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl InteractionStore {
    pub fn new(surface: Rc<dyn MapSurface>) -> Self {
        Self {
            surface,
            state: InteractionState::Idle,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&Mode) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = self.next_subscription;
        self.subscribers.push((id, Rc::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Applies `event` and notifies subscribers. Returns `false` when it was
    /// ignored.
    pub fn dispatch(&mut self, event: &Event) -> bool {
        let Some(next) = self.apply(event) else {
            return false;
        };
        for subscriber in self.subscribers() {
            subscriber(&next);
        }
        true
    }

    /// Applies `event` without notifying anyone and returns the new mode.
    /// Callers that share the store notify from [`Self::subscribers`] once
    /// their own borrow has ended.
    pub fn apply(&mut self, event: &Event) -> Option<Mode> {
        let current = self.state.mode();
        let Some(next) = next_mode(&current, event) else {
            debug!(?event, mode = ?current, "Event ignored in current mode");
            return None;
        };

        // a drag keeps the move popup and only follows the marker
        if let (
            InteractionState::MovingRestaurant { drag, popup, .. },
            Mode::MovingRestaurant { drag: to, .. },
        ) = (&mut self.state, &next)
        {
            *drag = *to;
            popup.move_to(*to);
            return Some(next);
        }

        // release the previous popup before a new one can be opened
        self.state = InteractionState::Idle;
        self.state = self.enter(next.clone());

        debug!(from = ?current, to = ?next, "Interaction state changed");
        Some(next)
    }

    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.subscribers
            .iter()
            .map(|(_, subscriber)| Rc::clone(subscriber))
            .collect()
    }

    fn enter(&self, mode: Mode) -> InteractionState {
        match mode {
            Mode::Idle => InteractionState::Idle,
            Mode::ClickEmptyToAdd { at } => InteractionState::ClickEmptyToAdd {
                at,
                popup: PopupHandle::open(&self.surface, PopupKind::Add, at),
            },
            Mode::SelectRestaurant { id, at } => InteractionState::SelectRestaurant { id, at },
            Mode::MovingRestaurant { id, start, drag } => InteractionState::MovingRestaurant {
                id,
                start,
                drag,
                popup: PopupHandle::open(&self.surface, PopupKind::Move, drag),
            },
        }
    }
}
