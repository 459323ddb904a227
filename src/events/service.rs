//! Delivery of notifications.

use failure::Fail;
use std::sync::{Mutex, PoisonError};

use crate::models::ActorId;
use super::events::Event;

/// Notify a user of an event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub user: ActorId,
    pub event: Event,
}

/// Notification transport.
///
/// Dispatch is fire-and-forget from the engine's point of view: errors are
/// logged, but never fail the operation which caused the event.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<(), DispatchError>;
}

#[derive(Debug, Fail)]
#[fail(display = "Could not deliver notification: {}", _0)]
pub struct DispatchError(pub String);

/// Emit an event to each of `users`.
///
/// Errors will be logged, but otherwise ignored.
pub fn notify<U, E>(dispatcher: &dyn Dispatcher, users: U, event: E)
where
    U: IntoIterator<Item = ActorId>,
    Event: From<E>,
{
    let event = Event::from(event);

    for user in users {
        let notification = Notification { user, event: event.clone() };

        if let Err(err) = dispatcher.dispatch(notification) {
            error!("Could not dispatch event notification: {}", err);
        }
    }
}

/// Dispatcher which keeps notifications in memory until they are drained.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Mutex<Vec<Notification>>,
}

impl Outbox {
    pub fn new() -> Outbox {
        Outbox::default()
    }

    /// Take all notifications dispatched so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::replace(
            &mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner),
            Vec::new(),
        )
    }
}

impl Dispatcher for Outbox {
    fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        self.queue.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

/// Dispatcher which only writes notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&self, Notification { user, event }: Notification)
    -> Result<(), DispatchError> {
        info!("Notify user {} of {} on {}", user, event.kind(), event.subject());
        Ok(())
    }
}
