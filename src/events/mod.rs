//! Handling of events and notifications.
//!
//! The engine only decides _who_ should be told about _what_; delivery is
//! left to a [`Dispatcher`] supplied by the embedding application.

mod events;
mod service;

pub use self::{
    events::*,
    service::{
        DispatchError,
        Dispatcher,
        LogDispatcher,
        Notification,
        Outbox,
        notify,
    },
};
