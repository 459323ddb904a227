//! The lifecycle engine.
//!
//! [`Engine`] owns all subjects and is the only way the request layer
//! mutates them. Every operation on a subject runs inside that subject's
//! mutex, so operations on one subject are serialised while operations on
//! different subjects proceed in parallel.
//!
//! To stay free of deadlocks the engine never holds more than one subject's
//! mutex at a time, and never touches the subject map while holding one.
//! Operations which need to look at other subjects (such as reference
//! checks) read them one by one before entering the critical section.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::{
    audit::{self, Actor},
    clock::{Clock, SystemClock},
    config::Config,
    events::{self, Dispatcher, Event, LogDispatcher},
    models::{ActorId, Cadence, Directory, LookupError, Subject},
    permissions::PermissionBits,
};

mod approvals;
mod locking;
mod read_confirmations;
mod references;
mod reviews;
mod state;
mod subjects;
mod versions;

pub use self::{
    reviews::{DueForReminder, DueReview},
    state::State,
};

/// Engine-wide settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settings {
    /// Cadence of review cycles for subjects which don't have their own.
    pub default_cadence: Cadence,
    /// Refuse to cut versions and publish while references are broken.
    pub block_broken_references: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_cadence: Cadence {
                interval_days: 365,
                lead_days: 30,
            },
            block_broken_references: false,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Settings {
        Settings {
            default_cadence: Cadence {
                interval_days: config.review.interval_days,
                lead_days: config.review.lead_days,
            },
            block_broken_references: config.workflow.block_broken_references,
        }
    }
}

type Handle = Arc<Mutex<Subject>>;

pub struct Engine {
    subjects: DashMap<Uuid, Handle>,
    directory: Arc<dyn Directory>,
    dispatcher: Arc<dyn Dispatcher>,
    audit: Arc<dyn audit::Sink>,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

/// Configures and creates an [`Engine`].
pub struct Builder {
    directory: Arc<dyn Directory>,
    dispatcher: Arc<dyn Dispatcher>,
    audit: Arc<dyn audit::Sink>,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

impl Builder {
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn audit(mut self, audit: Arc<dyn audit::Sink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            subjects: DashMap::new(),
            directory: self.directory,
            dispatcher: self.dispatcher,
            audit: self.audit,
            clock: self.clock,
            settings: self.settings,
        }
    }
}

impl Engine {
    /// Start configuring an engine which resolves actors in `directory`.
    ///
    /// Unless configured otherwise the engine uses wall-clock time, keeps its
    /// audit log in memory, and only logs notifications.
    pub fn builder(directory: Arc<dyn Directory>) -> Builder {
        Builder {
            directory,
            dispatcher: Arc::new(LogDispatcher),
            audit: Arc::new(audit::MemoryLog::new()),
            clock: Arc::new(SystemClock),
            settings: Settings::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn handle(&self, id: Uuid) -> Result<Handle, LookupError> {
        self.subjects.get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(LookupError::SubjectNotFound(id))
    }

    /// Run `f` inside the critical section of a subject.
    fn with_subject<T, E, F>(&self, id: Uuid, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Subject) -> Result<T, E>,
        E: From<LookupError>,
    {
        let handle = self.handle(id)?;
        let mut subject = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut subject)
    }

    /// Look at a subject without changing it.
    fn read_subject<T, F>(&self, id: Uuid, f: F) -> Result<T, LookupError>
    where
        F: FnOnce(&Subject) -> T,
    {
        let handle = self.handle(id)?;
        let subject = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&subject))
    }

    /// Snapshot handles of all subjects, without holding any of their locks.
    fn handles(&self) -> Vec<(Uuid, Handle)> {
        self.subjects.iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Capabilities of an actor.
    fn permissions(&self, actor: ActorId) -> Result<PermissionBits, LookupError> {
        self.directory.permissions(actor)
            .ok_or(LookupError::UnknownActor(actor))
    }

    /// Can `actor` use administrative override?
    fn can_override(&self, actor: ActorId) -> Result<bool, LookupError> {
        self.permissions(actor)
            .map(|p| p.contains(PermissionBits::ADMIN_OVERRIDE))
    }

    fn log<A, D>(&self, actor: A, context: &str, subject: Uuid, kind: &str, data: D)
    where
        Actor: From<A>,
        D: Serialize,
    {
        audit::log(&*self.audit, self.now(), actor, context, subject, kind, data);
    }

    fn notify<U, E>(&self, users: U, event: E)
    where
        U: IntoIterator<Item = ActorId>,
        Event: From<E>,
    {
        events::notify(&*self.dispatcher, users, event);
    }
}
