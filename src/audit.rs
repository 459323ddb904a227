//! Audit log of lifecycle transitions.
//!
//! Every state change the engine makes is recorded as an immutable [`Entry`].
//! Entries of a single subject make up its _diary_.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::models::ActorId;

/// Entity responsible for an action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Actor {
    /// System. This actor is used for actions carried automatically by the
    /// engine, such as sending scheduled reminders, and actions invoked from
    /// the CLI.
    System,
    /// A user.
    User(ActorId),
}

impl From<ActorId> for Actor {
    fn from(id: ActorId) -> Self {
        Actor::User(id)
    }
}

/// A single audit log entry.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
    /// Kind of object this entry concerns, e.g. `versions`.
    pub context: String,
    /// Subject this entry concerns.
    pub context_id: Uuid,
    /// What happened, e.g. `increment`.
    pub kind: String,
    data: Vec<u8>,
}

impl Entry {
    /// Decode data attached to this entry.
    pub fn data<T>(&self) -> Result<T, rmps::decode::Error>
    where
        T: DeserializeOwned,
    {
        rmps::from_slice(&self.data)
    }
}

/// Destination for audit log entries.
pub trait Sink: Send + Sync {
    /// Persist an entry.
    fn record(&self, entry: Entry);

    /// All entries recorded so far, oldest first.
    fn entries(&self) -> Vec<Entry>;

    /// All entries concerning a single subject, oldest first.
    fn entries_for(&self, context_id: Uuid) -> Vec<Entry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.context_id == context_id)
            .collect()
    }
}

/// Audit log kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<Entry>>,
}

impl MemoryLog {
    pub fn new() -> MemoryLog {
        MemoryLog::default()
    }
}

impl Sink for MemoryLog {
    fn record(&self, entry: Entry) {
        self.entries.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn entries(&self) -> Vec<Entry> {
        self.entries.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Store an event in the audit log.
pub fn log<A, D>(
    sink: &dyn Sink,
    timestamp: DateTime<Utc>,
    actor: A,
    context: &str,
    context_id: Uuid,
    kind: &str,
    data: D,
)
where
    Actor: From<A>,
    D: Serialize,
{
    let data = rmps::to_vec_named(&data).expect("invalid audit log data");

    sink.record(Entry {
        timestamp,
        actor: Actor::from(actor),
        context: context.to_string(),
        context_id,
        kind: kind.to_string(),
        data,
    });
}
