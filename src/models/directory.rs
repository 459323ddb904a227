//! Actor directory: who exists, and what they may do.

use std::collections::HashMap;

use crate::{config, permissions::PermissionBits};
use super::ActorId;

/// Resolves actors to their capabilities.
///
/// Authentication and role management live outside the engine; this is the
/// only view of them the engine has.
pub trait Directory: Send + Sync {
    /// Capabilities of an actor, or `None` if no such actor exists.
    fn permissions(&self, actor: ActorId) -> Option<PermissionBits>;
}

/// Directory with a fixed set of actors.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    actors: HashMap<ActorId, PermissionBits>,
}

impl StaticDirectory {
    pub fn new() -> StaticDirectory {
        StaticDirectory::default()
    }

    /// Build a directory from configured actors.
    pub fn from_config(actors: &[config::Actor]) -> StaticDirectory {
        actors.iter()
            .fold(StaticDirectory::new(), |dir, actor| dir.with(
                actor.id, actor.permissions.iter().collect()))
    }

    pub fn with(mut self, actor: ActorId, permissions: PermissionBits) -> Self {
        self.insert(actor, permissions);
        self
    }

    pub fn insert(&mut self, actor: ActorId, permissions: PermissionBits) {
        self.actors.insert(actor, permissions);
    }
}

impl Directory for StaticDirectory {
    fn permissions(&self, actor: ActorId) -> Option<PermissionBits> {
        self.actors.get(&actor).copied()
    }
}
