//! Exclusive editing locks.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    events::LockOverridden,
    models::{
        ActorId,
        Lock,
        LockError,
        lock::{self, Acquired, Released},
    },
    permissions::PermissionBits,
};
use super::Engine;

#[derive(Serialize)]
struct Overridden {
    previous: ActorId,
}

impl Engine {
    /// Lock a subject for editing by `actor`.
    ///
    /// This never waits: if another actor holds the lock this fails
    /// immediately, unless `actor` has administrative override, in which case
    /// the lock is taken over.
    pub fn lock(&self, id: Uuid, actor: ActorId) -> Result<Lock, LockError> {
        let can_override = self.can_override(actor)?;
        let now = self.now();

        let (lock, how) = self.with_subject(id, |subject| {
            lock::acquire(&mut subject.lock, actor, can_override, now)
        })?;

        match how {
            Acquired::Granted => {
                info!("Subject {} locked by actor {}", id, actor);
                self.log(actor, "locks", id, "acquire", ());
            }
            Acquired::Reentered => {
                debug!("Actor {} already holds lock on {}", actor, id);
            }
            Acquired::Overridden { previous } => {
                warn!("Actor {} took over lock on {} from actor {}",
                    actor, id, previous);
                self.log(actor, "locks", id, "override", Overridden { previous });
                self.notify(Some(previous), LockOverridden { subject: id, by: actor });
            }
        }

        Ok(lock)
    }

    /// Release a lock held by `actor`.
    ///
    /// Administrators may release locks held by other actors.
    pub fn unlock(&self, id: Uuid, actor: ActorId) -> Result<(), LockError> {
        let can_override = self.can_override(actor)?;

        let how = self.with_subject(id, |subject| {
            lock::release(&mut subject.lock, actor, can_override)
        })?;

        self.after_release(id, actor, how);

        Ok(())
    }

    /// Release whatever lock is held on a subject.
    ///
    /// Requires administrative override. Succeeds even if the subject was not
    /// locked. Returns the actor who held the lock.
    pub fn force_unlock(&self, id: Uuid, admin: ActorId)
    -> Result<Option<ActorId>, LockError> {
        self.permissions(admin)?.require(PermissionBits::ADMIN_OVERRIDE)?;

        let how = self.with_subject(id, |subject| {
            if subject.lock.is_none() {
                return Ok(None);
            }

            lock::release(&mut subject.lock, admin, true).map(Some)
        })?;

        match how {
            Some(how) => {
                self.after_release(id, admin, how);

                Ok(Some(match how {
                    Released::Holder => admin,
                    Released::Override { holder } => holder,
                }))
            }
            None => {
                debug!("Subject {} was not locked", id);
                Ok(None)
            }
        }
    }

    fn after_release(&self, id: Uuid, actor: ActorId, how: Released) {
        match how {
            Released::Holder => {
                info!("Subject {} unlocked by actor {}", id, actor);
                self.log(actor, "locks", id, "release", ());
            }
            Released::Override { holder } => {
                warn!("Actor {} force-released lock on {} held by actor {}",
                    actor, id, holder);
                self.log(actor, "locks", id, "force-release",
                    Overridden { previous: holder });
                self.notify(Some(holder), LockOverridden { subject: id, by: actor });
            }
        }
    }
}
