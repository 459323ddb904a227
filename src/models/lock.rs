//! Exclusive editing locks.
//!
//! A subject has at most one lock. Holding it is what allows an actor to edit
//! the subject's draft, and no other actor may cut versions or submit the
//! subject for approval while it is held.

use chrono::{DateTime, Utc};
use failure::Fail;
use lifecycle_macros::From;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, permissions::RequirePermissionsError};
use super::{ActorId, LookupError};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Lock {
    /// Actor holding this lock.
    pub holder: ActorId,
    pub acquired: DateTime<Utc>,
}

/// How a lock was obtained.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Acquired {
    /// Subject was not locked.
    Granted,
    /// Requester already held the lock.
    Reentered,
    /// Lock was taken over from another actor by an administrator.
    Overridden { previous: ActorId },
}

/// How a lock was released.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Released {
    /// By its holder.
    Holder,
    /// By an administrator, on behalf of its holder.
    Override { holder: ActorId },
}

/// Try to lock a subject for `actor`.
///
/// Fails fast if another actor holds the lock, unless `can_override` is set,
/// in which case the lock changes hands.
pub fn acquire(
    slot: &mut Option<Lock>,
    actor: ActorId,
    can_override: bool,
    now: DateTime<Utc>,
) -> Result<(Lock, Acquired), LockError> {
    let how = match *slot {
        None => Acquired::Granted,
        Some(ref lock) if lock.holder == actor =>
            return Ok((lock.clone(), Acquired::Reentered)),
        Some(ref lock) if can_override =>
            Acquired::Overridden { previous: lock.holder },
        Some(ref lock) =>
            return Err(LockError::AlreadyLocked { holder: lock.holder }),
    };

    let lock = Lock { holder: actor, acquired: now };
    *slot = Some(lock.clone());

    Ok((lock, how))
}

/// Release a lock held by `actor`, or by anyone if `can_override` is set.
pub fn release(slot: &mut Option<Lock>, actor: ActorId, can_override: bool)
-> Result<Released, LockError> {
    let how = match *slot {
        Some(ref lock) if lock.holder == actor => Released::Holder,
        Some(ref lock) if can_override =>
            Released::Override { holder: lock.holder },
        _ => return Err(LockError::NotLockHolder),
    };

    *slot = None;

    Ok(how)
}

/// Holder of the lock, if it is held by someone other than `actor`.
pub fn foreign_holder(slot: &Option<Lock>, actor: ActorId) -> Option<ActorId> {
    slot.as_ref()
        .map(|lock| lock.holder)
        .filter(|&holder| holder != actor)
}

#[derive(ApiError, Debug, Fail, From)]
pub enum LockError {
    #[fail(display = "{}", _0)]
    Lookup(#[cause] #[from] LookupError),
    #[fail(display = "{}", _0)]
    Permissions(#[cause] #[from] RequirePermissionsError),
    /// Subject is locked by another actor.
    #[api(code = "lock:acquire:already-locked")]
    #[fail(display = "Subject is locked by actor {}", holder)]
    AlreadyLocked {
        holder: ActorId,
    },
    /// Only the holder (or an administrator) may release a lock.
    #[api(code = "lock:release:not-holder")]
    #[fail(display = "Subject is not locked by this actor")]
    NotLockHolder,
}
