//! Lifecycle state of subjects.
//!
//! Types in this module are plain data together with the rules for
//! transitioning them. They know nothing about concurrency, auditing, or
//! notifications; those are the job of [`crate::engine`].

use failure::Fail;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ApiError;

pub mod approval;
pub mod directory;
pub mod lock;
pub mod read_confirmation;
pub mod reference;
pub mod review;
pub mod subject;
pub mod version;

pub use self::{
    approval::{
        ApprovalError,
        Chain,
        ChainState,
        Decision,
        Response,
        Stage,
        StageId,
        StageKind,
        Transition,
    },
    directory::{Directory, StaticDirectory},
    lock::{Lock, LockError},
    read_confirmation::{Confirmed, ReadConfirmation, ReadConfirmationError},
    reference::{BrokenReferenceError, ReferenceReport},
    review::{Cadence, Closure, Review, ReviewCycle, ReviewError},
    subject::{Lifecycle, Role, Subject, SubjectError, SubjectKind, SubjectState},
    version::{ContentRef, Tag, Version, VersionError},
};

/// Identifier of an actor (user) as known to the actor directory.
pub type ActorId = i32;

/// Identifies a single version of a subject.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd,
    Serialize,
)]
pub struct VersionId {
    pub subject: Uuid,
    /// Sequence number of this version, starting at 1.
    pub number: u32,
}

impl VersionId {
    pub fn new(subject: Uuid, number: u32) -> VersionId {
        VersionId { subject, number }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.subject, self.number)
    }
}

/// Referenced object does not exist.
#[derive(ApiError, Debug, Fail)]
pub enum LookupError {
    #[api(code = "subject:not-found")]
    #[fail(display = "No subject with id {}", _0)]
    SubjectNotFound(Uuid),
    #[api(code = "version:not-found")]
    #[fail(display = "No version {}", _0)]
    VersionNotFound(VersionId),
    #[api(code = "actor:not-found")]
    #[fail(display = "No actor with id {}", _0)]
    UnknownActor(ActorId),
}
