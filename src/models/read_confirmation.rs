//! Read confirmations of published versions.
//!
//! When a version is published every viewer of its subject is asked to
//! confirm they have read it. Records are kept per version; a record made for
//! one version is never carried over to the next.

use chrono::{DateTime, Utc};
use failure::Fail;
use lifecycle_macros::From;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{error::ApiError, permissions::RequirePermissionsError};
use super::{ActorId, LookupError};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadConfirmation {
    pub actor: ActorId,
    pub assigned: DateTime<Utc>,
    pub confirmed: Option<DateTime<Utc>>,
    /// When the actor was last reminded to confirm.
    pub reminded: Option<DateTime<Utc>>,
}

impl ReadConfirmation {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed.is_some()
    }
}

/// Result of confirming.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Confirmed {
    Now,
    /// Actor had already confirmed; nothing changed.
    Already,
}

/// Read confirmations of all versions of a subject.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadConfirmations {
    versions: BTreeMap<u32, BTreeMap<ActorId, ReadConfirmation>>,
}

impl ReadConfirmations {
    /// Ask `actor` to confirm reading `version`.
    ///
    /// Returns `false` if they already were asked.
    pub fn assign(&mut self, version: u32, actor: ActorId, now: DateTime<Utc>)
    -> bool {
        let records = self.versions.entry(version).or_default();

        if records.contains_key(&actor) {
            return false;
        }

        records.insert(actor, ReadConfirmation {
            actor,
            assigned: now,
            confirmed: None,
            reminded: None,
        });

        true
    }

    pub fn confirm(&mut self, version: u32, actor: ActorId, now: DateTime<Utc>)
    -> Result<Confirmed, ReadConfirmationError> {
        let record = self.versions.get_mut(&version)
            .and_then(|records| records.get_mut(&actor))
            .ok_or(ReadConfirmationError::NotAssigned { actor, version })?;

        if record.is_confirmed() {
            return Ok(Confirmed::Already);
        }

        record.confirmed = Some(now);
        Ok(Confirmed::Now)
    }

    /// All records for a version, ordered by actor.
    pub fn records(&self, version: u32) -> impl Iterator<Item = &ReadConfirmation> + '_ {
        self.versions.get(&version)
            .into_iter()
            .flat_map(|records| records.values())
    }

    /// Actors who have not yet confirmed reading a version.
    pub fn pending(&self, version: u32) -> impl Iterator<Item = ActorId> + '_ {
        self.records(version)
            .filter(|record| !record.is_confirmed())
            .map(|record| record.actor)
    }

    /// Stamp every pending record of a version as reminded, returning actors
    /// who were reminded.
    pub fn mark_reminded(&mut self, version: u32, now: DateTime<Utc>)
    -> Vec<ActorId> {
        self.versions.get_mut(&version)
            .into_iter()
            .flat_map(|records| records.values_mut())
            .filter(|record| !record.is_confirmed())
            .map(|record| {
                record.reminded = Some(now);
                record.actor
            })
            .collect()
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ReadConfirmationError {
    #[fail(display = "{}", _0)]
    Lookup(#[cause] #[from] LookupError),
    #[fail(display = "{}", _0)]
    Permissions(#[cause] #[from] RequirePermissionsError),
    #[api(code = "read-confirmation:not-assigned")]
    #[fail(display = "Actor {} was not asked to confirm reading version {}",
        actor, version)]
    NotAssigned {
        actor: ActorId,
        version: u32,
    },
    /// Read confirmations only concern published versions.
    #[api(code = "read-confirmation:not-published")]
    #[fail(display = "Version {} was never published", _0)]
    NotPublished(u32),
}
