//! Drafts, version increments, and version history.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit::Entry,
    models::{ActorId, ContentRef, LookupError, Version, VersionError, version},
};
use super::Engine;

#[derive(Serialize)]
struct Cut<'a> {
    number: u32,
    predecessor: Option<u32>,
    derived_from: Option<u32>,
    content: &'a str,
}

impl<'a> From<&'a Version> for Cut<'a> {
    fn from(v: &'a Version) -> Self {
        Cut {
            number: v.number,
            predecessor: v.predecessor,
            derived_from: v.derived_from,
            content: &v.content.0,
        }
    }
}

impl Engine {
    /// Start a new draft of a subject from fresh content.
    pub fn create_draft(&self, id: Uuid, author: ActorId, content: ContentRef)
    -> Result<Version, VersionError> {
        self.permissions(author)?;
        let now = self.now();

        let version = self.with_subject(id, |subject| {
            version::create_draft(subject, content, author, now)
        })?;

        info!("Actor {} created draft {} of {}", author, version.number, id);
        self.log(author, "versions", id, "create-draft", Cut::from(&version));

        Ok(version)
    }

    /// Replace content of a subject's draft. Requires holding its lock.
    pub fn save_draft(&self, id: Uuid, actor: ActorId, content: ContentRef)
    -> Result<Version, VersionError> {
        self.permissions(actor)?;

        let version = self.with_subject(id, |subject| {
            version::save_draft(subject, content, actor)
        })?;

        debug!("Actor {} saved draft {} of {}", actor, version.number, id);
        self.log(actor, "versions", id, "save-draft", Cut::from(&version));

        Ok(version)
    }

    /// Abandon a subject's draft. Requires holding its lock.
    pub fn discard_draft(&self, id: Uuid, actor: ActorId)
    -> Result<Version, VersionError> {
        self.permissions(actor)?;

        let version = self.with_subject(id, |subject| {
            version::discard_draft(subject, actor)
        })?;

        info!("Actor {} discarded draft {} of {}", actor, version.number, id);
        self.log(actor, "versions", id, "discard-draft", Cut::from(&version));

        Ok(version)
    }

    /// Cut a new version from the subject's latest content.
    pub fn increment_version(&self, id: Uuid, author: ActorId)
    -> Result<Version, VersionError> {
        self.permissions(author)?;
        self.ensure_references::<VersionError>(id)?;
        let now = self.now();

        let version = self.with_subject(id, |subject| {
            version::increment(subject, author, now)
        })?;

        info!("Actor {} cut version {} of {}", author, version.number, id);
        self.log(author, "versions", id, "increment", Cut::from(&version));

        Ok(version)
    }

    /// Cut a new version from the content of historical version `past`.
    pub fn historical_increment_version(&self, id: Uuid, author: ActorId, past: u32)
    -> Result<Version, VersionError> {
        self.permissions(author)?;
        self.ensure_references::<VersionError>(id)?;
        let now = self.now();

        let version = self.with_subject(id, |subject| {
            version::historical_increment(subject, author, past, now)
        })?;

        info!("Actor {} cut version {} of {} from version {}",
            author, version.number, id, past);
        self.log(author, "versions", id, "historical-increment",
            Cut::from(&version));

        Ok(version)
    }

    /// All versions of a subject, oldest first.
    pub fn historical(&self, id: Uuid) -> Result<Vec<Version>, LookupError> {
        self.read_subject(id, |subject| subject.history.iter().cloned().collect())
    }

    /// All audit entries concerning a subject, oldest first.
    pub fn diary(&self, id: Uuid) -> Result<Vec<Entry>, LookupError> {
        // Deleted subjects keep their diary, so only the log is consulted.
        let entries = self.audit.entries_for(id);

        if entries.is_empty() {
            self.handle(id)?;
        }

        Ok(entries)
    }
}
