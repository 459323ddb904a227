//! Read confirmations of published versions.

use serde::Serialize;

use crate::{
    audit::Actor,
    events::{ReadConfirmationReminder, ReadConfirmationRequested},
    models::{
        ActorId,
        Confirmed,
        LookupError,
        ReadConfirmation,
        ReadConfirmationError,
        Subject,
        VersionId,
    },
    permissions::PermissionBits,
};
use super::Engine;

#[derive(Serialize)]
struct Confirmation {
    version: u32,
    actor: ActorId,
}

#[derive(Serialize)]
struct Reminders<'a> {
    version: u32,
    actors: &'a [ActorId],
}

/// Ensure `version` of `subject` exists and was published at some point.
fn ensure_published(subject: &Subject, version: VersionId)
-> Result<(), ReadConfirmationError> {
    let v = subject.history.get(version.number)
        .ok_or(LookupError::VersionNotFound(version))?;

    if v.tag.was_published() {
        Ok(())
    } else {
        Err(ReadConfirmationError::NotPublished(version.number))
    }
}

impl Engine {
    /// Ask `reader` to confirm reading a published version.
    ///
    /// Asking the same actor twice has no effect.
    pub fn assign_read_confirmation(
        &self,
        version: VersionId,
        actor: ActorId,
        reader: ActorId,
    ) -> Result<(), ReadConfirmationError> {
        let held = self.permissions(actor)?;
        self.permissions(reader)?;
        let now = self.now();

        let assigned = self.with_subject(version.subject, |subject| -> Result<_, ReadConfirmationError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)?;
            ensure_published(subject, version)?;
            Ok(subject.confirmations.assign(version.number, reader, now))
        })?;

        if !assigned {
            debug!("Actor {} was already asked to confirm reading {}",
                reader, version);
            return Ok(());
        }

        self.log(actor, "read-confirmations", version.subject, "assign",
            Confirmation { version: version.number, actor: reader });
        self.notify(Some(reader), ReadConfirmationRequested {
            subject: version.subject,
            version: version.number,
        });

        Ok(())
    }

    /// Confirm that `actor` has read a version.
    ///
    /// Confirming again is a no-op.
    pub fn read_confirmation(&self, version: VersionId, actor: ActorId)
    -> Result<Confirmed, ReadConfirmationError> {
        self.permissions(actor)?;
        let now = self.now();

        let confirmed = self.with_subject(version.subject, |subject| -> Result<_, ReadConfirmationError> {
            subject.history.get(version.number)
                .ok_or(LookupError::VersionNotFound(version))?;
            subject.confirmations.confirm(version.number, actor, now)
        })?;

        match confirmed {
            Confirmed::Now => {
                info!("Actor {} confirmed reading {}", actor, version);
                self.log(actor, "read-confirmations", version.subject, "confirm",
                    Confirmation { version: version.number, actor });
            }
            Confirmed::Already => {
                debug!("Actor {} already confirmed reading {}", actor, version);
            }
        }

        Ok(confirmed)
    }

    /// All read confirmation records of a version, ordered by actor.
    pub fn list_read_confirmations(&self, version: VersionId)
    -> Result<Vec<ReadConfirmation>, ReadConfirmationError> {
        self.with_subject(version.subject, |subject| {
            ensure_published(subject, version)?;
            Ok(subject.confirmations.records(version.number).cloned().collect())
        })
    }

    /// Actors who have yet to confirm reading a version.
    pub fn pending_read_confirmations(&self, version: VersionId)
    -> Result<Vec<ActorId>, ReadConfirmationError> {
        self.with_subject(version.subject, |subject| {
            ensure_published(subject, version)?;
            Ok(subject.confirmations.pending(version.number).collect())
        })
    }

    /// Remind everyone who has yet to confirm reading a version.
    ///
    /// Returns the reminded actors; delivery is left to the dispatcher.
    pub fn send_read_confirmation_reminders(&self, version: VersionId)
    -> Result<Vec<ActorId>, ReadConfirmationError> {
        let now = self.now();

        let actors = self.with_subject(version.subject, |subject| -> Result<_, ReadConfirmationError> {
            ensure_published(subject, version)?;
            Ok(subject.confirmations.mark_reminded(version.number, now))
        })?;

        if actors.is_empty() {
            debug!("Everyone has confirmed reading {}", version);
            return Ok(actors);
        }

        info!("Reminding {} actors to confirm reading {}", actors.len(), version);
        self.log(Actor::System, "read-confirmations",
            version.subject, "remind",
            Reminders { version: version.number, actors: &actors });
        self.notify(actors.iter().copied(), ReadConfirmationReminder {
            subject: version.subject,
            version: version.number,
        });

        Ok(actors)
    }
}
