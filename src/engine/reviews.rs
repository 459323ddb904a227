//! Periodic reviews.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::PoisonError;
use uuid::Uuid;

use crate::{
    audit::Actor,
    events::ReviewDue,
    models::{ActorId, Cadence, ReviewCycle, ReviewError, Subject},
    permissions::PermissionBits,
};
use super::{Engine, Handle};

#[derive(Serialize)]
struct Scheduled {
    number: u32,
    due: NaiveDate,
    cadence: Cadence,
}

impl<'a> From<&'a ReviewCycle> for Scheduled {
    fn from(cycle: &'a ReviewCycle) -> Self {
        Scheduled {
            number: cycle.number,
            due: cycle.due,
            cadence: cycle.cadence,
        }
    }
}

#[derive(Serialize)]
struct Reminded {
    due: NaiveDate,
}

/// A subject whose review is coming due.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DueReview {
    pub subject: Uuid,
    pub title: String,
    pub owner: ActorId,
    pub due: NaiveDate,
}

/// Subjects due for a review reminder on a given day.
///
/// The set of subjects is fixed when the sequence is created; whether each is
/// due is only decided when the sequence reaches it, so a subject reminded in
/// the meantime is skipped. The sequence can be restarted from the beginning
/// with [`DueForReminder::restart`].
#[derive(Clone)]
pub struct DueForReminder {
    today: NaiveDate,
    subjects: Vec<(Uuid, Handle)>,
    next: usize,
}

impl DueForReminder {
    pub fn restart(&mut self) {
        self.next = 0;
    }
}

impl Iterator for DueForReminder {
    type Item = DueReview;

    fn next(&mut self) -> Option<DueReview> {
        while let Some((id, handle)) = self.subjects.get(self.next) {
            self.next += 1;

            let subject = handle.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(due) = due_for_reminder(&subject, self.today) {
                return Some(DueReview {
                    subject: *id,
                    title: subject.title.clone(),
                    owner: subject.owner,
                    due,
                });
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.subjects.len() - self.next))
    }
}

/// Due date of a subject's review, if a reminder should be sent for it today.
fn due_for_reminder(subject: &Subject, today: NaiveDate) -> Option<NaiveDate> {
    if subject.is_active() && subject.review.is_due_for_reminder(today) {
        subject.review.current.as_ref().map(|cycle| cycle.due)
    } else {
        None
    }
}

impl Engine {
    /// Start a new review cycle for a published subject.
    pub fn schedule_review(
        &self,
        id: Uuid,
        actor: ActorId,
        due: NaiveDate,
        cadence: Cadence,
    ) -> Result<ReviewCycle, ReviewError> {
        let held = self.permissions(actor)?;
        let today = self.today();

        let cycle = self.with_subject(id, |subject| -> Result<_, ReviewError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_REVIEWS)?;

            if subject.published.is_none() {
                return Err(ReviewError::NotPublished);
            }

            subject.review.schedule(due, cadence, today).map(Clone::clone)
        })?;

        info!("Review {} of {} scheduled for {}", cycle.number, id, due);
        self.log(actor, "reviews", id, "schedule", Scheduled::from(&cycle));

        Ok(cycle)
    }

    /// Move the due date of the open review cycle.
    pub fn update_review_date(&self, id: Uuid, actor: ActorId, due: NaiveDate)
    -> Result<ReviewCycle, ReviewError> {
        let held = self.permissions(actor)?;

        let cycle = self.with_subject(id, |subject| -> Result<_, ReviewError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_REVIEWS)?;
            subject.review.reschedule(due).map(Clone::clone)
        })?;

        info!("Review {} of {} moved to {}", cycle.number, id, due);
        self.log(actor, "reviews", id, "reschedule", Scheduled::from(&cycle));

        Ok(cycle)
    }

    /// Change how often a subject is reviewed, and how early its owner is
    /// reminded.
    pub fn update_review_reminder(&self, id: Uuid, actor: ActorId, cadence: Cadence)
    -> Result<(), ReviewError> {
        let held = self.permissions(actor)?;

        self.with_subject(id, |subject| -> Result<_, ReviewError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_REVIEWS)?;
            subject.review.update_cadence(cadence)
        })?;

        self.log(actor, "reviews", id, "update-cadence", cadence);

        Ok(())
    }

    /// Enable or disable reviews of a subject.
    ///
    /// Disabling closes the open cycle. Enabling reviews of a published subject
    /// opens a new one.
    pub fn toggle_review(&self, id: Uuid, actor: ActorId, enabled: bool)
    -> Result<Option<ReviewCycle>, ReviewError> {
        let held = self.permissions(actor)?;
        let today = self.today();
        let cadence = self.settings.default_cadence;

        let cycle = self.with_subject(id, |subject| -> Result<_, ReviewError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_REVIEWS)?;

            if enabled {
                let published = subject.published.is_some();
                subject.review.enable(cadence, today, published).map(|c| c.cloned())
            } else {
                subject.review.disable(today);
                Ok(None)
            }
        })?;

        info!("Reviews of {} {}", id, if enabled { "enabled" } else { "disabled" });
        self.log(actor, "reviews", id, "toggle", enabled);

        Ok(cycle)
    }

    /// Record that a subject was reviewed, and open the next cycle.
    pub fn complete_review(&self, id: Uuid, actor: ActorId)
    -> Result<ReviewCycle, ReviewError> {
        let held = self.permissions(actor)?;
        let today = self.today();

        let cycle = self.with_subject(id, |subject| -> Result<_, ReviewError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_REVIEWS)?;
            subject.review.complete(actor, today).map(Clone::clone)
        })?;

        info!("Review of {} completed by actor {}, next due {}",
            id, actor, cycle.due);
        self.log(actor, "reviews", id, "complete", Scheduled::from(&cycle));

        Ok(cycle)
    }

    /// Subjects whose review reminder falls on or before `today`, and for
    /// which no reminder was sent yet in the current cycle.
    pub fn due_for_reminder(&self, today: NaiveDate) -> DueForReminder {
        let mut subjects = self.handles();
        subjects.sort_by_key(|&(id, _)| id);

        DueForReminder {
            today,
            subjects,
            next: 0,
        }
    }

    /// Remind owners of every subject due for a review reminder today.
    /// Returns the reminded subjects.
    pub fn send_review_reminders(&self) -> Vec<DueReview> {
        let now = self.now();
        let today = self.today();
        let mut reminded = Vec::new();

        for due in self.due_for_reminder(today) {
            // Another caller may have sent the reminder since it was listed.
            let marked = self.with_subject(due.subject, |subject| {
                Ok::<_, ReviewError>(due_for_reminder(subject, today).is_some()
                    && subject.review.mark_reminded(now))
            });

            match marked {
                Ok(true) => (),
                Ok(false) => continue,
                Err(err) => {
                    debug!("Skipping review reminder for {}: {}", due.subject, err);
                    continue;
                }
            }

            info!("Reminding actor {} of review of {} due {}",
                due.owner, due.subject, due.due);
            self.log(Actor::System, "reviews", due.subject, "remind",
                Reminded { due: due.due });
            self.notify(Some(due.owner), ReviewDue {
                subject: due.subject,
                due: due.due,
            });

            reminded.push(due);
        }

        reminded
    }
}
