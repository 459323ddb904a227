//! Approval chains.

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    events::{
        ChainRejected,
        Published,
        ReadConfirmationRequested,
        StageAssigned,
    },
    models::{
        ActorId,
        ApprovalError,
        Chain,
        Decision,
        LookupError,
        StageId,
        StageKind,
        Subject,
        Transition,
        VersionId,
        approval,
    },
    permissions::PermissionBits,
};
use super::Engine;

#[derive(Serialize)]
struct Submitted {
    version: u32,
    attempt: u32,
}

#[derive(Serialize)]
struct Withdrawn {
    version: u32,
}

#[derive(Serialize)]
struct Responded<'a> {
    version: u32,
    stage: StageKind,
    decision: Decision,
    admin: bool,
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct Publication {
    version: u32,
    review_due: Option<NaiveDate>,
    read_confirmations: usize,
}

/// Everything needed to report a transition once the subject is unlocked.
struct Outcome {
    transition: Transition,
    submitter: ActorId,
    /// Actors required in the stage the chain moved to.
    next: Vec<ActorId>,
    /// Everyone who was asked to respond in this chain.
    participants: Vec<ActorId>,
    /// Actors asked to confirm reading the published version.
    readers: Vec<ActorId>,
    review_due: Option<NaiveDate>,
}

impl Engine {
    /// Submit the working draft of a subject for approval.
    pub fn submit(&self, version: VersionId, submitter: ActorId)
    -> Result<Chain, ApprovalError> {
        self.permissions(submitter)?;
        let now = self.now();

        let chain = self.with_subject(version.subject, |subject| -> Result<_, ApprovalError> {
            if subject.history.get(version.number).is_none() {
                return Err(LookupError::VersionNotFound(version).into());
            }

            if subject.working != Some(version.number) {
                return Err(ApprovalError::NotDraft);
            }

            approval::submit(subject, submitter, now)
        })?;

        info!("Actor {} submitted {} for approval (attempt {})",
            submitter, version, chain.attempt);
        self.log(submitter, "approvals", version.subject, "submit", Submitted {
            version: version.number,
            attempt: chain.attempt,
        });
        self.notify(
            chain.stage(StageKind::Verification).required.clone(),
            StageAssigned {
                subject: version.subject,
                version: version.number,
                stage: StageKind::Verification,
            },
        );

        Ok(chain)
    }

    /// Respond in a stage as one of its required actors.
    pub fn respond(
        &self,
        stage: StageId,
        actor: ActorId,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<Transition, ApprovalError> {
        self.record_response(stage, actor, decision, reason, false)
    }

    /// Respond in a stage using administrative override.
    ///
    /// An accept completes the stage regardless of outstanding required
    /// actors; a reject aborts the chain like any other.
    pub fn admin_respond(
        &self,
        stage: StageId,
        admin: ActorId,
        decision: Decision,
        reason: Option<String>,
    ) -> Result<Transition, ApprovalError> {
        self.record_response(stage, admin, decision, reason, true)
    }

    fn record_response(
        &self,
        stage: StageId,
        actor: ActorId,
        decision: Decision,
        reason: Option<String>,
        admin: bool,
    ) -> Result<Transition, ApprovalError> {
        let held = self.permissions(actor)?;

        if admin {
            held.require(PermissionBits::ADMIN_OVERRIDE)?;
        }

        let id = stage.version.subject;

        if stage.kind == StageKind::Publication && decision == Decision::Accept {
            self.ensure_references::<ApprovalError>(id)?;
        }

        let now = self.now();
        let today = self.today();
        let cadence = self.settings.default_cadence;
        let logged_reason = reason.clone();

        let outcome = self.with_subject(id, |subject| -> Result<_, ApprovalError> {
            let transition = approval::respond(
                subject, stage, actor, decision, admin, reason, now)?;

            let mut outcome = Outcome {
                transition,
                submitter: 0,
                next: Vec::new(),
                participants: Vec::new(),
                readers: Vec::new(),
                review_due: None,
            };

            if let Some(ref chain) = subject.chain {
                outcome.submitter = chain.submitter;
                outcome.participants = chain.stages.iter()
                    .flat_map(|stage| stage.required.iter().copied())
                    .unique()
                    .collect();

                if let Transition::Advanced { to, .. } = outcome.transition {
                    outcome.next = chain.stage(to).required.clone();
                }
            }

            if outcome.transition == Transition::Published {
                let version = stage.version.number;
                outcome.review_due = match subject.review.renew(cadence, today) {
                    Ok(cycle) => cycle.map(|cycle| cycle.due),
                    Err(err) => {
                        warn!("No review cycle opened for {}: {}", subject.id, err);
                        None
                    }
                };
                outcome.readers = request_read_confirmations(subject, version, now);
            }

            Ok(outcome)
        })?;

        self.report(stage, actor, decision, admin, logged_reason.as_deref(), &outcome);

        Ok(outcome.transition)
    }

    fn report(
        &self,
        stage: StageId,
        actor: ActorId,
        decision: Decision,
        admin: bool,
        reason: Option<&str>,
        outcome: &Outcome,
    ) {
        let id = stage.version.subject;
        let version = stage.version.number;

        if admin {
            warn!("Actor {} used administrative override to {:?} {} in {} stage",
                actor, decision, stage.version, stage.kind);
        }

        self.log(actor, "approvals", id, "respond", Responded {
            version,
            stage: stage.kind,
            decision,
            admin,
            reason,
        });

        match outcome.transition {
            Transition::Recorded { ref outstanding, .. } => {
                debug!("{} stage of {} waits for {:?}",
                    stage.kind, stage.version, outstanding);
            }
            Transition::Advanced { from, to } => {
                info!("{} moved from {} to {} stage", stage.version, from, to);
                self.notify(outcome.next.iter().copied(), StageAssigned {
                    subject: id,
                    version,
                    stage: to,
                });
            }
            Transition::Rejected { stage: kind, by, ref reason } => {
                info!("{} was rejected in {} stage by actor {}",
                    stage.version, kind, by);
                self.log(actor, "approvals", id, "reject", Responded {
                    version,
                    stage: kind,
                    decision,
                    admin,
                    reason: reason.as_deref(),
                });
                self.notify(
                    std::iter::once(outcome.submitter)
                        .chain(outcome.participants.iter().copied())
                        .filter(|&user| user != by)
                        .unique(),
                    ChainRejected {
                        subject: id,
                        version,
                        stage: kind,
                        by,
                        reason: reason.clone(),
                    },
                );
            }
            Transition::Published => {
                info!("{} was published", stage.version);
                self.log(actor, "approvals", id, "publish", Publication {
                    version,
                    review_due: outcome.review_due,
                    read_confirmations: outcome.readers.len(),
                });
                self.notify(
                    std::iter::once(outcome.submitter)
                        .chain(outcome.participants.iter().copied())
                        .unique(),
                    Published { subject: id, version },
                );
                self.notify(
                    outcome.readers.iter().copied(),
                    ReadConfirmationRequested { subject: id, version },
                );
            }
        }
    }

    /// Cancel the running approval chain of a subject.
    ///
    /// Only the submitter and administrators may do this. The version returns
    /// to draft and the subject's lock is released.
    pub fn withdraw(&self, id: Uuid, actor: ActorId) -> Result<u32, ApprovalError> {
        let can_override = self.can_override(actor)?;

        let version = self.with_subject(id, |subject| {
            approval::withdraw(subject, actor, can_override)
        })?;

        info!("Actor {} withdrew version {} of {} from approval",
            actor, version, id);
        self.log(actor, "approvals", id, "withdraw", Withdrawn { version });

        Ok(version)
    }
}

/// Ask every viewer of a subject to confirm reading a newly published
/// version. Returns actors who were asked.
fn request_read_confirmations(
    subject: &mut Subject,
    version: u32,
    now: DateTime<Utc>,
) -> Vec<ActorId> {
    let viewers = subject.assignments.viewers.clone();

    viewers.into_iter()
        .filter(|&viewer| subject.confirmations.assign(version, viewer, now))
        .collect()
}
