//! Approval chains.
//!
//! Once submitted, a version goes through three stages: verification,
//! approval, and publication. Each stage has a fixed set of required actors,
//! taken from the subject's assignments at the moment of submission. A stage
//! completes when all of them accept, or when an administrator accepts on
//! their behalf. Any rejection aborts the whole chain and returns the version
//! to draft; a later submission starts over with no responses recorded.

use chrono::{DateTime, Utc};
use failure::Fail;
use lifecycle_macros::From;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{error::ApiError, permissions::RequirePermissionsError};
use super::{
    ActorId,
    LookupError,
    VersionId,
    lock,
    reference::BrokenReferenceError,
    subject::{Role, Subject},
    version::Tag,
};

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Verification,
    Approval,
    Publication,
}

impl StageKind {
    /// All stages, in the order a version goes through them.
    pub const ALL: [StageKind; 3] = [
        StageKind::Verification,
        StageKind::Approval,
        StageKind::Publication,
    ];

    pub fn next(self) -> Option<StageKind> {
        match self {
            StageKind::Verification => Some(StageKind::Approval),
            StageKind::Approval => Some(StageKind::Publication),
            StageKind::Publication => None,
        }
    }

    /// Role whose members are required to respond in this stage.
    pub fn role(self) -> Role {
        match self {
            StageKind::Verification => Role::Verifier,
            StageKind::Approval => Role::Approver,
            StageKind::Publication => Role::Publisher,
        }
    }

    /// Tag of a version waiting in this stage.
    pub fn tag(self) -> Tag {
        match self {
            StageKind::Verification => Tag::PendingVerification,
            StageKind::Approval => Tag::PendingApproval,
            StageKind::Publication => Tag::PendingPublication,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            StageKind::Verification => "verification",
            StageKind::Approval => "approval",
            StageKind::Publication => "publication",
        })
    }
}

/// Identifies a stage of the approval chain of a particular version.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StageId {
    pub version: VersionId,
    pub kind: StageKind,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Response {
    pub actor: ActorId,
    pub decision: Decision,
    pub at: DateTime<Utc>,
    /// Response was given using administrative override.
    pub admin: bool,
    /// Free-form justification, stored but not interpreted.
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Stage {
    pub kind: StageKind,
    pub required: Vec<ActorId>,
    pub responses: Vec<Response>,
}

impl Stage {
    pub fn response_of(&self, actor: ActorId) -> Option<&Response> {
        self.responses.iter().find(|r| r.actor == actor)
    }

    fn accepted_by(&self, actor: ActorId) -> bool {
        self.response_of(actor)
            .map_or(false, |r| r.decision == Decision::Accept)
    }

    pub fn is_complete(&self) -> bool {
        self.responses.iter()
            .any(|r| r.admin && r.decision == Decision::Accept)
        || self.required.iter().all(|&actor| self.accepted_by(actor))
    }

    /// Required actors who have not accepted yet.
    pub fn outstanding(&self) -> Vec<ActorId> {
        self.required.iter()
            .copied()
            .filter(|&actor| !self.accepted_by(actor))
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainState {
    /// Waiting for responses in a stage.
    Pending(StageKind),
    Published,
    Rejected {
        stage: StageKind,
        by: ActorId,
        reason: Option<String>,
        admin: bool,
    },
    Withdrawn,
}

/// One attempt at getting a version through approval.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Chain {
    pub version: u32,
    /// How many times this version was submitted, including this time.
    pub attempt: u32,
    pub submitter: ActorId,
    pub submitted: DateTime<Utc>,
    pub state: ChainState,
    pub stages: Vec<Stage>,
}

impl Chain {
    pub fn is_pending(&self) -> bool {
        self.current().is_some()
    }

    /// Stage currently waiting for responses.
    pub fn current(&self) -> Option<StageKind> {
        match self.state {
            ChainState::Pending(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn stage(&self, kind: StageKind) -> &Stage {
        &self.stages[kind.index()]
    }

    fn stage_mut(&mut self, kind: StageKind) -> &mut Stage {
        &mut self.stages[kind.index()]
    }

    /// Discard all responses recorded in this attempt.
    fn discard_responses(&mut self) {
        for stage in &mut self.stages {
            stage.responses.clear();
        }
    }
}

/// Result of recording a response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Response was recorded, stage is still waiting for others.
    Recorded {
        stage: StageKind,
        outstanding: Vec<ActorId>,
    },
    /// Stage completed and the chain moved on to the next one.
    Advanced {
        from: StageKind,
        to: StageKind,
    },
    /// Publication stage completed and the version is now published.
    Published,
    /// Chain was aborted and the version returned to draft.
    Rejected {
        stage: StageKind,
        by: ActorId,
        reason: Option<String>,
    },
}

/// Start an approval chain for the working draft of a subject.
pub fn submit(subject: &mut Subject, submitter: ActorId, now: DateTime<Utc>)
-> Result<Chain, ApprovalError> {
    if !subject.is_active() {
        return Err(ApprovalError::SubjectDeactivated);
    }

    if let Some(holder) = lock::foreign_holder(&subject.lock, submitter) {
        return Err(ApprovalError::AlreadyLocked { holder });
    }

    let version = match subject.working_version() {
        Some(v) if v.tag == Tag::Draft => v.number,
        Some(v) => return Err(ApprovalError::ApprovalInProgress(v.number)),
        None => return Err(ApprovalError::NotDraft),
    };

    let assignments = &subject.assignments;

    if assignments.verifiers.is_empty() {
        return Err(ApprovalError::NoVerifiersAssigned);
    }
    if assignments.approvers.is_empty() {
        return Err(ApprovalError::NoApproversAssigned);
    }
    if assignments.publishers.is_empty() {
        return Err(ApprovalError::NoPublisherAssigned);
    }

    let stages = StageKind::ALL.iter()
        .map(|&kind| Stage {
            kind,
            required: assignments.members(kind.role()).to_vec(),
            responses: Vec::new(),
        })
        .collect();

    let attempt = match subject.chain {
        Some(ref chain) if chain.version == version => chain.attempt + 1,
        _ => 1,
    };

    let chain = Chain {
        version,
        attempt,
        submitter,
        submitted: now,
        state: ChainState::Pending(StageKind::Verification),
        stages,
    };

    subject.history.retag(version, Tag::PendingVerification);
    subject.chain = Some(chain.clone());

    Ok(chain)
}

/// Record a response in a stage of the running approval chain.
///
/// `admin` marks a response given with administrative override: it doesn't
/// require the actor to be assigned to the stage, and an accepting admin
/// response completes the stage regardless of other required actors. Callers
/// must verify the actor's capability before setting it.
pub fn respond(
    subject: &mut Subject,
    stage: StageId,
    actor: ActorId,
    decision: Decision,
    admin: bool,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition, ApprovalError> {
    let version = stage.version.number;

    let chain = match subject.chain {
        Some(ref mut chain) if chain.version == version && chain.is_pending() =>
            chain,
        _ => return Err(ApprovalError::NoActiveChain(version)),
    };

    let current = match chain.current() {
        Some(current) if current == stage.kind => current,
        Some(current) => return Err(ApprovalError::NotCurrentStage {
            requested: stage.kind,
            current,
        }),
        None => return Err(ApprovalError::NoActiveChain(version)),
    };

    let record = chain.stage_mut(current);

    if !admin && !record.required.contains(&actor) {
        return Err(ApprovalError::NotStageMember { actor, stage: current });
    }

    if record.response_of(actor).is_some() {
        return Err(ApprovalError::DuplicateResponse { actor, stage: current });
    }

    record.responses.push(Response {
        actor,
        decision,
        at: now,
        admin,
        reason: reason.clone(),
    });

    if decision == Decision::Reject {
        chain.state = ChainState::Rejected {
            stage: current,
            by: actor,
            reason: reason.clone(),
            admin,
        };
        chain.discard_responses();
        subject.history.retag(version, Tag::Draft);

        return Ok(Transition::Rejected { stage: current, by: actor, reason });
    }

    if !record.is_complete() {
        return Ok(Transition::Recorded {
            stage: current,
            outstanding: record.outstanding(),
        });
    }

    match current.next() {
        Some(next) => {
            chain.state = ChainState::Pending(next);
            subject.history.retag(version, next.tag());
            Ok(Transition::Advanced { from: current, to: next })
        }
        None => {
            chain.state = ChainState::Published;
            publish(subject, version);
            Ok(Transition::Published)
        }
    }
}

/// Cancel the running approval chain.
///
/// The version returns to draft and the subject's lock is released.
pub fn withdraw(subject: &mut Subject, actor: ActorId, can_override: bool)
-> Result<u32, ApprovalError> {
    let chain = match subject.chain {
        Some(ref mut chain) if chain.is_pending() => chain,
        _ => return Err(ApprovalError::NoActiveChain(
            subject.working.unwrap_or(0))),
    };

    if chain.submitter != actor && !can_override {
        return Err(ApprovalError::NotSubmitter);
    }

    chain.state = ChainState::Withdrawn;
    chain.discard_responses();

    let version = chain.version;
    subject.history.retag(version, Tag::Draft);
    subject.lock = None;

    Ok(version)
}

/// Put a version in force, retiring the previously published one.
fn publish(subject: &mut Subject, version: u32) {
    if let Some(previous) = subject.published.take() {
        subject.history.retag(previous, Tag::Historical);
    }

    subject.history.retag(version, Tag::Published);
    subject.published = Some(version);
    subject.working = None;
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ApprovalError {
    #[fail(display = "{}", _0)]
    Lookup(#[cause] #[from] LookupError),
    #[fail(display = "{}", _0)]
    Permissions(#[cause] #[from] RequirePermissionsError),
    #[fail(display = "{}", _0)]
    BrokenReference(#[cause] #[from] BrokenReferenceError),
    #[api(code = "approval:subject-deactivated")]
    #[fail(display = "Subject is deactivated")]
    SubjectDeactivated,
    /// Chains can't be started while someone other than the submitter holds
    /// the subject's lock.
    #[api(code = "approval:submit:already-locked")]
    #[fail(display = "Subject is locked by actor {}", holder)]
    AlreadyLocked {
        holder: ActorId,
    },
    #[api(code = "approval:submit:not-draft")]
    #[fail(display = "Subject has no draft to submit")]
    NotDraft,
    #[api(code = "approval:submit:in-progress")]
    #[fail(display = "Version {} is already going through approval", _0)]
    ApprovalInProgress(u32),
    #[api(code = "approval:submit:no-verifiers")]
    #[fail(display = "No verifiers are assigned to this subject")]
    NoVerifiersAssigned,
    #[api(code = "approval:submit:no-approvers")]
    #[fail(display = "No approvers are assigned to this subject")]
    NoApproversAssigned,
    #[api(code = "approval:submit:no-publisher")]
    #[fail(display = "No publisher is assigned to this subject")]
    NoPublisherAssigned,
    #[api(code = "approval:no-active-chain")]
    #[fail(display = "Version {} is not going through approval", _0)]
    NoActiveChain(u32),
    #[api(code = "approval:respond:not-current-stage")]
    #[fail(display = "Cannot respond in {} stage, chain is in {} stage",
        requested, current)]
    NotCurrentStage {
        requested: StageKind,
        current: StageKind,
    },
    #[api(code = "approval:respond:not-member")]
    #[fail(display = "Actor {} is not required in {} stage", actor, stage)]
    NotStageMember {
        actor: ActorId,
        stage: StageKind,
    },
    #[api(code = "approval:respond:duplicate")]
    #[fail(display = "Actor {} already responded in {} stage", actor, stage)]
    DuplicateResponse {
        actor: ActorId,
        stage: StageKind,
    },
    #[api(code = "approval:withdraw:not-submitter")]
    #[fail(display = "Only the submitter may withdraw an approval chain")]
    NotSubmitter,
}
