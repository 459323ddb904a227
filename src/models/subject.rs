//! Subjects: graphs and documents under lifecycle control.

use chrono::{DateTime, Utc};
use failure::Fail;
use lifecycle_macros::From;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    permissions::{PermissionBits, RequirePermissionsError},
};
use super::{
    ActorId,
    LookupError,
    approval::{Chain, ChainState},
    lock::Lock,
    read_confirmation::ReadConfirmations,
    review::Review,
    version::{History, Tag, Version},
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectKind {
    /// A process diagram.
    Graph,
    Document,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectState {
    Active,
    /// Subject was withdrawn from use. Subjects referencing it are considered
    /// to have a broken reference.
    Deactivated,
}

/// Role an actor can be assigned to on a subject.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Verifier,
    Approver,
    Publisher,
    /// Actors expected to confirm they have read each published version.
    Viewer,
}

/// Actors assigned to a subject, by role, in assignment order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Assignments {
    pub verifiers: Vec<ActorId>,
    pub approvers: Vec<ActorId>,
    pub publishers: Vec<ActorId>,
    pub viewers: Vec<ActorId>,
}

impl Assignments {
    pub fn members(&self, role: Role) -> &[ActorId] {
        match role {
            Role::Verifier => &self.verifiers,
            Role::Approver => &self.approvers,
            Role::Publisher => &self.publishers,
            Role::Viewer => &self.viewers,
        }
    }

    fn members_mut(&mut self, role: Role) -> &mut Vec<ActorId> {
        match role {
            Role::Verifier => &mut self.verifiers,
            Role::Approver => &mut self.approvers,
            Role::Publisher => &mut self.publishers,
            Role::Viewer => &mut self.viewers,
        }
    }

    /// Assign an actor to a role. Returns `false` if they already were.
    pub fn assign(&mut self, role: Role, actor: ActorId) -> bool {
        let members = self.members_mut(role);

        if members.contains(&actor) {
            false
        } else {
            members.push(actor);
            true
        }
    }

    /// Remove an actor from a role. Returns `false` if they weren't assigned.
    pub fn unassign(&mut self, role: Role, actor: ActorId) -> bool {
        let members = self.members_mut(role);
        let before = members.len();
        members.retain(|&a| a != actor);
        members.len() != before
    }
}

/// Complete lifecycle state of a single subject.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Subject {
    pub id: Uuid,
    pub kind: SubjectKind,
    pub title: String,
    /// Directory this subject is filed under.
    pub directory: Option<i32>,
    pub owner: ActorId,
    pub created: DateTime<Utc>,
    pub state: SubjectState,
    /// Other subjects may link to this one as a reference.
    pub reference: bool,
    /// Reference subjects this one depends on.
    pub references: Vec<Uuid>,
    pub assignments: Assignments,
    pub lock: Option<Lock>,
    pub history: History,
    /// Version currently being drafted or approved.
    pub working: Option<u32>,
    /// Version currently in force.
    pub published: Option<u32>,
    /// Latest approval chain, if one was ever started.
    pub chain: Option<Chain>,
    pub review: Review,
    pub confirmations: ReadConfirmations,
}

impl Subject {
    pub fn new(
        id: Uuid,
        kind: SubjectKind,
        title: &str,
        directory: Option<i32>,
        owner: ActorId,
        now: DateTime<Utc>,
    ) -> Subject {
        Subject {
            id,
            kind,
            title: title.to_string(),
            directory,
            owner,
            created: now,
            state: SubjectState::Active,
            reference: false,
            references: Vec::new(),
            assignments: Assignments::default(),
            lock: None,
            history: History::default(),
            working: None,
            published: None,
            chain: None,
            review: Review::default(),
            confirmations: ReadConfirmations::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SubjectState::Active
    }

    pub fn working_version(&self) -> Option<&Version> {
        self.working.and_then(|n| self.history.get(n))
    }

    pub fn published_version(&self) -> Option<&Version> {
        self.published.and_then(|n| self.history.get(n))
    }

    /// Is an approval chain running for this subject?
    pub fn has_pending_chain(&self) -> bool {
        match self.chain {
            Some(ref chain) => chain.is_pending(),
            None => false,
        }
    }

    /// Lifecycle state of this subject as a whole.
    pub fn lifecycle(&self) -> Lifecycle {
        if let Some(ref chain) = self.chain {
            if self.working == Some(chain.version) {
                match chain.state {
                    ChainState::Pending(_) => return Lifecycle::Pending,
                    ChainState::Rejected { .. } => return Lifecycle::Rejected,
                    ChainState::Withdrawn => return Lifecycle::Withdrawn,
                    ChainState::Published => (),
                }
            }
        }

        match self.working_version() {
            Some(v) if v.tag == Tag::Draft => Lifecycle::Draft,
            _ if self.published.is_some() => Lifecycle::Published,
            _ => Lifecycle::New,
        }
    }

    /// Is `actor` the owner of this subject, or do they hold `permissions`?
    pub(crate) fn authorize(
        &self,
        actor: ActorId,
        held: PermissionBits,
        required: PermissionBits,
    ) -> Result<(), RequirePermissionsError> {
        if actor == self.owner {
            Ok(())
        } else {
            held.require(required)
        }
    }
}

/// Coarse lifecycle state of a subject.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    /// Nothing was drafted yet.
    New,
    Draft,
    /// Working version is going through approval.
    Pending,
    /// Last approval chain of the working version was rejected; the version
    /// is a draft again.
    Rejected,
    /// Last approval chain of the working version was withdrawn; the version
    /// is a draft again.
    Withdrawn,
    /// No work in progress, a version is in force.
    Published,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum SubjectError {
    #[fail(display = "{}", _0)]
    Lookup(#[cause] #[from] LookupError),
    #[fail(display = "{}", _0)]
    Permissions(#[cause] #[from] RequirePermissionsError),
    #[api(code = "subject:already-locked")]
    #[fail(display = "Subject is locked by actor {}", holder)]
    AlreadyLocked {
        holder: ActorId,
    },
    /// Only subjects flagged as references may be linked to.
    #[api(code = "subject:reference:not-reference")]
    #[fail(display = "Subject {} is not a reference subject", _0)]
    NotReferenceSubject(Uuid),
    #[api(code = "subject:reference:self")]
    #[fail(display = "A subject cannot reference itself")]
    SelfReference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_keep_order_and_reject_duplicates() {
        let mut a = Assignments::default();

        assert!(a.assign(Role::Verifier, 3));
        assert!(a.assign(Role::Verifier, 1));
        assert!(!a.assign(Role::Verifier, 3));
        assert_eq!(a.members(Role::Verifier), [3, 1]);
        assert!(a.members(Role::Approver).is_empty());

        assert!(a.unassign(Role::Verifier, 3));
        assert!(!a.unassign(Role::Verifier, 3));
        assert_eq!(a.members(Role::Verifier), [1]);
    }

    #[test]
    fn new_subject_is_new() {
        let s = Subject::new(
            Uuid::new_v4(), SubjectKind::Document, "Doc", Some(4), 1, Utc::now());
        assert_eq!(s.lifecycle(), Lifecycle::New);
        assert!(s.is_active());
        assert!(!s.has_pending_chain());
    }
}
