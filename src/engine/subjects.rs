//! Subject registry and role assignments.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::{
    models::{
        ActorId,
        LookupError,
        Role,
        Subject,
        SubjectError,
        SubjectKind,
        SubjectState,
        lock,
    },
    permissions::PermissionBits,
};
use super::Engine;

#[derive(Serialize)]
struct Created<'a> {
    kind: SubjectKind,
    title: &'a str,
    directory: Option<i32>,
}

#[derive(Serialize)]
struct Assigned {
    role: Role,
    actor: ActorId,
}

#[derive(Serialize)]
struct Linked {
    target: Uuid,
}

impl Engine {
    /// Register a new subject owned by `owner`.
    pub fn create_subject(
        &self,
        kind: SubjectKind,
        title: &str,
        directory: Option<i32>,
        owner: ActorId,
    ) -> Result<Subject, SubjectError> {
        self.permissions(owner)?;

        let subject = Subject::new(
            Uuid::new_v4(), kind, title, directory, owner, self.now());
        let id = subject.id;

        self.subjects.insert(id, Arc::new(Mutex::new(subject.clone())));

        info!("Created {:?} {} ({:?}) for actor {}", kind, id, title, owner);
        self.log(owner, "subjects", id, "create", Created {
            kind,
            title,
            directory,
        });

        Ok(subject)
    }

    /// Current state of a subject.
    pub fn get_subject(&self, id: Uuid) -> Result<Subject, LookupError> {
        self.read_subject(id, Subject::clone)
    }

    /// IDs of all registered subjects.
    pub fn subject_ids(&self) -> Vec<Uuid> {
        let mut ids = self.subjects.iter()
            .map(|entry| *entry.key())
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Remove a subject altogether.
    ///
    /// Only the owner and actors allowed to manage subjects may do this, and
    /// only while nobody else holds the subject's lock.
    pub fn delete_subject(&self, id: Uuid, actor: ActorId)
    -> Result<(), SubjectError> {
        let held = self.permissions(actor)?;
        let mut result = Err(SubjectError::Lookup(LookupError::SubjectNotFound(id)));

        // The subject's mutex is taken while the map entry is locked for
        // writing, so no new handle to it can be obtained until it's gone.
        self.subjects.remove_if(&id, |_, handle| {
            let subject = handle.lock().unwrap_or_else(PoisonError::into_inner);

            result = subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)
                .map_err(SubjectError::from)
                .and_then(|_| match lock::foreign_holder(&subject.lock, actor) {
                    Some(holder) => Err(SubjectError::AlreadyLocked { holder }),
                    None => Ok(()),
                });

            result.is_ok()
        });

        result?;

        info!("Deleted subject {}", id);
        self.log(actor, "subjects", id, "delete", ());

        Ok(())
    }

    /// Withdraw a subject from use. Subjects referencing it will report a
    /// broken reference.
    pub fn deactivate(&self, id: Uuid, actor: ActorId) -> Result<(), SubjectError> {
        self.set_state(id, actor, SubjectState::Deactivated)
    }

    pub fn activate(&self, id: Uuid, actor: ActorId) -> Result<(), SubjectError> {
        self.set_state(id, actor, SubjectState::Active)
    }

    fn set_state(&self, id: Uuid, actor: ActorId, state: SubjectState)
    -> Result<(), SubjectError> {
        let held = self.permissions(actor)?;

        let changed = self.with_subject(id, |subject| -> Result<_, SubjectError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)?;

            if subject.state == state {
                return Ok(false);
            }

            subject.state = state;
            Ok(true)
        })?;

        if !changed {
            debug!("Subject {} is already {:?}", id, state);
            return Ok(());
        }

        info!("Subject {} is now {:?}", id, state);
        self.log(actor, "subjects", id, "set-state", state);

        Ok(())
    }

    /// Mark or unmark a subject as one other subjects may reference.
    pub fn set_reference_flag(&self, id: Uuid, actor: ActorId, reference: bool)
    -> Result<(), SubjectError> {
        let held = self.permissions(actor)?;

        self.with_subject(id, |subject| -> Result<_, SubjectError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)?;
            subject.reference = reference;
            Ok(())
        })?;

        self.log(actor, "subjects", id, "set-reference", reference);

        Ok(())
    }

    /// Record that a subject depends on a reference subject.
    pub fn link_reference(&self, id: Uuid, actor: ActorId, target: Uuid)
    -> Result<(), SubjectError> {
        if id == target {
            return Err(SubjectError::SelfReference);
        }

        let held = self.permissions(actor)?;

        if !self.read_subject(target, |t| t.reference)? {
            return Err(SubjectError::NotReferenceSubject(target));
        }

        let added = self.with_subject(id, |subject| -> Result<_, SubjectError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)?;

            if subject.references.contains(&target) {
                Ok(false)
            } else {
                subject.references.push(target);
                Ok(true)
            }
        })?;

        if added {
            self.log(actor, "subjects", id, "link-reference", Linked { target });
        }

        Ok(())
    }

    pub fn unlink_reference(&self, id: Uuid, actor: ActorId, target: Uuid)
    -> Result<(), SubjectError> {
        let held = self.permissions(actor)?;

        let removed = self.with_subject(id, |subject| -> Result<_, SubjectError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)?;

            let before = subject.references.len();
            subject.references.retain(|&r| r != target);
            Ok(subject.references.len() != before)
        })?;

        if removed {
            self.log(actor, "subjects", id, "unlink-reference", Linked { target });
        }

        Ok(())
    }

    /// Assign `member` to a role on a subject.
    ///
    /// Approval chains which are already running are not affected.
    pub fn assign(&self, id: Uuid, actor: ActorId, role: Role, member: ActorId)
    -> Result<(), SubjectError> {
        self.change_assignment(id, actor, role, member, true)
    }

    pub fn unassign(&self, id: Uuid, actor: ActorId, role: Role, member: ActorId)
    -> Result<(), SubjectError> {
        self.change_assignment(id, actor, role, member, false)
    }

    pub fn assign_verifier(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.assign(id, actor, Role::Verifier, member)
    }

    pub fn unassign_verifier(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.unassign(id, actor, Role::Verifier, member)
    }

    pub fn assign_approver(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.assign(id, actor, Role::Approver, member)
    }

    pub fn unassign_approver(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.unassign(id, actor, Role::Approver, member)
    }

    pub fn assign_publisher(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.assign(id, actor, Role::Publisher, member)
    }

    pub fn unassign_publisher(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.unassign(id, actor, Role::Publisher, member)
    }

    pub fn assign_viewer(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.assign(id, actor, Role::Viewer, member)
    }

    pub fn unassign_viewer(&self, id: Uuid, actor: ActorId, member: ActorId)
    -> Result<(), SubjectError> {
        self.unassign(id, actor, Role::Viewer, member)
    }

    fn change_assignment(
        &self,
        id: Uuid,
        actor: ActorId,
        role: Role,
        member: ActorId,
        assign: bool,
    ) -> Result<(), SubjectError> {
        let held = self.permissions(actor)?;
        self.permissions(member)?;

        let changed = self.with_subject(id, |subject| -> Result<_, SubjectError> {
            subject.authorize(actor, held, PermissionBits::MANAGE_SUBJECTS)?;

            Ok(if assign {
                subject.assignments.assign(role, member)
            } else {
                subject.assignments.unassign(role, member)
            })
        })?;

        if !changed {
            debug!("Actor {} assignment as {:?} on {} unchanged", member, role, id);
            return Ok(());
        }

        let kind = if assign { "assign" } else { "unassign" };
        self.log(actor, "subjects", id, kind, Assigned { role, actor: member });

        Ok(())
    }
}
