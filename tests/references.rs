//! Tests for references between subjects.

use failure::Fallible;
use lifecycle::models::{
    ApprovalError,
    Decision,
    StageKind,
    SubjectError,
    SubjectKind,
    Tag,
    Transition,
    VersionError,
};
use uuid::Uuid;

mod common;

use self::common::*;

/// Create a reference subject owned by [`OWNER`].
fn reference(env: &Env) -> Fallible<Uuid> {
    let id = env.engine
        .create_subject(SubjectKind::Document, "Glossary", None, OWNER)?.id;
    env.engine.set_reference_flag(id, OWNER, true)?;
    Ok(id)
}

#[lifecycle::test]
fn only_reference_subjects_are_linked(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let plain = env.engine
        .create_subject(SubjectKind::Document, "Notes", None, OWNER)?.id;

    assert!(matches!(
        env.engine.link_reference(id, OWNER, plain),
        Err(SubjectError::NotReferenceSubject(target)) if target == plain));
    assert!(matches!(
        env.engine.link_reference(id, OWNER, id),
        Err(SubjectError::SelfReference)));

    let glossary = reference(&env)?;
    assert!(matches!(
        env.engine.link_reference(id, VIEWER1, glossary),
        Err(SubjectError::Permissions(_))));

    env.engine.link_reference(id, OWNER, glossary)?;
    env.engine.link_reference(id, OWNER, glossary)?;
    assert_eq!(env.engine.get_subject(id)?.references, [glossary]);

    env.engine.unlink_reference(id, OWNER, glossary)?;
    assert!(env.engine.get_subject(id)?.references.is_empty());

    Ok(())
}

#[lifecycle::test]
fn check_reports_every_broken_reference(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let glossary = reference(&env)?;
    let policy = reference(&env)?;
    let terms = reference(&env)?;

    for &target in &[glossary, policy, terms] {
        env.engine.link_reference(id, OWNER, target)?;
    }

    let report = env.engine.check_reference(id)?;
    assert!(report.is_ok());
    assert_eq!(report.valid, [glossary, policy, terms]);

    env.engine.deactivate(glossary, OWNER)?;
    env.engine.set_reference_flag(policy, OWNER, false)?;

    let report = env.engine.check_reference(id)?;
    assert_eq!(report.valid, [terms]);
    assert_eq!(report.broken, [glossary, policy]);

    env.engine.activate(glossary, OWNER)?;
    env.engine.delete_subject(terms, OWNER)?;

    let report = env.engine.check_reference(id)?;
    assert_eq!(report.valid, [glossary]);
    assert_eq!(report.broken, [policy, terms]);

    Ok(())
}

#[lifecycle::test]
fn broken_references_are_only_reported_by_default(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let glossary = reference(&env)?;
    env.engine.link_reference(id, OWNER, glossary)?;

    let v1 = env.draft(id, "first")?;
    env.engine.deactivate(glossary, OWNER)?;
    env.publish(v1)?;

    assert!(!env.engine.check_reference(id)?.is_ok());
    env.engine.increment_version(id, OWNER)?;

    Ok(())
}

#[lifecycle::test]
fn broken_references_block_new_versions(env: Strict) -> Fallible<()> {
    let id = env.subject()?;
    let glossary = reference(&env)?;
    env.engine.link_reference(id, OWNER, glossary)?;

    let v1 = env.draft(id, "first")?;
    env.publish(v1)?;

    env.engine.deactivate(glossary, OWNER)?;

    match env.engine.increment_version(id, OWNER) {
        Err(VersionError::BrokenReference(err)) => assert_eq!(err.0, [glossary]),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(env.engine.get_subject(id)?.history.len(), 1);

    env.engine.unlink_reference(id, OWNER, glossary)?;
    env.engine.increment_version(id, OWNER)?;

    Ok(())
}

#[lifecycle::test]
fn broken_references_block_publication(env: Strict) -> Fallible<()> {
    let id = env.subject()?;
    let glossary = reference(&env)?;
    env.engine.link_reference(id, OWNER, glossary)?;

    let v = env.draft(id, "first")?;
    env.engine.submit(v, OWNER)?;
    env.engine.admin_respond(
        stage(v, StageKind::Verification), ADMIN, Decision::Accept, None)?;
    env.engine.respond(
        stage(v, StageKind::Approval), APPROVER, Decision::Accept, None)?;

    env.engine.deactivate(glossary, OWNER)?;

    assert!(matches!(
        env.engine.respond(
            stage(v, StageKind::Publication), PUBLISHER, Decision::Accept, None),
        Err(ApprovalError::BrokenReference(_))));

    let subject = env.engine.get_subject(id)?;
    assert_eq!(subject.published, None);
    assert_eq!(subject.working_version().map(|v| v.tag), Some(Tag::PendingPublication));

    // Once the reference is restored the publisher can go ahead.
    env.engine.activate(glossary, OWNER)?;
    assert_eq!(
        env.engine.respond(
            stage(v, StageKind::Publication), PUBLISHER, Decision::Accept, None)?,
        Transition::Published,
    );

    Ok(())
}

#[lifecycle::test]
fn deleting_requires_owner_and_no_foreign_lock(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    env.engine.lock(id, AUTHOR)?;

    assert!(matches!(
        env.engine.delete_subject(id, VIEWER1),
        Err(SubjectError::Permissions(_))));
    assert!(matches!(
        env.engine.delete_subject(id, OWNER),
        Err(SubjectError::AlreadyLocked { holder: AUTHOR })));

    env.engine.force_unlock(id, ADMIN)?;
    env.engine.delete_subject(id, OWNER)?;

    assert!(env.engine.get_subject(id).is_err());
    assert!(!env.engine.subject_ids().contains(&id));
    assert_eq!(
        env.engine.diary(id)?.last().map(|entry| entry.kind.clone()),
        Some("delete".to_string()),
    );

    Ok(())
}
