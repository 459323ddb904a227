//! Tests for drafts, version increments, and history.

use failure::Fallible;
use lifecycle::models::{
    ContentRef,
    Lifecycle,
    LookupError,
    SubjectKind,
    Tag,
    VersionError,
    VersionId,
};
use uuid::Uuid;

mod common;

use self::common::*;

fn tags(env: &Env, id: Uuid) -> Fallible<Vec<(u32, Tag)>> {
    Ok(env.engine.historical(id)?
        .into_iter()
        .map(|v| (v.number, v.tag))
        .collect())
}

#[lifecycle::test]
fn draft_is_edited_in_place(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let version = env.draft(id, "first")?;
    assert_eq!(version.number, 1);

    let saved = env.engine.save_draft(id, OWNER, "second".into())?;
    assert_eq!(saved.number, 1);
    assert_eq!(saved.content, ContentRef::from("second"));
    assert_eq!(saved.author, OWNER);
    assert_eq!(saved.predecessor, None);

    let subject = env.engine.get_subject(id)?;
    assert_eq!(subject.lifecycle(), Lifecycle::Draft);
    assert_eq!(subject.history.len(), 1);

    Ok(())
}

#[lifecycle::test]
fn failed_increment_leaves_no_gap(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let v1 = env.draft(id, "first")?;

    assert!(matches!(
        env.engine.increment_version(id, OWNER),
        Err(VersionError::DraftExists(1))));

    env.publish(v1)?;

    let v2 = env.engine.increment_version(id, OWNER)?;
    assert_eq!(v2.number, 2);
    assert_eq!(v2.predecessor, Some(1));
    assert_eq!(v2.content, ContentRef::from("first"));
    assert_eq!(v2.tag, Tag::Draft);

    assert_eq!(tags(&env, id)?, [(1, Tag::Historical), (2, Tag::Draft)]);

    let subject = env.engine.get_subject(id)?;
    assert_eq!(subject.published, None);
    assert_eq!(subject.working, Some(2));

    Ok(())
}

#[lifecycle::test]
fn new_draft_keeps_published_version_in_force(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let v1 = env.draft(id, "first")?;
    env.publish(v1)?;

    let v2 = env.engine.create_draft(id, OWNER, "second".into())?;
    assert_eq!(v2.number, 2);
    assert_eq!(v2.predecessor, Some(1));

    let subject = env.engine.get_subject(id)?;
    assert_eq!(subject.published, Some(1));
    assert_eq!(subject.lifecycle(), Lifecycle::Draft);
    assert_eq!(tags(&env, id)?, [(1, Tag::Published), (2, Tag::Draft)]);

    Ok(())
}

#[lifecycle::test]
fn historical_increment_restores_old_content(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let v1 = env.draft(id, "first")?;
    env.publish(v1)?;

    let v2 = env.engine.increment_version(id, OWNER)?;
    env.engine.save_draft(id, OWNER, "second".into())?;
    env.publish(VersionId::new(id, v2.number))?;

    let v3 = env.engine.historical_increment_version(id, OWNER, 1)?;
    assert_eq!(v3.number, 3);
    assert_eq!(v3.predecessor, Some(2));
    assert_eq!(v3.derived_from, Some(1));
    assert_eq!(v3.content, ContentRef::from("first"));

    assert_eq!(tags(&env, id)?, [
        (1, Tag::Historical),
        (2, Tag::Historical),
        (3, Tag::Draft),
    ]);

    let subject = env.engine.get_subject(id)?;
    let lineage = subject.history.lineage(3)
        .map(|v| v.number)
        .collect::<Vec<_>>();
    assert_eq!(lineage, [3, 2, 1]);

    Ok(())
}

#[lifecycle::test]
fn historical_increment_needs_historical_source(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let v1 = env.draft(id, "first")?;
    env.publish(v1)?;

    assert!(matches!(
        env.engine.historical_increment_version(id, OWNER, 1),
        Err(VersionError::SequenceConflict { requested: 1, latest: 1 })));
    assert!(matches!(
        env.engine.historical_increment_version(id, OWNER, 5),
        Err(VersionError::NoSuchVersion(5))));

    assert_eq!(env.engine.get_subject(id)?.history.next_number(), 2);

    Ok(())
}

#[lifecycle::test]
fn increment_needs_a_version(env: Env) -> Fallible<()> {
    let id = env.subject()?;

    assert!(matches!(
        env.engine.increment_version(id, OWNER),
        Err(VersionError::NoVersion)));
    assert!(matches!(
        env.engine.save_draft(id, OWNER, "x".into()),
        Err(VersionError::NotLockHolder)));

    env.engine.lock(id, OWNER)?;
    assert!(matches!(
        env.engine.save_draft(id, OWNER, "x".into()),
        Err(VersionError::NoDraft)));

    Ok(())
}

#[lifecycle::test]
fn deactivated_subject_cannot_change(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    env.engine.deactivate(id, OWNER)?;

    assert!(matches!(
        env.engine.create_draft(id, OWNER, "first".into()),
        Err(VersionError::SubjectDeactivated)));

    env.engine.activate(id, OWNER)?;
    env.engine.create_draft(id, OWNER, "first".into())?;

    Ok(())
}

#[lifecycle::test]
fn unknown_subjects_and_actors_are_reported(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let missing = Uuid::new_v4();

    assert!(matches!(
        env.engine.create_draft(missing, OWNER, "x".into()),
        Err(VersionError::Lookup(LookupError::SubjectNotFound(_)))));
    assert!(matches!(
        env.engine.create_draft(id, 1234, "x".into()),
        Err(VersionError::Lookup(LookupError::UnknownActor(1234)))));
    assert!(matches!(
        env.engine.diary(missing),
        Err(LookupError::SubjectNotFound(_))));
    assert!(env.engine
        .create_subject(SubjectKind::Document, "Doc", None, 1234)
        .is_err());

    Ok(())
}

#[lifecycle::test]
fn diary_records_every_change(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    env.draft(id, "first")?;
    env.engine.save_draft(id, OWNER, "second".into())?;
    env.clock.advance(chrono::Duration::hours(1));
    env.engine.unlock(id, OWNER)?;

    let diary = env.engine.diary(id)?;
    let kinds = diary.iter()
        .map(|entry| entry.kind.as_str())
        .filter(|&kind| kind != "assign")
        .collect::<Vec<_>>();

    assert_eq!(kinds, ["create", "acquire", "create-draft", "save-draft", "release"]);
    assert!(diary.iter().all(|entry| entry.context_id == id));

    let last = diary.last().expect("diary is empty");
    assert_eq!(last.timestamp, *EPOCH + chrono::Duration::hours(1));

    Ok(())
}

#[lifecycle::test]
fn discarded_draft_is_left_behind(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let v1 = env.draft(id, "first")?;
    env.publish(v1)?;

    env.engine.create_draft(id, OWNER, "second".into())?;

    assert!(matches!(
        env.engine.discard_draft(id, AUTHOR),
        Err(VersionError::NotLockHolder)));

    let discarded = env.engine.discard_draft(id, OWNER)?;
    assert_eq!(discarded.number, 2);
    assert_eq!(discarded.tag, Tag::Discarded);

    let subject = env.engine.get_subject(id)?;
    assert_eq!(subject.working, None);
    assert_eq!(subject.published, Some(1));
    assert_eq!(subject.lifecycle(), Lifecycle::Published);

    assert!(matches!(
        env.engine.discard_draft(id, OWNER),
        Err(VersionError::NoDraft)));

    let v3 = env.engine.increment_version(id, OWNER)?;
    assert_eq!(v3.number, 3);
    assert_eq!(v3.predecessor, Some(1));
    assert_eq!(v3.content, ContentRef::from("first"));

    assert_eq!(tags(&env, id)?,
        [(1, Tag::Historical), (2, Tag::Discarded), (3, Tag::Draft)]);

    Ok(())
}

#[lifecycle::test]
fn drafts_in_approval_cannot_be_discarded(env: Env) -> Fallible<()> {
    let id = env.subject()?;
    let v1 = env.draft(id, "first")?;
    env.engine.submit(v1, OWNER)?;

    assert!(matches!(
        env.engine.discard_draft(id, OWNER),
        Err(VersionError::ApprovalInProgress(1))));

    Ok(())
}
