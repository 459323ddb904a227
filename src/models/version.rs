//! Versions of a subject.
//!
//! Versions form an append-only arena owned by the subject. A version's
//! number is its position in the arena (starting at 1), so numbers are never
//! reused and have no gaps. Lineage is recorded once, at creation, as
//! a pointer to the predecessor and (for historical increments) to the
//! snapshot the content was taken from; it is never rewritten afterwards.
//! The only thing that changes on an existing version is its [`Tag`].

use chrono::{DateTime, Utc};
use failure::Fail;
use lifecycle_macros::From;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    permissions::RequirePermissionsError,
};
use super::{
    ActorId,
    LookupError,
    lock,
    reference::BrokenReferenceError,
    subject::Subject,
};

/// Lifecycle tag of a version.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    Draft,
    PendingVerification,
    PendingApproval,
    PendingPublication,
    Published,
    Historical,
    /// Draft abandoned by its author.
    Discarded,
}

impl Tag {
    /// Is a version with this tag going through approval?
    pub fn is_pending(self) -> bool {
        match self {
            Tag::PendingVerification
            | Tag::PendingApproval
            | Tag::PendingPublication => true,
            _ => false,
        }
    }

    /// Was a version with this tag put in force at some point?
    ///
    /// Versions only become historical by being retired from publication.
    pub fn was_published(self) -> bool {
        match self {
            Tag::Published | Tag::Historical => true,
            _ => false,
        }
    }
}

/// Opaque reference to a content snapshot held by an external store.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ContentRef(pub String);

impl<'a> From<&'a str> for ContentRef {
    fn from(s: &'a str) -> Self {
        ContentRef(s.to_string())
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Version {
    pub number: u32,
    pub content: ContentRef,
    pub author: ActorId,
    pub created: DateTime<Utc>,
    pub tag: Tag,
    /// Latest version other than a discarded draft when this one was cut.
    pub predecessor: Option<u32>,
    /// Historical version whose content this one was derived from.
    pub derived_from: Option<u32>,
}

/// Append-only collection of a subject's versions.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct History {
    versions: Vec<Version>,
}

impl History {
    pub fn get(&self, number: u32) -> Option<&Version> {
        self.versions.get(index(number)?)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Latest version which was not discarded.
    pub fn current(&self) -> Option<&Version> {
        self.versions.iter().rev().find(|v| v.tag != Tag::Discarded)
    }

    pub fn iter(&self) -> std::slice::Iter<Version> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Number the next version will receive.
    pub fn next_number(&self) -> u32 {
        self.versions.len() as u32 + 1
    }

    /// Walk predecessors of a version, starting with the version itself.
    pub fn lineage(&self, number: u32) -> impl Iterator<Item = &Version> + '_ {
        std::iter::successors(self.get(number), move |v| {
            v.predecessor.and_then(|p| self.get(p))
        })
    }

    fn push(
        &mut self,
        content: ContentRef,
        author: ActorId,
        now: DateTime<Utc>,
        derived_from: Option<u32>,
    ) -> &Version {
        let version = Version {
            number: self.next_number(),
            content,
            author,
            created: now,
            tag: Tag::Draft,
            predecessor: self.current().map(|v| v.number),
            derived_from,
        };
        self.versions.push(version);
        &self.versions[self.versions.len() - 1]
    }

    pub(crate) fn retag(&mut self, number: u32, tag: Tag) {
        if let Some(version) = index(number)
            .and_then(|inx| self.versions.get_mut(inx))
        {
            version.tag = tag;
        }
    }

    fn replace_content(&mut self, number: u32, content: ContentRef) {
        if let Some(version) = index(number)
            .and_then(|inx| self.versions.get_mut(inx))
        {
            debug_assert_eq!(version.tag, Tag::Draft);
            version.content = content;
        }
    }
}

fn index(number: u32) -> Option<usize> {
    (number as usize).checked_sub(1)
}

/// Checks shared by every operation which cuts a new version.
fn ensure_can_cut(subject: &Subject, author: ActorId) -> Result<(), VersionError> {
    if !subject.is_active() {
        return Err(VersionError::SubjectDeactivated);
    }

    if let Some(holder) = lock::foreign_holder(&subject.lock, author) {
        return Err(VersionError::AlreadyLocked { holder });
    }

    if let Some(working) = subject.working_version() {
        return Err(if working.tag.is_pending() {
            VersionError::ApprovalInProgress(working.number)
        } else {
            VersionError::DraftExists(working.number)
        });
    }

    Ok(())
}

/// Create a new draft with fresh content.
///
/// Any published version stays published until the draft replaces it.
pub fn create_draft(
    subject: &mut Subject,
    content: ContentRef,
    author: ActorId,
    now: DateTime<Utc>,
) -> Result<Version, VersionError> {
    ensure_can_cut(subject, author)?;

    let version = subject.history.push(content, author, now, None).clone();
    subject.working = Some(version.number);

    Ok(version)
}

/// Replace content of the current draft.
pub fn save_draft(
    subject: &mut Subject,
    content: ContentRef,
    actor: ActorId,
) -> Result<Version, VersionError> {
    match subject.lock {
        Some(ref lock) if lock.holder == actor => (),
        _ => return Err(VersionError::NotLockHolder),
    }

    let number = match subject.working_version() {
        Some(v) if v.tag == Tag::Draft => v.number,
        Some(v) => return Err(VersionError::ApprovalInProgress(v.number)),
        None => return Err(VersionError::NoDraft),
    };

    subject.history.replace_content(number, content);

    subject.history.get(number).cloned().ok_or(VersionError::NoDraft)
}

/// Abandon the current draft.
///
/// The draft stays in history, tagged [`Tag::Discarded`], but is skipped when
/// later versions are cut.
pub fn discard_draft(subject: &mut Subject, actor: ActorId)
-> Result<Version, VersionError> {
    match subject.lock {
        Some(ref lock) if lock.holder == actor => (),
        _ => return Err(VersionError::NotLockHolder),
    }

    let number = match subject.working_version() {
        Some(v) if v.tag == Tag::Draft => v.number,
        Some(v) => return Err(VersionError::ApprovalInProgress(v.number)),
        None => return Err(VersionError::NoDraft),
    };

    subject.history.retag(number, Tag::Discarded);
    subject.working = None;

    subject.history.get(number).cloned().ok_or(VersionError::NoDraft)
}

/// Promote the latest content to a new version, retiring its predecessor.
pub fn increment(subject: &mut Subject, author: ActorId, now: DateTime<Utc>)
-> Result<Version, VersionError> {
    ensure_can_cut(subject, author)?;

    let content = subject.history.current()
        .map(|v| v.content.clone())
        .ok_or(VersionError::NoVersion)?;

    Ok(cut(subject, content, author, now, None))
}

/// Create a new version from the content of a historical snapshot.
pub fn historical_increment(
    subject: &mut Subject,
    author: ActorId,
    past: u32,
    now: DateTime<Utc>,
) -> Result<Version, VersionError> {
    ensure_can_cut(subject, author)?;

    let source = subject.history.get(past)
        .ok_or(VersionError::NoSuchVersion(past))?;

    if source.tag != Tag::Historical {
        return Err(VersionError::SequenceConflict {
            requested: past,
            latest: subject.history.len() as u32,
        });
    }

    let content = source.content.clone();

    Ok(cut(subject, content, author, now, Some(past)))
}

fn cut(
    subject: &mut Subject,
    content: ContentRef,
    author: ActorId,
    now: DateTime<Utc>,
    derived_from: Option<u32>,
) -> Version {
    if let Some(current) = subject.history.current().map(|v| v.number) {
        subject.history.retag(current, Tag::Historical);
    }

    // Nothing is in force until the new version is published, so there is
    // nothing to review either.
    if subject.published.take().is_some() {
        subject.review.retire(now.naive_utc().date());
    }

    let version = subject.history.push(content, author, now, derived_from)
        .clone();
    subject.working = Some(version.number);

    version
}

#[derive(ApiError, Debug, Fail, From)]
pub enum VersionError {
    #[fail(display = "{}", _0)]
    Lookup(#[cause] #[from] LookupError),
    #[fail(display = "{}", _0)]
    Permissions(#[cause] #[from] RequirePermissionsError),
    #[fail(display = "{}", _0)]
    BrokenReference(#[cause] #[from] BrokenReferenceError),
    #[api(code = "version:subject-deactivated")]
    #[fail(display = "Subject is deactivated")]
    SubjectDeactivated,
    #[api(code = "version:already-locked")]
    #[fail(display = "Subject is locked by actor {}", holder)]
    AlreadyLocked {
        holder: ActorId,
    },
    /// Drafts may only be edited by the holder of the lock.
    #[api(code = "version:save:not-lock-holder")]
    #[fail(display = "Drafts may only be saved by the lock holder")]
    NotLockHolder,
    /// A draft must be finalised or discarded before another one is cut.
    #[api(code = "version:draft-exists")]
    #[fail(display = "Version {} is already a draft", _0)]
    DraftExists(u32),
    #[api(code = "version:approval-in-progress")]
    #[fail(display = "Version {} is going through approval", _0)]
    ApprovalInProgress(u32),
    #[api(code = "version:save:no-draft")]
    #[fail(display = "Subject has no draft")]
    NoDraft,
    #[api(code = "version:increment:no-version")]
    #[fail(display = "Subject has no version to increment")]
    NoVersion,
    #[api(code = "version:increment:no-such-version")]
    #[fail(display = "Subject has no version {}", _0)]
    NoSuchVersion(u32),
    /// Historical increments can only start from a historical version.
    #[api(code = "version:increment:sequence-conflict")]
    #[fail(display = "Version {} is not historical (latest is {})",
        requested, latest)]
    SequenceConflict {
        requested: u32,
        latest: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use crate::models::{Lock, SubjectKind};

    fn subject() -> Subject {
        Subject::new(Uuid::new_v4(), SubjectKind::Graph, "Process", None, 1, Utc::now())
    }

    #[test]
    fn numbers_start_at_one_and_have_no_gaps() {
        let mut s = subject();
        let now = Utc::now();

        assert_eq!(create_draft(&mut s, "a".into(), 1, now).unwrap().number, 1);
        assert!(matches!(
            increment(&mut s, 1, now), Err(VersionError::DraftExists(1))));

        s.working = None;
        s.history.retag(1, Tag::Published);

        let v2 = increment(&mut s, 1, now).unwrap();
        assert_eq!(v2.number, 2);
        assert_eq!(v2.predecessor, Some(1));
        assert_eq!(v2.content, ContentRef::from("a"));
        assert_eq!(s.history.get(1).unwrap().tag, Tag::Historical);
        assert_eq!(s.history.next_number(), 3);
    }

    #[test]
    fn historical_increment_keeps_lineage() {
        let mut s = subject();
        let now = Utc::now();

        create_draft(&mut s, "first".into(), 1, now).unwrap();
        s.working = None;
        increment(&mut s, 1, now).unwrap();
        s.working = None;
        s.history.replace_content(2, "second".into());
        s.history.retag(2, Tag::Published);

        let v3 = historical_increment(&mut s, 1, 1, now).unwrap();
        assert_eq!(v3.number, 3);
        assert_eq!(v3.predecessor, Some(2));
        assert_eq!(v3.derived_from, Some(1));
        assert_eq!(v3.content, ContentRef::from("first"));

        let lineage = s.history.lineage(3).map(|v| v.number).collect::<Vec<_>>();
        assert_eq!(lineage, [3, 2, 1]);
    }

    #[test]
    fn historical_increment_rejects_non_historical_source() {
        let mut s = subject();
        let now = Utc::now();

        create_draft(&mut s, "a".into(), 1, now).unwrap();
        s.working = None;
        s.history.retag(1, Tag::Published);

        match historical_increment(&mut s, 1, 1, now) {
            Err(VersionError::SequenceConflict { requested: 1, latest: 1 }) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            historical_increment(&mut s, 1, 7, now),
            Err(VersionError::NoSuchVersion(7))));
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn foreign_lock_blocks_new_versions() {
        let mut s = subject();
        s.lock = Some(Lock { holder: 2, acquired: Utc::now() });

        assert!(matches!(
            create_draft(&mut s, "a".into(), 1, Utc::now()),
            Err(VersionError::AlreadyLocked { holder: 2 })));
        assert!(s.history.is_empty());
    }

    #[test]
    fn save_requires_lock() {
        let mut s = subject();
        create_draft(&mut s, "a".into(), 1, Utc::now()).unwrap();

        assert!(matches!(
            save_draft(&mut s, "b".into(), 1), Err(VersionError::NotLockHolder)));

        s.lock = Some(Lock { holder: 1, acquired: Utc::now() });
        let saved = save_draft(&mut s, "b".into(), 1).unwrap();
        assert_eq!(saved.content, ContentRef::from("b"));
        assert_eq!(saved.number, 1);
    }

    #[test]
    fn discarded_draft_is_skipped_by_increment() {
        let mut s = subject();
        let now = Utc::now();

        create_draft(&mut s, "a".into(), 1, now).unwrap();
        s.working = None;
        s.published = Some(1);
        s.history.retag(1, Tag::Published);
        create_draft(&mut s, "b".into(), 1, now).unwrap();

        assert!(matches!(
            discard_draft(&mut s, 1), Err(VersionError::NotLockHolder)));

        s.lock = Some(Lock { holder: 1, acquired: now });
        let discarded = discard_draft(&mut s, 1).unwrap();
        assert_eq!(discarded.number, 2);
        assert_eq!(discarded.tag, Tag::Discarded);
        assert_eq!(s.working, None);
        assert_eq!(s.published, Some(1));
        assert!(matches!(discard_draft(&mut s, 1), Err(VersionError::NoDraft)));

        let v3 = increment(&mut s, 1, now).unwrap();
        assert_eq!(v3.content, ContentRef::from("a"));
        assert_eq!(v3.predecessor, Some(1));
        assert_eq!(s.history.get(1).unwrap().tag, Tag::Historical);
        assert_eq!(s.history.get(2).unwrap().tag, Tag::Discarded);
    }
}
