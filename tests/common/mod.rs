#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use failure::Fallible;
use lazy_static::lazy_static;
use lifecycle::{
    Engine,
    audit::MemoryLog,
    clock::ManualClock,
    engine::Settings,
    events::{Event, Outbox},
    models::{
        ActorId,
        Decision,
        StageId,
        StageKind,
        StaticDirectory,
        SubjectKind,
        VersionId,
    },
    permissions::PermissionBits,
};
use std::{ops::Deref, sync::Arc};
use uuid::Uuid;

mod support;

pub use self::support::{Fixture, TestResult, run_test};

pub const OWNER: ActorId = 1;
pub const AUTHOR: ActorId = 2;
pub const VERIFIER1: ActorId = 10;
pub const VERIFIER2: ActorId = 11;
pub const VERIFIER3: ActorId = 12;
pub const APPROVER: ActorId = 20;
pub const PUBLISHER: ActorId = 30;
pub const VIEWER1: ActorId = 40;
pub const VIEWER2: ActorId = 41;
pub const REVIEWER: ActorId = 50;
pub const ADMIN: ActorId = 99;

lazy_static! {
    /// Moment at which every test starts.
    pub static ref EPOCH: DateTime<Utc> = Utc.ymd(2020, 1, 6).and_hms(9, 0, 0);

    static ref DIRECTORY: StaticDirectory = {
        let mut directory = StaticDirectory::new();

        for &actor in &[
            OWNER, AUTHOR, VERIFIER1, VERIFIER2, VERIFIER3, APPROVER,
            PUBLISHER, VIEWER1, VIEWER2,
        ] {
            directory.insert(actor, PermissionBits::empty());
        }

        directory
            .with(REVIEWER, PermissionBits::MANAGE_REVIEWS)
            .with(ADMIN, PermissionBits::all())
    };
}

/// An engine with an in-memory audit log, an outbox collecting
/// notifications, and a clock which only moves when told to.
pub struct Env {
    pub engine: Engine,
    pub outbox: Arc<Outbox>,
    pub audit: Arc<MemoryLog>,
    pub clock: Arc<ManualClock>,
}

impl Fixture for Env {
    fn make() -> Fallible<Self> {
        Ok(Env::with_settings(Settings::default()))
    }
}

/// An [`Env`] which refuses to cut or publish versions while references are
/// broken.
pub struct Strict(pub Env);

impl Fixture for Strict {
    fn make() -> Fallible<Self> {
        Ok(Strict(Env::with_settings(Settings {
            block_broken_references: true,
            ..Settings::default()
        })))
    }
}

impl Deref for Strict {
    type Target = Env;

    fn deref(&self) -> &Env {
        &self.0
    }
}

impl Env {
    pub fn with_settings(settings: Settings) -> Env {
        let outbox = Arc::new(Outbox::new());
        let audit = Arc::new(MemoryLog::new());
        let clock = Arc::new(ManualClock::new(*EPOCH));

        let engine = Engine::builder(Arc::new(DIRECTORY.clone()))
            .dispatcher(outbox.clone())
            .audit(audit.clone())
            .clock(clock.clone())
            .settings(settings)
            .build();

        Env { engine, outbox, audit, clock }
    }

    /// Create a graph owned by [`OWNER`], with two verifiers, one approver,
    /// one publisher, and two viewers.
    pub fn subject(&self) -> Fallible<Uuid> {
        let e = &self.engine;
        let id = e.create_subject(SubjectKind::Graph, "Process", None, OWNER)?.id;

        e.assign_verifier(id, OWNER, VERIFIER1)?;
        e.assign_verifier(id, OWNER, VERIFIER2)?;
        e.assign_approver(id, OWNER, APPROVER)?;
        e.assign_publisher(id, OWNER, PUBLISHER)?;
        e.assign_viewer(id, OWNER, VIEWER1)?;
        e.assign_viewer(id, OWNER, VIEWER2)?;

        Ok(id)
    }

    /// Lock a subject for [`OWNER`] and create a draft.
    pub fn draft(&self, id: Uuid, content: &str) -> Fallible<VersionId> {
        self.engine.lock(id, OWNER)?;
        let version = self.engine.create_draft(id, OWNER, content.into())?;
        Ok(VersionId::new(id, version.number))
    }

    /// Take the working draft of a subject through the whole approval chain.
    pub fn publish(&self, version: VersionId) -> Fallible<()> {
        let e = &self.engine;

        e.submit(version, OWNER)?;
        e.respond(stage(version, StageKind::Verification), VERIFIER1, Decision::Accept, None)?;
        e.respond(stage(version, StageKind::Verification), VERIFIER2, Decision::Accept, None)?;
        e.respond(stage(version, StageKind::Approval), APPROVER, Decision::Accept, None)?;
        e.respond(stage(version, StageKind::Publication), PUBLISHER, Decision::Accept, None)?;

        Ok(())
    }

    /// Notifications dispatched since the last call, as `(recipient, event)`.
    pub fn drain(&self) -> Vec<(ActorId, Event)> {
        self.outbox.drain()
            .into_iter()
            .map(|n| (n.user, n.event))
            .collect()
    }
}

/// Date on which every test starts.
pub fn today() -> NaiveDate {
    EPOCH.naive_utc().date()
}

pub fn stage(version: VersionId, kind: StageKind) -> StageId {
    StageId { version, kind }
}
