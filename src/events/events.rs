use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ActorId, approval::StageKind};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Event {
    StageAssigned(StageAssigned),
    ChainRejected(ChainRejected),
    Published(Published),
    ReviewDue(ReviewDue),
    ReadConfirmationRequested(ReadConfirmationRequested),
    ReadConfirmationReminder(ReadConfirmationReminder),
    LockOverridden(LockOverridden),
}

/// A version entered a stage in which the recipient is expected to respond.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StageAssigned {
    pub subject: Uuid,
    pub version: u32,
    pub stage: StageKind,
}

/// An approval chain the recipient took part in was rejected.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChainRejected {
    pub subject: Uuid,
    pub version: u32,
    pub stage: StageKind,
    /// Actor who rejected.
    pub by: ActorId,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Published {
    pub subject: Uuid,
    pub version: u32,
}

/// Review of a subject is coming due.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReviewDue {
    pub subject: Uuid,
    pub due: NaiveDate,
}

/// The recipient is asked to confirm they have read a newly published version.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadConfirmationRequested {
    pub subject: Uuid,
    pub version: u32,
}

/// Reminder for a read confirmation that is still outstanding.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReadConfirmationReminder {
    pub subject: Uuid,
    pub version: u32,
}

/// A lock held by the recipient was taken over or released by an
/// administrator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LockOverridden {
    pub subject: Uuid,
    pub by: ActorId,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match *self {
            Event::StageAssigned(_) => "stage-assigned",
            Event::ChainRejected(_) => "chain-rejected",
            Event::Published(_) => "published",
            Event::ReviewDue(_) => "review-due",
            Event::ReadConfirmationRequested(_) => "read-confirmation-requested",
            Event::ReadConfirmationReminder(_) => "read-confirmation-reminder",
            Event::LockOverridden(_) => "lock-overridden",
        }
    }

    /// Subject this event concerns.
    pub fn subject(&self) -> Uuid {
        match *self {
            Event::StageAssigned(ref e) => e.subject,
            Event::ChainRejected(ref e) => e.subject,
            Event::Published(ref e) => e.subject,
            Event::ReviewDue(ref e) => e.subject,
            Event::ReadConfirmationRequested(ref e) => e.subject,
            Event::ReadConfirmationReminder(ref e) => e.subject,
            Event::LockOverridden(ref e) => e.subject,
        }
    }
}

impl_from! { for Event ;
    StageAssigned => |e| Event::StageAssigned(e),
    ChainRejected => |e| Event::ChainRejected(e),
    Published => |e| Event::Published(e),
    ReviewDue => |e| Event::ReviewDue(e),
    ReadConfirmationRequested => |e| Event::ReadConfirmationRequested(e),
    ReadConfirmationReminder => |e| Event::ReadConfirmationReminder(e),
    LockOverridden => |e| Event::LockOverridden(e),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kind_tag() {
        let subject = Uuid::nil();
        let event = Event::from(StageAssigned {
            subject,
            version: 3,
            stage: StageKind::Approval,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "stage-assigned");
        assert_eq!(json["stage"], "approval");
        assert_eq!(json["version"], 3);
        assert_eq!(event.kind(), "stage-assigned");
        assert_eq!(event.subject(), subject);
    }
}
