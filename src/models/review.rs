//! Periodic review of published subjects.
//!
//! A published subject has at most one open [`ReviewCycle`]. The cycle has
//! a due date, by which someone must confirm the subject is still valid, and
//! a [`Cadence`] which determines when the owner is reminded and when the
//! next cycle falls due once this one is completed.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use failure::Fail;
use lifecycle_macros::From;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, permissions::RequirePermissionsError};
use super::{ActorId, LookupError};

/// Longest accepted review interval, in days.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// How often a subject is reviewed, and how early its owner is reminded.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Cadence {
    /// Days between completing a review and the next review falling due.
    pub interval_days: u32,
    /// Days before the due date at which a reminder is sent.
    pub lead_days: u32,
}

impl Cadence {
    pub fn new(interval_days: u32, lead_days: u32) -> Result<Cadence, ReviewError> {
        let cadence = Cadence { interval_days, lead_days };
        cadence.validate()?;
        Ok(cadence)
    }

    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.interval_days == 0
        || self.interval_days > MAX_INTERVAL_DAYS
        || self.lead_days >= self.interval_days {
            Err(ReviewError::InvalidCadence {
                interval_days: self.interval_days,
                lead_days: self.lead_days,
            })
        } else {
            Ok(())
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::days(i64::from(self.interval_days))
    }

    pub fn lead(&self) -> Duration {
        Duration::days(i64::from(self.lead_days))
    }

    /// Due date of a cycle opened on `today`.
    pub fn due_after(&self, today: NaiveDate) -> Result<NaiveDate, ReviewError> {
        today.checked_add_signed(self.interval())
            .ok_or(ReviewError::DateOutOfRange)
    }
}

/// Why a review cycle is no longer open.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Closure {
    /// Review was carried out.
    Completed {
        by: ActorId,
        on: NaiveDate,
    },
    /// Cycle was replaced by a new one, either explicitly or because a new
    /// version was published.
    Superseded {
        on: NaiveDate,
    },
    /// Reviews were disabled for the subject.
    Disabled {
        on: NaiveDate,
    },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ReviewCycle {
    /// Number of this cycle, starting at 1.
    pub number: u32,
    pub opened: NaiveDate,
    pub due: NaiveDate,
    pub cadence: Cadence,
    /// When a reminder was sent in this cycle.
    pub reminded: Option<DateTime<Utc>>,
    pub closed: Option<Closure>,
}

impl ReviewCycle {
    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }

    /// Date from which a reminder should be sent.
    ///
    /// `None` when that date would fall before the earliest representable
    /// date.
    pub fn reminder_date(&self) -> Option<NaiveDate> {
        self.due.checked_sub_signed(self.cadence.lead())
    }

    /// Has the reminder date arrived without a reminder being sent yet?
    pub fn is_due_for_reminder(&self, today: NaiveDate) -> bool {
        self.is_open()
            && self.reminded.is_none()
            && self.reminder_date().map_or(true, |date| today >= date)
    }
}

/// Review state of a subject.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Review {
    /// Subjects with reviews disabled never have an open cycle.
    pub enabled: bool,
    /// Cadence used for this subject's cycles. When not set the engine's
    /// default is used.
    pub cadence: Option<Cadence>,
    /// Currently open cycle.
    pub current: Option<ReviewCycle>,
    /// Closed cycles, oldest first.
    pub history: Vec<ReviewCycle>,
}

impl Default for Review {
    fn default() -> Self {
        Review {
            enabled: true,
            cadence: None,
            current: None,
            history: Vec::new(),
        }
    }
}

impl Review {
    /// Cadence in effect for this subject.
    pub fn cadence_or(&self, default: Cadence) -> Cadence {
        self.cadence.unwrap_or(default)
    }

    pub fn is_due_for_reminder(&self, today: NaiveDate) -> bool {
        self.enabled && self.current.as_ref()
            .map_or(false, |cycle| cycle.is_due_for_reminder(today))
    }

    /// Open a new cycle due on `due`, superseding the open one, if any.
    pub fn schedule(&mut self, due: NaiveDate, cadence: Cadence, today: NaiveDate)
    -> Result<&ReviewCycle, ReviewError> {
        cadence.validate()?;

        if !self.enabled {
            return Err(ReviewError::ReviewsDisabled);
        }

        self.cadence = Some(cadence);
        self.close(Closure::Superseded { on: today });
        Ok(self.open(due, cadence, today))
    }

    /// Move the due date of the open cycle.
    ///
    /// Because the reminder date moves with it, a reminder already sent in
    /// this cycle is forgotten.
    pub fn reschedule(&mut self, due: NaiveDate)
    -> Result<&ReviewCycle, ReviewError> {
        let cycle = self.current.as_mut().ok_or(ReviewError::NoOpenReviewCycle)?;
        cycle.due = due;
        cycle.reminded = None;
        Ok(&*cycle)
    }

    /// Change the cadence. The open cycle keeps its due date, but uses the new
    /// lead time for reminders.
    pub fn update_cadence(&mut self, cadence: Cadence) -> Result<(), ReviewError> {
        cadence.validate()?;
        self.cadence = Some(cadence);

        if let Some(ref mut cycle) = self.current {
            cycle.cadence = cadence;
        }

        Ok(())
    }

    /// Close the open cycle as completed and open the next one, due one
    /// interval from `today`.
    pub fn complete(&mut self, by: ActorId, today: NaiveDate)
    -> Result<&ReviewCycle, ReviewError> {
        let cadence = match self.current {
            Some(ref cycle) => cycle.cadence,
            None => return Err(ReviewError::NoOpenReviewCycle),
        };

        let due = cadence.due_after(today)?;
        self.close(Closure::Completed { by, on: today });
        Ok(self.open(due, cadence, today))
    }

    /// Start a fresh cycle after a new version was published.
    ///
    /// Returns `None` if reviews are disabled for this subject.
    pub fn renew(&mut self, default: Cadence, today: NaiveDate)
    -> Result<Option<&ReviewCycle>, ReviewError> {
        if !self.enabled {
            return Ok(None);
        }

        let cadence = self.cadence_or(default);
        let due = cadence.due_after(today)?;
        self.close(Closure::Superseded { on: today });
        Ok(Some(self.open(due, cadence, today)))
    }

    /// Close the open cycle because the version under review was retired
    /// without a replacement being published.
    pub fn retire(&mut self, today: NaiveDate) {
        self.close(Closure::Superseded { on: today });
    }

    /// Disable reviews, closing the open cycle.
    pub fn disable(&mut self, today: NaiveDate) {
        self.enabled = false;
        self.close(Closure::Disabled { on: today });
    }

    /// Enable reviews. If `published`, a cycle is opened immediately.
    pub fn enable(&mut self, default: Cadence, today: NaiveDate, published: bool)
    -> Result<Option<&ReviewCycle>, ReviewError> {
        self.enabled = true;

        if self.current.is_none() && published {
            self.renew(default, today)
        } else {
            Ok(self.current.as_ref())
        }
    }

    /// Record that a reminder was sent for the open cycle.
    ///
    /// Returns `false` if there was nothing to remind about.
    pub fn mark_reminded(&mut self, now: DateTime<Utc>) -> bool {
        match self.current {
            Some(ref mut cycle) if cycle.reminded.is_none() => {
                cycle.reminded = Some(now);
                true
            }
            _ => false,
        }
    }

    fn open(&mut self, due: NaiveDate, cadence: Cadence, today: NaiveDate)
    -> &ReviewCycle {
        let number = self.history.last()
            .map_or(0, |cycle| cycle.number) + 1;

        self.current.get_or_insert(ReviewCycle {
            number,
            opened: today,
            due,
            cadence,
            reminded: None,
            closed: None,
        })
    }

    fn close(&mut self, closure: Closure) {
        if let Some(mut cycle) = self.current.take() {
            cycle.closed = Some(closure);
            self.history.push(cycle);
        }
    }
}

#[derive(ApiError, Debug, Fail, From)]
pub enum ReviewError {
    #[fail(display = "{}", _0)]
    Lookup(#[cause] #[from] LookupError),
    #[fail(display = "{}", _0)]
    Permissions(#[cause] #[from] RequirePermissionsError),
    #[api(code = "review:no-open-cycle")]
    #[fail(display = "Subject has no open review cycle")]
    NoOpenReviewCycle,
    /// Only published subjects are reviewed.
    #[api(code = "review:not-published")]
    #[fail(display = "Subject has no published version")]
    NotPublished,
    #[api(code = "review:disabled")]
    #[fail(display = "Reviews are disabled for this subject")]
    ReviewsDisabled,
    #[api(code = "review:invalid-cadence")]
    #[fail(display = "Review interval of {} days must be between 1 and 36500 \
        days, and longer than reminder lead of {} days",
        interval_days, lead_days)]
    InvalidCadence {
        interval_days: u32,
        lead_days: u32,
    },
    #[api(code = "review:date-out-of-range")]
    #[fail(display = "Review date is out of range")]
    DateOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd(y, m, d)
    }

    #[test]
    fn cadence_lead_must_be_shorter_than_interval() {
        assert!(Cadence::new(90, 14).is_ok());
        assert!(matches!(
            Cadence::new(30, 30),
            Err(ReviewError::InvalidCadence { interval_days: 30, lead_days: 30 })));
        assert!(Cadence::new(0, 0).is_err());
        assert!(Cadence::new(MAX_INTERVAL_DAYS, 30).is_ok());
        assert!(matches!(
            Cadence::new(200_000_000, 1),
            Err(ReviewError::InvalidCadence { interval_days: 200_000_000, .. })));
    }

    #[test]
    fn cycles_near_end_of_calendar_are_not_opened() {
        let mut review = Review::default();
        let cadence = Cadence::new(MAX_INTERVAL_DAYS, 30).unwrap();
        let last = NaiveDate::from_ymd(262_142, 12, 1);
        review.schedule(last, cadence, last).unwrap();

        assert!(matches!(
            review.complete(1, last),
            Err(ReviewError::DateOutOfRange)));
        assert!(matches!(
            review.renew(cadence, last),
            Err(ReviewError::DateOutOfRange)));
        // Failures leave the open cycle alone.
        assert_eq!(review.current.as_ref().map(|c| c.number), Some(1));
        assert!(review.history.is_empty());
    }

    #[test]
    fn reminder_before_earliest_date_is_due() {
        let mut review = Review::default();
        let cadence = Cadence::new(MAX_INTERVAL_DAYS, MAX_INTERVAL_DAYS - 1)
            .unwrap();
        review.schedule(date(2020, 6, 30), cadence, date(2020, 1, 1)).unwrap();

        let earliest = NaiveDate::from_ymd(-262_142, 1, 1);
        let cycle = review.reschedule(earliest).unwrap();
        assert_eq!(cycle.reminder_date(), None);
        assert!(review.is_due_for_reminder(date(2020, 1, 1)));
    }

    #[test]
    fn reminder_is_due_lead_days_before_due_date() {
        let mut review = Review::default();
        let cadence = Cadence::new(90, 14).unwrap();
        review.schedule(date(2020, 6, 30), cadence, date(2020, 1, 1)).unwrap();

        assert!(!review.is_due_for_reminder(date(2020, 6, 15)));
        assert!(review.is_due_for_reminder(date(2020, 6, 16)));
        assert!(review.is_due_for_reminder(date(2020, 7, 10)));

        assert!(review.mark_reminded(Utc::now()));
        assert!(!review.mark_reminded(Utc::now()));
        assert!(!review.is_due_for_reminder(date(2020, 6, 16)));
    }

    #[test]
    fn complete_anchors_next_cycle_on_today() {
        let mut review = Review::default();
        let cadence = Cadence::new(90, 14).unwrap();
        review.schedule(date(2020, 6, 30), cadence, date(2020, 1, 1)).unwrap();

        let next = review.complete(5, date(2020, 7, 15)).unwrap().clone();
        assert_eq!(next.number, 2);
        assert_eq!(next.due, date(2020, 10, 13));
        assert_eq!(review.history.len(), 1);
        assert_eq!(review.history[0].closed,
            Some(Closure::Completed { by: 5, on: date(2020, 7, 15) }));
    }

    #[test]
    fn operations_on_missing_cycle_fail() {
        let mut review = Review::default();

        assert!(matches!(
            review.complete(1, date(2020, 1, 1)),
            Err(ReviewError::NoOpenReviewCycle)));
        assert!(matches!(
            review.reschedule(date(2020, 1, 1)),
            Err(ReviewError::NoOpenReviewCycle)));
    }

    #[test]
    fn reschedule_resets_reminder() {
        let mut review = Review::default();
        let cadence = Cadence::new(90, 14).unwrap();
        review.schedule(date(2020, 6, 30), cadence, date(2020, 1, 1)).unwrap();
        review.mark_reminded(Utc::now());

        let cycle = review.reschedule(date(2020, 9, 30)).unwrap();
        assert_eq!(cycle.reminded, None);
        assert_eq!(cycle.number, 1);
    }

    #[test]
    fn disabled_reviews_have_no_cycle() {
        let mut review = Review::default();
        let cadence = Cadence::new(90, 14).unwrap();
        review.renew(cadence, date(2020, 1, 1)).unwrap();

        review.disable(date(2020, 2, 1));
        assert!(review.current.is_none());
        assert!(review.renew(cadence, date(2020, 2, 2)).unwrap().is_none());

        let cycle = review.enable(cadence, date(2020, 3, 1), true)
            .unwrap()
            .unwrap();
        assert_eq!(cycle.due, date(2020, 5, 30));
        assert_eq!(cycle.number, 2);
    }
}
