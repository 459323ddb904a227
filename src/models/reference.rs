//! Integrity of references between subjects.

use failure::Fail;
use itertools::Itertools;
use std::fmt;
use uuid::Uuid;

use crate::error::ApiError;
use super::subject::SubjectState;

/// What the reference checker needs to know about a referenced subject.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Target {
    /// Subject is flagged as a reference.
    pub reference: bool,
    pub state: SubjectState,
}

impl Target {
    fn is_valid(&self) -> bool {
        self.reference && self.state == SubjectState::Active
    }
}

/// Outcome of checking a subject's references.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReferenceReport {
    pub valid: Vec<Uuid>,
    /// Targets which don't exist, were deactivated, or are no longer flagged
    /// as references, in the order they were linked.
    pub broken: Vec<Uuid>,
}

impl ReferenceReport {
    pub fn is_ok(&self) -> bool {
        self.broken.is_empty()
    }

    pub fn into_result(self) -> Result<(), BrokenReferenceError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(BrokenReferenceError(self.broken))
        }
    }
}

/// Check each of `references`, using `lookup` to find its current state.
///
/// All targets are checked; the report lists every broken one, not just the
/// first.
pub fn check<F>(references: &[Uuid], mut lookup: F) -> ReferenceReport
where
    F: FnMut(Uuid) -> Option<Target>,
{
    let (valid, broken): (Vec<Uuid>, Vec<Uuid>) = references.iter()
        .copied()
        .partition(|&id| lookup(id).map_or(false, |target| target.is_valid()));

    ReferenceReport { valid, broken }
}

#[derive(ApiError, Debug)]
#[api(code = "reference:broken")]
pub struct BrokenReferenceError(pub Vec<Uuid>);

impl Fail for BrokenReferenceError {}

impl fmt::Display for BrokenReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Broken references to {}", self.0.iter().format(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reports_every_broken_target() {
        let (ok, gone, inactive, plain) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let mut known = HashMap::new();
        known.insert(ok, Target { reference: true, state: SubjectState::Active });
        known.insert(inactive,
            Target { reference: true, state: SubjectState::Deactivated });
        known.insert(plain, Target { reference: false, state: SubjectState::Active });

        let report = check(&[gone, ok, inactive, plain], |id| known.get(&id).copied());
        assert_eq!(report.valid, [ok]);
        assert_eq!(report.broken, [gone, inactive, plain]);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.0.len(), 3);
        assert_eq!(err.code().as_deref(), Some("reference:broken"));
    }

    #[test]
    fn no_references_is_ok() {
        assert!(check(&[], |_| None).is_ok());
    }
}
