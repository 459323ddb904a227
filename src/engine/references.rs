//! Reference integrity checks.

use uuid::Uuid;

use crate::models::{
    BrokenReferenceError,
    LookupError,
    ReferenceReport,
    reference::{self, Target},
};
use super::Engine;

impl Engine {
    /// Check that every reference subject `id` depends on still exists and
    /// is in a valid state.
    ///
    /// This only reports; it's up to the caller to decide what to do about
    /// broken references.
    pub fn check_reference(&self, id: Uuid) -> Result<ReferenceReport, LookupError> {
        let references = self.read_subject(id, |subject| subject.references.clone())?;

        let report = reference::check(&references, |target| {
            self.read_subject(target, |t| Target {
                reference: t.reference,
                state: t.state,
            }).ok()
        });

        if !report.is_ok() {
            warn!("Subject {} has broken references: {:?}", id, report.broken);
        }

        Ok(report)
    }

    /// Fail if references of `id` are broken and the engine is configured to
    /// block on them.
    pub(super) fn ensure_references<E>(&self, id: Uuid) -> Result<(), E>
    where
        E: From<LookupError> + From<BrokenReferenceError>,
    {
        if !self.settings.block_broken_references {
            return Ok(());
        }

        self.check_reference(id)?.into_result()?;

        Ok(())
    }
}
