//! Persisted engine state.

use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path, sync::{Arc, Mutex, PoisonError}};

use crate::{audit::Entry, error::Error, models::Subject};
use super::Engine;

/// Snapshot of all subjects together with the audit log.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct State {
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub audit: Vec<Entry>,
}

impl State {
    /// Read state from a JSON file. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<State, Error> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No state at {}, starting empty", path.display());
                return Ok(State::default());
            }
            Err(err) => return Err(err.into()),
        };

        Ok(serde_json::from_slice(&data)?)
    }

    /// Write state to a JSON file, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let data = serde_json::to_vec_pretty(self)?;
        let temp = path.with_extension("tmp");

        fs::write(&temp, data)?;
        fs::rename(&temp, path)?;

        Ok(())
    }
}

impl Engine {
    /// Capture the current state of all subjects and the audit log.
    pub fn snapshot(&self) -> State {
        let mut subjects = self.handles()
            .into_iter()
            .map(|(_, handle)| {
                handle.lock().unwrap_or_else(PoisonError::into_inner).clone()
            })
            .collect::<Vec<_>>();
        subjects.sort_by_key(|subject| subject.created);

        State {
            subjects,
            audit: self.audit.entries(),
        }
    }

    /// Replace all subjects with those from `state`, and append its audit
    /// entries to this engine's log.
    pub fn restore(&self, state: State) {
        self.subjects.clear();

        let count = state.subjects.len();

        for subject in state.subjects {
            self.subjects.insert(subject.id, Arc::new(Mutex::new(subject)));
        }

        for entry in state.audit {
            self.audit.record(entry);
        }

        info!("Restored {} subjects", count);
    }
}
