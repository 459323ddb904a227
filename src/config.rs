use failure::Fail;
use log::LevelFilter;
use serde::Deserialize;
use std::{collections::{HashMap, HashSet}, fs, path::{Path, PathBuf}};
use toml;

use crate::{
    models::{ActorId, Cadence},
    permissions::Permission,
};

/// Load configuration from a TOML file.
pub fn load(path: &Path) -> crate::Result<Config> {
    let data = fs::read(path).map_err(ReadConfigurationError)?;
    parse(&data)
}

/// Parse configuration from TOML source.
pub fn parse(data: &[u8]) -> crate::Result<Config> {
    toml::from_slice(data).map_err(|e| ConfigurationError(e).into())
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub review: Review,
    #[serde(default)]
    pub workflow: Workflow,
    /// Actors known to the engine.
    #[serde(default)]
    pub actors: Vec<Actor>,
}

impl Config {
    /// Validate configuration correctness.
    pub fn validate(&self) -> Result<(), failure::Error> {
        Cadence {
            interval_days: self.review.interval_days,
            lead_days: self.review.lead_days,
        }.validate().map_err(InvalidConfiguration::Review)?;

        let mut seen = HashSet::new();

        for actor in &self.actors {
            if !seen.insert(actor.id) {
                return Err(InvalidConfiguration::DuplicateActor(actor.id).into());
            }
        }

        Ok(())
    }
}

/// Where the engine's state is kept between invocations.
#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    /// Path to a JSON state snapshot.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Custom filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

/// Default cadence of periodic reviews.
#[derive(Clone, Debug, Deserialize)]
pub struct Review {
    /// Days between a review and the next one falling due.
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
    /// Days before the due date at which owners are reminded.
    #[serde(default = "default_lead_days")]
    pub lead_days: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Workflow {
    /// Refuse to cut versions and publish while references are broken.
    #[serde(default)]
    pub block_broken_references: bool,
}

/// An actor and their capabilities.
#[derive(Clone, Debug, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Fail)]
#[fail(display = "Cannot read configuration file")]
pub struct ReadConfigurationError(#[fail(cause)] std::io::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: {}", _0)]
pub struct ConfigurationError(#[fail(cause)] toml::de::Error);

#[derive(Debug, Fail)]
pub enum InvalidConfiguration {
    #[fail(display = "Invalid review configuration: {}", _0)]
    Review(#[cause] crate::models::ReviewError),
    #[fail(display = "Actor {} is defined more than once", _0)]
    DuplicateActor(ActorId),
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("state.json")
}

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

fn default_interval_days() -> u32 {
    365
}

fn default_lead_days() -> u32 {
    30
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            path: default_storage_path(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level_filter(),
            filters: HashMap::new(),
        }
    }
}

impl Default for Review {
    fn default() -> Self {
        Review {
            interval_days: default_interval_days(),
            lead_days: default_lead_days(),
        }
    }
}
