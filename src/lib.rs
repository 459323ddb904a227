//! Lifecycle and approval workflow engine for graphs and documents.
//!
//! Subjects are edited under exclusive locks, cut into versions, routed
//! through verification, approval, and publication, and afterwards tracked
//! for periodic review and read confirmation. See [`engine::Engine`] for the
//! operations exposed to the request layer.

#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;

#[macro_use] mod macros;

pub mod audit;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod permissions;

pub use self::{
    cli::main,
    config::Config,
    engine::Engine,
    error::ApiError,
};

pub use lifecycle_macros::test;

pub type Result<T, E=failure::Error> = std::result::Result<T, E>;
