//! Commands for editing locks.

use structopt::StructOpt;
use uuid::Uuid;

use crate::{Config, Result, models::ActorId};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Release a lock regardless of who holds it
    #[structopt(name = "force-release")]
    ForceRelease {
        subject: Uuid,
        /// Administrator on whose behalf to release the lock
        #[structopt(long = "admin")]
        admin: ActorId,
    },
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    let engine = super::open(cfg)?;

    match opts.command {
        Command::ForceRelease { subject, admin } => {
            match engine.force_unlock(subject, admin)? {
                Some(holder) => println!("Released lock held by actor {}", holder),
                None => println!("Subject was not locked"),
            }

            super::persist(cfg, &engine)?;
        }
    }

    Ok(())
}
