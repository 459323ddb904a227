//! Commands for read confirmations.

use structopt::StructOpt;
use uuid::Uuid;

use crate::{Config, Result, models::VersionId};
use super::util::print_table;

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List read confirmations of a version
    #[structopt(name = "list")]
    List(VersionOpts),
    /// List actors who have yet to confirm reading a version
    #[structopt(name = "pending")]
    Pending(VersionOpts),
    /// Remind actors who have yet to confirm reading a version
    #[structopt(name = "remind")]
    Remind(VersionOpts),
}

#[derive(StructOpt)]
pub struct VersionOpts {
    subject: Uuid,
    /// Version number
    version: u32,
}

impl VersionOpts {
    fn id(&self) -> VersionId {
        VersionId::new(self.subject, self.version)
    }
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    let engine = super::open(cfg)?;

    match opts.command {
        Command::List(opts) => {
            let rows = engine.list_read_confirmations(opts.id())?
                .iter()
                .map(|rc| (
                    rc.actor.to_string(),
                    rc.assigned.to_rfc3339(),
                    rc.confirmed.map_or_else(String::new, |t| t.to_rfc3339()),
                    rc.reminded.map_or_else(String::new, |t| t.to_rfc3339()),
                ))
                .collect::<Vec<_>>();

            print_table(("Actor", "Assigned", "Confirmed", "Reminded"), &rows);
        }
        Command::Pending(opts) => {
            for actor in engine.pending_read_confirmations(opts.id())? {
                println!("{}", actor);
            }
        }
        Command::Remind(opts) => {
            let reminded = engine.send_read_confirmation_reminders(opts.id())?;
            super::persist(cfg, &engine)?;

            println!("Reminded {} actors", reminded.len());
        }
    }

    Ok(())
}
