//! Commands for periodic reviews.

use chrono::{NaiveDate, Utc};
use structopt::StructOpt;

use crate::{Config, Result, engine::DueReview};
use super::util::{parse_date, print_table};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List subjects due for a review reminder
    #[structopt(name = "due")]
    Due {
        /// Day to check (YYYY-MM-DD), today if omitted
        #[structopt(long = "at", parse(try_from_str = parse_date))]
        at: Option<NaiveDate>,
    },
    /// Send reminders for all reviews coming due
    #[structopt(name = "remind")]
    Remind,
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    let engine = super::open(cfg)?;

    match opts.command {
        Command::Due { at } => {
            let at = at.unwrap_or_else(|| Utc::now().naive_utc().date());
            print_due(&engine.due_for_reminder(at).collect::<Vec<_>>());
        }
        Command::Remind => {
            let reminded = engine.send_review_reminders();
            super::persist(cfg, &engine)?;

            println!("Sent {} review reminders", reminded.len());
            print_due(&reminded);
        }
    }

    Ok(())
}

fn print_due(due: &[DueReview]) {
    let rows = due.iter()
        .map(|d| (
            d.subject.to_string(),
            d.due.to_string(),
            d.owner.to_string(),
            d.title.as_str(),
        ))
        .collect::<Vec<_>>();

    print_table(("Subject", "Due", "Owner", "Title"), &rows);
}
