//! Commands for inspecting subjects.

use structopt::StructOpt;
use uuid::Uuid;

use crate::{
    Config,
    Result,
    audit::Actor,
    models::Subject,
};
use super::util::print_table;

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List all subjects
    #[structopt(name = "list")]
    List,
    /// Show current state of a subject
    #[structopt(name = "show")]
    Show {
        subject: Uuid,
    },
    /// List all versions of a subject
    #[structopt(name = "history")]
    History {
        subject: Uuid,
    },
    /// Show audit log of a subject
    #[structopt(name = "diary")]
    Diary {
        subject: Uuid,
    },
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    let engine = super::open(cfg)?;

    match opts.command {
        Command::List => {
            let subjects = engine.subject_ids()
                .into_iter()
                .map(|id| engine.get_subject(id))
                .collect::<Result<Vec<_>, _>>()?;

            let rows = subjects.iter()
                .map(|s| (
                    s.id.to_string(),
                    format!("{:?}", s.kind),
                    format!("{:?}", s.lifecycle()),
                    s.title.as_str(),
                ))
                .collect::<Vec<_>>();

            print_table(("ID", "Kind", "State", "Title"), &rows);
        }
        Command::Show { subject } => show(&engine.get_subject(subject)?)?,
        Command::History { subject } => {
            let rows = engine.historical(subject)?
                .iter()
                .map(|v| (
                    v.number.to_string(),
                    format!("{:?}", v.tag),
                    v.predecessor.map_or_else(String::new, |p| p.to_string()),
                    v.derived_from.map_or_else(String::new, |p| p.to_string()),
                    v.content.0.clone(),
                ))
                .collect::<Vec<_>>();

            print_table(
                ("Version", "Tag", "Predecessor", "Derived from", "Content"),
                &rows,
            );
        }
        Command::Diary { subject } => {
            let rows = engine.diary(subject)?
                .iter()
                .map(|e| (
                    e.timestamp.to_rfc3339(),
                    match e.actor {
                        Actor::System => "system".to_string(),
                        Actor::User(id) => id.to_string(),
                    },
                    e.context.clone(),
                    e.kind.clone(),
                ))
                .collect::<Vec<_>>();

            print_table(("Time", "Actor", "Context", "Kind"), &rows);
        }
    }

    Ok(())
}

fn show(subject: &Subject) -> Result<()> {
    println!("Subject:    {}", subject.id);
    println!("Title:      {}", subject.title);
    println!("Kind:       {:?}", subject.kind);
    println!("Owner:      {}", subject.owner);
    println!("State:      {:?} ({:?})", subject.lifecycle(), subject.state);
    println!("Reference:  {}", subject.reference);

    if let Some(ref lock) = subject.lock {
        println!("Locked by:  {} since {}", lock.holder, lock.acquired);
    }
    if let Some(version) = subject.published {
        println!("Published:  {}", version);
    }
    if let Some(version) = subject.working {
        println!("Working:    {}", version);
    }
    if let Some(ref cycle) = subject.review.current {
        println!("Review due: {} (cycle {})", cycle.due, cycle.number);
    }

    for (role, members) in &[
        ("Verifiers", &subject.assignments.verifiers),
        ("Approvers", &subject.assignments.approvers),
        ("Publishers", &subject.assignments.publishers),
        ("Viewers", &subject.assignments.viewers),
    ] {
        if !members.is_empty() {
            println!("{:11} {:?}", format!("{}:", role), members);
        }
    }

    Ok(())
}
