use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;

use crate::{
    Result,
    config::{self, Config},
    engine::{Engine, Settings, State},
    events::LogDispatcher,
    models::StaticDirectory,
};

mod lock;
mod read_confirmations;
mod reviews;
mod subject;
mod util;

#[derive(StructOpt)]
struct Opts {
    /// Configuration file
    #[structopt(long = "config", short = "c", default_value = "config.toml",
        parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Inspect subjects
    #[structopt(name = "subject")]
    Subject(subject::Opts),
    /// Inspect and remind about periodic reviews
    #[structopt(name = "reviews")]
    Reviews(reviews::Opts),
    /// Inspect and remind about read confirmations
    #[structopt(name = "read-confirmations")]
    ReadConfirmations(read_confirmations::Opts),
    /// Manage editing locks
    #[structopt(name = "lock")]
    Lock(lock::Opts),
    /// Manage configuration
    #[structopt(name = "config")]
    Config(ConfigOpts),
}

#[derive(StructOpt)]
enum ConfigOpts {
    /// Validate configuration and print a summary
    #[structopt(name = "check")]
    Check,
}

pub fn main() -> Result<()> {
    let opts = Opts::from_args();
    let config = config::load(&opts.config)?;

    setup_logging(&config.logging)?;

    // Run validation after logging setup so that problems are logged too.
    config.validate()?;

    match opts.command {
        Command::Subject(opts) => subject::main(&config, opts),
        Command::Reviews(opts) => reviews::main(&config, opts),
        Command::ReadConfirmations(opts) => read_confirmations::main(&config, opts),
        Command::Lock(opts) => lock::main(&config, opts),
        Command::Config(ConfigOpts::Check) => check_config(&config),
    }
}

fn setup_logging(config: &config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);

    for (module, level) in &config.filters {
        builder.filter_module(&module, *level);
    }

    builder.try_init()?;
    Ok(())
}

/// Create an engine for `config`, with state loaded from its storage.
fn open(config: &Config) -> Result<Engine> {
    let directory = StaticDirectory::from_config(&config.actors);
    let engine = Engine::builder(Arc::new(directory))
        .dispatcher(Arc::new(LogDispatcher))
        .settings(Settings::from_config(config))
        .build();

    engine.restore(State::load(&config.storage.path)?);

    Ok(engine)
}

/// Write engine's state back to storage.
fn persist(config: &Config, engine: &Engine) -> Result<()> {
    engine.snapshot().save(&config.storage.path)?;
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    println!("Configuration is valid");
    println!("State: {}", config.storage.path.display());
    println!("Review every {} days, remind {} days ahead",
        config.review.interval_days, config.review.lead_days);
    println!("Broken references block transitions: {}",
        config.workflow.block_broken_references);

    let rows = config.actors.iter()
        .map(|actor| (
            actor.id.to_string(),
            actor.name.as_str(),
            util::format_permissions(&actor.permissions),
        ))
        .collect::<Vec<_>>();

    util::print_table(("ID", "Name", "Permissions"), &rows);

    Ok(())
}
