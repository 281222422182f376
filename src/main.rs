//! lexibase: keeps the GraphQL schema of a Dgraph database in sync with the
//! one this application expects, and stores affixes in it.

use clap::{CommandFactory, FromArgMatches};
use std::env;

use crate::{
    args::{Args, Command},
    config::Config,
    db::Client,
    prelude::*,
    schema::Synchronizer,
};

mod affix;
mod args;
mod cmd;
mod config;
mod db;
mod logger;
mod prelude;
mod schema;
mod util;
mod version;


#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Log error in case stdout is not connected and it is logged into a file.
        error!("{:?}", e);

        // Show a somewhat nice representation of the error
        eprintln!();
        eprintln!();
        bunt::eprintln!("{$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
        eprintln!();
        if e.chain().len() > 1 {
            bunt::eprintln!("{$red+italic}Caused by:{/$}");
        }

        for (i, cause) in e.chain().skip(1).enumerate() {
            eprint!(" {: >1$}", "", i * 2);
            eprintln!("‣ {cause}");
        }

        std::process::exit(1);
    }
}

/// Main entry point.
async fn run() -> Result<()> {
    // If `RUST_BACKTRACE` wasn't already set, we default to `1`. Backtraces are
    // almost always useful for debugging and panics are not expected to occur
    // regularly.
    if env::var("RUST_BACKTRACE") == Err(env::VarError::NotPresent) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    // The version string is only known at runtime.
    let args = Args::from_arg_matches(
        &Args::command()
            .version(version::full())
            .get_matches(),
    )?;

    bunt::set_stdout_color_choice(args.stdout_color());
    bunt::set_stderr_color_choice(args.stderr_color());


    match &args.cmd {
        Command::Schema { cmd, shared } => {
            let config = load_config_and_init_logger(shared, &args, "schema")?;
            schema::cmd::run(cmd, &config).await?;
        }
        Command::Affix { cmd, shared } => {
            let config = load_config_and_init_logger(shared, &args, "affix")?;
            affix::cmd::run(cmd, &config).await?;
        }
        Command::Check { shared } => cmd::check::run(shared, &args).await?,
        Command::WriteConfig { target } => config::write_template(target.as_ref())?,
    }

    Ok(())
}


fn load_config_and_init_logger(shared: &args::Shared, args: &Args, cmd: &str) -> Result<Config> {
    let (config, path) = match &shared.config {
        Some(path) => {
            let config = Config::load_from(path)
                .context(format!("failed to load config from '{}'", path.display()))?;
            (config, path.clone())
        }
        None => Config::from_env_or_default_locations()?,
    };

    // Initialize logger. Unfortunately, we can only do this here
    // after reading the config.
    logger::init(&config.log, args.stdout_color(), cmd)?;
    info!("Loaded config from '{}'", path.display());
    debug!("Running {}", version::identifier());
    trace!("Configuration: {:#?}", config);

    Ok(config)
}

/// Creates a Dgraph client and makes sure the expected schema is installed
/// before returning it.
async fn connect_and_sync_schema(config: &Config) -> Result<Client> {
    let client = Client::new(&config.db).context("failed to create Dgraph client")?;
    schema::cmd::create(&Synchronizer::new(client.clone()), config).await?;
    Ok(client)
}
