use crate::{config::Config, db::Client, prelude::*};

use super::{SchemaState, Synchronizer, CANON};


#[derive(Debug, clap::Subcommand)]
pub(crate) enum SchemaCommand {
    /// Installs the expected GraphQL schema in Dgraph. Does nothing if it is
    /// already installed.
    Create,

    /// Removes all data and the schema from Dgraph.
    DropAll {
        /// If specified, skips the "Are you sure?" question.
        #[clap(long)]
        yes_absolutely_drop_all: bool,
    },

    /// Equivalent to `schema drop-all` followed by `schema create`.
    Reset {
        /// If specified, skips the "Are you sure?" question.
        #[clap(long)]
        yes_absolutely_drop_all: bool,
    },

    /// Shows whether the schema installed in Dgraph is the expected one.
    Status,

    /// Prints the expected schema.
    Show,
}

/// Entry point for `schema` commands.
pub(crate) async fn run(cmd: &SchemaCommand, config: &Config) -> Result<()> {
    let connect = || Client::new(&config.db).map(Synchronizer::new);

    match cmd {
        SchemaCommand::Create => create(&connect()?, config).await?,
        SchemaCommand::DropAll { yes_absolutely_drop_all: yes } => {
            drop_all(&connect()?, config, *yes).await?;
        }
        SchemaCommand::Reset { yes_absolutely_drop_all: yes } => {
            let sync = connect()?;
            drop_all(&sync, config, *yes).await?;
            create(&sync, config).await?;
        }
        SchemaCommand::Status => status(&connect()?, config).await?,
        SchemaCommand::Show => print!("{CANON}"),
    }

    Ok(())
}

/// Makes sure the expected schema is installed. Also used by other commands
/// before they touch any data.
pub(crate) async fn create(sync: &Synchronizer<Client>, config: &Config) -> Result<()> {
    sync.create(&config.schema.deadline())
        .await
        .with_context(|| format!("failed to create schema in Dgraph at '{}'", sync.client().host()))
}


// ===== Drop all ==============================================================================

async fn drop_all(sync: &Synchronizer<Client>, config: &Config, yes: bool) -> Result<()> {
    if !yes {
        warn!("You are about to delete all data and the schema stored in Dgraph!");

        println!();
        if let Ok(Ok(hostname)) = hostname::get().map(|n| n.into_string()) {
            println!("Hostname: {hostname}");
        }
        println!("Dgraph host: {}", sync.client().host());
        println!();
        println!("Are you sure you want to completely remove everything in this database? \
            Please double-check the server you are running this on!\n\
            Type 'yes' to proceed to delete the data.");
        crate::cmd::prompt_for_yes()?;
    }

    sync.drop_all(&config.schema.deadline())
        .await
        .with_context(|| format!("failed to drop all data in Dgraph at '{}'", sync.client().host()))
}


// ===== Status ================================================================================

macro_rules! info_line {
    ($label:expr, $value:expr) => {
        bunt::println!("{$dimmed}{}:{/$} {[blue+intense]}", $label, $value);
    };
}

async fn status(sync: &Synchronizer<Client>, config: &Config) -> Result<()> {
    println!();
    bunt::println!("{$bold}# Configuration:{/$}");
    info_line!("Host", sync.client().host());
    info_line!("Ready timeout", format!("{:?}", config.schema.ready_timeout));
    println!();

    let state = sync.status(&config.schema.deadline())
        .await
        .context("failed to retrieve schema from Dgraph")?;

    bunt::println!("{$bold}# Schema:{/$}");
    match state {
        SchemaState::UpToDate => {
            bunt::println!("{$green+intense}Up to date{/$}");
        }
        SchemaState::Missing => {
            bunt::println!("{$yellow+intense}Not installed{/$} {$dimmed}(run `schema create`){/$}");
        }
        SchemaState::Outdated(reason) => {
            bunt::println!(
                "{$red+intense}Outdated:{/$} {} {$dimmed}(run `schema create`){/$}",
                reason,
            );
        }
    }
    println!();

    Ok(())
}


#[cfg(test)]
mod tests {
    use confique::Config as _;

    use crate::config::Config;
    use super::{run, SchemaCommand};

    #[tokio::test]
    async fn show_needs_no_database() {
        let config = Config::builder().load().unwrap();
        run(&SchemaCommand::Show, &config).await.unwrap();
    }
}
