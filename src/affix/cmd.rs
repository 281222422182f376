use crate::{config::Config, prelude::*};

use super::{AffixType, NewAffix, Tongue};


#[derive(Debug, clap::Subcommand)]
pub(crate) enum AffixCommand {
    /// Stores a new affix. Fails if one with the same morpheme exists.
    Add {
        /// The affix itself, e.g. "pre".
        #[clap(long)]
        morpheme: String,

        #[clap(long, value_enum)]
        tongue: Option<Tongue>,

        /// Can be given multiple times.
        #[clap(long = "type", value_enum)]
        kinds: Vec<AffixType>,

        /// Can be given multiple times.
        #[clap(long)]
        meaning: Vec<String>,

        /// Can be given multiple times.
        #[clap(long)]
        example: Vec<String>,
    },

    /// Prints the affix with the given ID as JSON.
    Get {
        id: String,
    },

    /// Prints the affix with the given morpheme as JSON.
    Find {
        morpheme: String,
    },
}

/// Entry point for `affix` commands.
pub(crate) async fn run(cmd: &AffixCommand, config: &Config) -> Result<()> {
    let db = crate::connect_and_sync_schema(config).await?;

    let affix = match cmd {
        AffixCommand::Add { morpheme, tongue, kinds, meaning, example } => {
            let new = NewAffix {
                example: example.clone(),
                meaning: meaning.clone(),
                morpheme: morpheme.clone(),
                tongue: *tongue,
                kinds: kinds.clone(),
            };
            let affix = super::add(&db, new).await.context("failed to add affix")?;
            info!("Added affix '{}' with ID {}", affix.morpheme, affix.id);
            affix
        }
        AffixCommand::Get { id } => super::one(&db, id)
            .await
            .with_context(|| format!("failed to load affix '{id}'"))?,
        AffixCommand::Find { morpheme } => super::one_by_morpheme(&db, morpheme)
            .await
            .with_context(|| format!("failed to find affix '{morpheme}'"))?,
    };

    println!("{}", serde_json::to_string_pretty(&affix)?);
    Ok(())
}
