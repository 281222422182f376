//! This module defines the command line arguments lexibase accepts.

use std::{io::IsTerminal, path::PathBuf};
use termcolor::ColorChoice;

use crate::{affix::cmd::AffixCommand, schema::cmd::SchemaCommand};


#[derive(Debug, clap::Parser)]
#[clap(about = "Keeps the GraphQL schema of a Dgraph database in sync and stores affixes in it.")]
pub(crate) struct Args {
    #[clap(subcommand)]
    pub(crate) cmd: Command,

    /// Whether to use colors and other terminal styling in the output.
    #[clap(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub(crate) color: ColorMode,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
    /// Operations on the GraphQL schema installed in Dgraph.
    Schema {
        #[clap(subcommand)]
        cmd: SchemaCommand,

        #[clap(flatten)]
        shared: Shared,
    },

    /// Stores and loads affixes. Makes sure the schema is installed first.
    Affix {
        #[clap(subcommand)]
        cmd: AffixCommand,

        #[clap(flatten)]
        shared: Shared,
    },

    /// Checks the configuration, the connection to Dgraph and the installed
    /// schema.
    ///
    /// Exits with 0 if everything is Ok, and with 1 otherwise.
    Check {
        #[clap(flatten)]
        shared: Shared,
    },

    /// Outputs a template for the configuration file (which includes
    /// descriptions of all options).
    WriteConfig {
        /// Target file. If not specified, the template is written to stdout.
        target: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct Shared {
    /// Path to the configuration file. If this is not specified, lexibase will
    /// check `LEXIBASE_CONFIG_PATH` and then try opening `config.toml` or
    /// `/etc/lexibase/config.toml`.
    #[clap(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ColorMode {
    Auto,
    Always,
    Never,
}

impl Args {
    pub(crate) fn stdout_color(&self) -> ColorChoice {
        self.color.choice(std::io::stdout().is_terminal())
    }

    pub(crate) fn stderr_color(&self) -> ColorChoice {
        self.color.choice(std::io::stderr().is_terminal())
    }
}

impl ColorMode {
    fn choice(self, is_terminal: bool) -> ColorChoice {
        match self {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto if is_terminal => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
        }
    }
}


#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, ColorMode, Command};
    use crate::schema::cmd::SchemaCommand;

    #[test]
    fn definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn color_flag_is_global() {
        let args = Args::try_parse_from([
            "lexibase", "schema", "drop-all", "--yes-absolutely-drop-all",
            "--color", "never", "-c", "dev.toml",
        ]).unwrap();

        assert_eq!(args.color, ColorMode::Never);
        match args.cmd {
            Command::Schema { cmd: SchemaCommand::DropAll { yes_absolutely_drop_all }, shared } => {
                assert!(yes_absolutely_drop_all);
                assert_eq!(shared.config.unwrap().to_str(), Some("dev.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn affix_type_can_repeat() {
        let args = Args::try_parse_from([
            "lexibase", "affix", "add", "--morpheme", "pre",
            "--type", "prefix", "--type", "prefixioid", "--tongue", "english",
        ]).unwrap();

        assert!(matches!(args.cmd, Command::Affix { .. }));
    }

    #[test]
    fn config_path_accepted_before_and_after_nested_subcommand() {
        for argv in [
            &["lexibase", "schema", "-c", "dev.toml", "create"][..],
            &["lexibase", "schema", "create", "--config", "dev.toml"][..],
            &["lexibase", "affix", "get", "0x2a", "-c", "dev.toml"][..],
        ] {
            let args = Args::try_parse_from(argv).unwrap();
            let shared = match args.cmd {
                Command::Schema { shared, .. } | Command::Affix { shared, .. } => shared,
                other => panic!("unexpected command: {other:?}"),
            };
            assert_eq!(shared.config.unwrap().to_str(), Some("dev.toml"), "{argv:?}");
        }
    }
}
