use crate::config::toml_config::TomlConfig;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "dib-migrate")]
#[command(about = "Back up and migrate Dib It user documents to the semester-grouped schema")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "migrate.toml", global = true)]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long, global = true)]
    pub monitor: Option<bool>,

    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Dump the whole collection to a local JSON file
    Backup {
        #[arg(long)]
        output_path: Option<String>,
    },
    /// Migrate legacy documents; writes a preview unless --apply is given
    Migrate {
        /// Write migrated documents back to the store
        #[arg(long)]
        apply: bool,

        /// Only migrate this document, e.g. users/<uid>
        #[arg(long)]
        document: Option<String>,

        #[arg(long)]
        output_path: Option<String>,
    },
    /// Print the effective configuration and exit
    Show,
}

impl CliArgs {
    /// Command line values win over the config file.
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(enabled) = self.monitor {
            config.monitoring = Some(crate::config::toml_config::MonitoringConfig { enabled });
        }

        match &self.command {
            Command::Backup { output_path } => {
                if let Some(path) = output_path {
                    config.backup.output_path = path.clone();
                }
            }
            Command::Migrate {
                apply,
                document,
                output_path,
            } => {
                if *apply {
                    config.migrate.apply = Some(true);
                }
                if document.is_some() {
                    config.migrate.document = document.clone();
                }
                if let Some(path) = output_path {
                    config.migrate.output_path = path.clone();
                }
            }
            Command::Show => {}
        }
    }
}
