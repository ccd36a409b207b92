pub mod columns;
pub mod filters;
pub mod reconcile;
pub mod settings;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use crate::error::Result;
use crate::filters::{FilterSet, FilterStore};
use crate::models::Side;
use crate::normalizer::DuplicatePolicy;
use crate::settings::load_settings;

#[derive(Parser)]
#[command(
    name = "mutabakat",
    version,
    about = "Depo cari ekstresi ile eczane alış kayıtlarının mutabakatı."
)]
pub struct Cli {
    /// Filter file to use (default: settings, then next to the executable)
    #[arg(long, global = true)]
    pub filters: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a wholesaler statement against the pharmacy ledger.
    Reconcile {
        /// Wholesaler (depo) statement: xlsx, xls, ods or csv
        #[arg(long)]
        depo: PathBuf,
        /// Pharmacy (eczane) ledger export: xlsx, xls, ods or csv
        #[arg(long)]
        eczane: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Write the report to an xlsx workbook
        #[arg(long)]
        export: Option<PathBuf>,
        /// Override the duplicate invoice policy from settings
        #[arg(long, value_enum)]
        duplicates: Option<DuplicateArg>,
    },
    /// Show a file's columns and the schema resolved from them.
    Columns {
        file: PathBuf,
        #[arg(long, value_enum)]
        side: SideArg,
    },
    /// Manage row-exclusion filters.
    Filters {
        #[command(subcommand)]
        command: FiltersCommands,
    },
    /// Show or change settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
pub enum FiltersCommands {
    /// List the stored rules.
    Show,
    /// List a file's columns that can serve as filters, with their values.
    Candidates {
        file: PathBuf,
        #[arg(long, value_enum)]
        side: SideArg,
    },
    /// Exclude rows whose column holds one of the given values.
    Add {
        #[arg(long, value_enum)]
        side: SideArg,
        #[arg(long)]
        column: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Remove a value, or the whole column when no value is given.
    Remove {
        #[arg(long, value_enum)]
        side: SideArg,
        #[arg(long)]
        column: String,
        value: Option<String>,
    },
    /// Remove all rules of one side, or of both.
    Clear {
        #[arg(long, value_enum)]
        side: Option<SideArg>,
    },
    /// Turn saving of filter edits on or off.
    Remember {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the current settings.
    Show,
    /// Set a key: filter_file, duplicate_policy, export_dir.
    Set { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Depo,
    Eczane,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Depo => Side::Depo,
            SideArg::Eczane => Side::Eczane,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    LastWins,
    FirstWins,
    Reject,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::LastWins => DuplicatePolicy::LastWins,
            DuplicateArg::FirstWins => DuplicatePolicy::FirstWins,
            DuplicateArg::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Open the filter store chosen by `--filters` or the settings.
///
/// Used by the editing commands: an unreadable file is an error, so an
/// edit never overwrites it.
pub(crate) fn open_filter_store(cli_override: Option<&Path>) -> Result<(FilterStore, FilterSet)> {
    let store = load_settings().filter_store(cli_override)?;
    tracing::debug!(path = %store.path().display(), "loading filter file");
    let filters = store.load()?;
    Ok((store, filters))
}

/// Rules for a read-only use. An unreadable file counts as no rules.
pub(crate) fn read_filters(cli_override: Option<&Path>) -> Result<(FilterStore, FilterSet)> {
    let store = load_settings().filter_store(cli_override)?;
    let (filters, problem) = store.load_or_empty();
    if let Some(e) = problem {
        tracing::warn!(path = %store.path().display(), error = %e, "ignoring filter file");
        eprintln!("{} {e} (filtreler boş kabul edildi)", "Uyarı:".yellow().bold());
    }
    Ok((store, filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_filters_add() {
        let cli = Cli::parse_from([
            "mutabakat", "--filters", "f.json", "filters", "add", "--side", "depo", "--column", "Tip",
            "İade", "Virman",
        ]);
        assert_eq!(cli.filters.as_deref(), Some(std::path::Path::new("f.json")));
        match cli.command {
            Commands::Filters {
                command: FiltersCommands::Add { side, column, values },
            } => {
                assert_eq!(Side::from(side), Side::Depo);
                assert_eq!(column, "Tip");
                assert_eq!(values, vec!["İade", "Virman"]);
            }
            _ => panic!("expected filters add"),
        }
    }

    #[test]
    fn test_parse_duplicate_policy_arg() {
        let cli = Cli::parse_from([
            "mutabakat", "reconcile", "--depo", "d.xlsx", "--eczane", "e.xlsx", "--duplicates",
            "first-wins",
        ]);
        match cli.command {
            Commands::Reconcile { duplicates, .. } => {
                assert_eq!(duplicates.map(DuplicatePolicy::from), Some(DuplicatePolicy::FirstWins));
            }
            _ => panic!("expected reconcile"),
        }
    }
}
