mod cli;
mod error;
mod export;
mod filters;
mod fmt;
mod loader;
mod matcher;
mod models;
mod normalizer;
mod report;
mod schema;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, FiltersCommands, SettingsCommands, Toggle};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let filters = cli.filters.as_deref();

    let result = match cli.command {
        Commands::Reconcile {
            depo,
            eczane,
            json,
            export,
            duplicates,
        } => cli::reconcile::run(
            &depo,
            &eczane,
            filters,
            json,
            export.as_deref(),
            duplicates.map(Into::into),
        ),
        Commands::Columns { file, side } => cli::columns::run(&file, side.into()),
        Commands::Filters { command } => match command {
            FiltersCommands::Show => cli::filters::show(filters),
            FiltersCommands::Candidates { file, side } => cli::filters::candidates(&file, side.into()),
            FiltersCommands::Add {
                side,
                column,
                values,
            } => cli::filters::add(filters, side.into(), &column, &values),
            FiltersCommands::Remove {
                side,
                column,
                value,
            } => cli::filters::remove(filters, side.into(), &column, value.as_deref()),
            FiltersCommands::Clear { side } => cli::filters::clear(filters, side.map(Into::into)),
            FiltersCommands::Remember { state } => cli::filters::remember(filters, state == Toggle::On),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show => cli::settings::show(),
            SettingsCommands::Set { key, value } => cli::settings::set(&key, &value),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
