mod backup;
mod cli;
mod config;
mod connectors;
mod error;
mod ops;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use config::Settings;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Backup {
            conn,
            output,
            compress,
            backup_type,
        } => {
            ops::do_backup(&conn, output, compress, backup_type, &settings, cli.verbose)?;
        }
        Commands::Restore { conn, file, tables } => {
            ops::do_restore(&conn, file, tables, &settings, cli.verbose)?;
        }
        Commands::Test { conn } => {
            ops::do_test(&conn, &settings)?;
        }
        Commands::List { dir } => {
            ops::do_list(dir, &settings)?;
        }
    }

    Ok(())
}
