use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// dbkeeper: backup and restore utility for multiple database engines
#[derive(Parser, Debug)]
#[command(
    name = "dbkeeper",
    version,
    about = "Back up and restore PostgreSQL, MySQL, MongoDB, and SQLite databases.",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config file (defaults to ./.dbkeeper.yaml, then ~/.dbkeeper.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags shared by backup, restore, and test.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Database type (postgres, mysql, mongodb, sqlite)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub db_type: Option<String>,

    /// Database host
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Database port (default depends on the database type)
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Database username
    #[arg(short = 'u', long = "user")]
    pub username: Option<String>,

    /// Database password (prompted when --user is set and this is omitted)
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Database name (file path for sqlite)
    #[arg(short = 'd', long)]
    pub database: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a database backup
    Backup {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Output directory for backup files
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Compress the backup file with gzip (overrides the config default)
        #[arg(short = 'c', long, value_name = "BOOL")]
        compress: Option<bool>,

        /// Backup type (full, incremental, differential)
        #[arg(short = 'b', long = "backup-type")]
        backup_type: Option<String>,
    },

    /// Restore a database from a backup file
    Restore {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Backup file to restore from
        #[arg(short = 'f', long)]
        file: PathBuf,

        /// Specific tables to restore (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
    },

    /// Test a database connection without backing anything up
    Test {
        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// List backup files in a directory
    List {
        /// Directory to list backups from
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },
}
