use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::*;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use rpassword::read_password;

use crate::backup::{self, BackupKind, BackupOptions, RestoreOptions};
use crate::cli::ConnectionArgs;
use crate::config::Settings;
use crate::connectors::{self, ConnectionSpec, EngineKind};

pub fn do_backup(
    conn: &ConnectionArgs,
    output: Option<PathBuf>,
    compress: Option<bool>,
    backup_type: Option<String>,
    settings: &Settings,
    verbose: bool,
) -> Result<()> {
    let spec = build_spec(conn, settings)?;
    let mut connector = connectors::connect(spec.clone())?;

    let kind: BackupKind = backup_type
        .as_deref()
        .unwrap_or(&settings.backup.default_type)
        .parse()?;
    let compress = compress.unwrap_or(settings.backup.compress);

    connector.test_connection()?;
    println!("{} {}", "✔".green().bold(), "Connection successful".green());

    let output_dir = output.unwrap_or_else(|| settings.storage.local_path.clone());
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = output_dir.join(format!(
        "{}_{}_{}",
        sanitize_label(&spec.database),
        kind,
        timestamp
    ));
    if verbose {
        println!(
            "{}",
            format!("Writing backup to {}*", stem.display()).dimmed()
        );
    }

    let bar = create_progress_bar(&format!(
        "Backing up {} database '{}'",
        spec.kind, spec.database
    ));
    let started = Instant::now();
    let outcome = backup::backup(
        connector.as_ref(),
        &BackupOptions {
            kind,
            output_path: stem,
            compress,
        },
    );
    bar.finish_and_clear();
    let result = outcome?;
    connector.close()?;

    println!("{} {}", "✔".green().bold(), "Backup complete".green());
    println!("  File:     {}", result.file_path.display());
    println!("  Size:     {}", format_bytes(result.size));
    println!("  Duration: {:.2?}", started.elapsed());
    Ok(())
}

pub fn do_restore(
    conn: &ConnectionArgs,
    file: PathBuf,
    tables: Vec<String>,
    settings: &Settings,
    verbose: bool,
) -> Result<()> {
    let spec = build_spec(conn, settings)?;
    let mut connector = connectors::connect(spec.clone())?;

    // A missing SQLite file is created by the restore itself, so the
    // probe is skipped for that one case.
    let fresh_sqlite = spec.kind == EngineKind::Sqlite && !Path::new(&spec.database).exists();
    if fresh_sqlite {
        println!(
            "{} {}",
            "i".yellow().bold(),
            format!("Database file '{}' will be created", spec.database).yellow()
        );
    } else {
        connector.test_connection()?;
        println!("{} {}", "✔".green().bold(), "Connection successful".green());
    }

    if verbose {
        println!("{}", format!("Restoring from {}", file.display()).dimmed());
    }

    let bar = create_progress_bar(&format!(
        "Restoring {} database '{}'",
        spec.kind, spec.database
    ));
    let started = Instant::now();
    let outcome = backup::restore(
        connector.as_ref(),
        &RestoreOptions {
            file_path: file,
            tables,
        },
    );
    bar.finish_and_clear();
    outcome?;
    connector.close()?;

    println!("{} {}", "✔".green().bold(), "Restore complete".green());
    println!("  Duration: {:.2?}", started.elapsed());
    Ok(())
}

pub fn do_test(conn: &ConnectionArgs, settings: &Settings) -> Result<()> {
    let spec = build_spec(conn, settings)?;

    println!(
        "{} {}",
        "i".yellow().bold(),
        format!(
            "Testing connection to {} database '{}' at {}:{}",
            spec.kind,
            spec.database,
            spec.host,
            spec.port()
        )
        .yellow()
    );

    let mut connector = connectors::connect(spec)?;
    connector.test_connection()?;
    connector.close()?;

    println!("{} {}", "✔".green().bold(), "Connection successful".green());
    Ok(())
}

pub fn do_list(dir: Option<PathBuf>, settings: &Settings) -> Result<()> {
    let dir = dir.unwrap_or_else(|| settings.storage.local_path.clone());
    if !dir.exists() {
        println!(
            "{} {}",
            "i".yellow().bold(),
            format!(
                "No backups found; directory '{}' does not exist",
                dir.display()
            )
            .yellow()
        );
        return Ok(());
    }

    let mut backups = Vec::new();
    for entry in
        fs::read_dir(&dir).with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_file() || !is_backup_file(&name) {
            continue;
        }
        let meta = entry.metadata()?;
        let modified: DateTime<Local> = meta.modified()?.into();
        backups.push((name, meta.len(), modified));
    }

    if backups.is_empty() {
        println!(
            "{} {}",
            "i".yellow().bold(),
            format!("No backups found in '{}'", dir.display()).yellow()
        );
        return Ok(());
    }

    // Newest first.
    backups.sort_by(|a, b| b.2.cmp(&a.2));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Size").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
        ]);
    for (name, size, modified) in &backups {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format_bytes(*size)),
            Cell::new(modified.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }
    println!("{table}");
    println!(
        "\nTotal: {} backup(s) in {}",
        backups.len(),
        dir.canonicalize().unwrap_or(dir).display()
    );
    Ok(())
}

/// Merge CLI flags over config-file defaults into a connection
/// specification. Flags always win; the password is prompted for when
/// a username is present but no password was supplied anywhere.
fn build_spec(conn: &ConnectionArgs, settings: &Settings) -> Result<ConnectionSpec> {
    let db = &settings.default_database;
    let kind_str = conn
        .db_type
        .clone()
        .or_else(|| (!db.kind.is_empty()).then(|| db.kind.clone()))
        .unwrap_or_default();
    let kind: EngineKind = kind_str.parse()?;

    let username = conn.username.clone().unwrap_or_else(|| db.username.clone());
    let password = match &conn.password {
        Some(password) => password.clone(),
        None if !db.password.is_empty() => db.password.clone(),
        None if !username.is_empty() => {
            prompt_password(&format!("Password for user '{username}': "))?
        }
        None => String::new(),
    };

    Ok(ConnectionSpec {
        kind,
        host: conn.host.clone().unwrap_or_else(|| db.host.clone()),
        port: conn.port.unwrap_or(db.port),
        username,
        password,
        database: conn.database.clone(),
    })
}

fn prompt_password(message: &str) -> Result<String> {
    print!("{} {}", "?".cyan().bold(), message.cyan());
    std::io::Write::flush(&mut std::io::stdout())?;
    let password = read_password()?; // input hidden
    Ok(password)
}

fn create_progress_bar(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    bar.set_message(prefix.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}

fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!(
        "{:.1} {}B",
        bytes as f64 / div as f64,
        b"KMGTPE"[exp] as char
    )
}

/// Database identifiers can be file paths (SQLite); squash anything
/// unfriendly to a flat file name.
fn sanitize_label(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let label = label.trim_matches('_');
    if label.is_empty() {
        "db".to_string()
    } else {
        label.to_string()
    }
}

fn is_backup_file(name: &str) -> bool {
    const EXTENSIONS: [&str; 6] = [
        ".sql",
        ".sql.gz",
        ".archive",
        ".archive.gz",
        ".backup",
        ".backup.gz",
    ];
    EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
