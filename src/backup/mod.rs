//! Backup/restore orchestration: composes a connector with the
//! compression stage and owns the artifact lifecycle (create,
//! finalize, delete-on-failure).

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::connectors::{Connector, EngineKind};
use crate::error::{Error, Result};

pub mod compress;

use compress::{ArtifactWriter, GZIP_SUFFIX};

/// Requested backup kind. Only `Full` is honored by the current
/// engines; the others exist so future connectors can opt in through
/// `supports_incremental`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Full,
    Incremental,
    Differential,
}

impl BackupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Incremental => "incremental",
            BackupKind::Differential => "differential",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(BackupKind::Full),
            "incremental" => Ok(BackupKind::Incremental),
            "differential" => Ok(BackupKind::Differential),
            other => Err(Error::Configuration(format!(
                "unsupported backup type: {other}"
            ))),
        }
    }
}

/// Options for one backup call.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub kind: BackupKind,
    /// Path stem; the engine extension and compression suffix are
    /// appended by the orchestrator.
    pub output_path: PathBuf,
    pub compress: bool,
}

/// Options for one restore call.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub file_path: PathBuf,
    /// Selective restore. No current engine implements it, so a
    /// non-empty list is rejected up front instead of silently
    /// performing a full restore.
    pub tables: Vec<String>,
}

/// Outcome of a successful backup. Never constructed for a failed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupResult {
    pub file_path: PathBuf,
    pub size: u64,
}

/// Final artifact name: stem + engine extension + gzip suffix when
/// compression is on. Deterministic for identical inputs.
pub fn artifact_path(kind: EngineKind, stem: &Path, compress: bool) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(extension(kind));
    if compress {
        name.push(GZIP_SUFFIX);
    }
    PathBuf::from(name)
}

fn extension(kind: EngineKind) -> &'static str {
    match kind {
        EngineKind::Postgres | EngineKind::MySql | EngineKind::Sqlite => ".sql",
        EngineKind::MongoDb => ".archive",
    }
}

/// Run one backup: create the artifact, wrap it with the compression
/// stage, delegate the dump to the connector, and finalize. Any
/// failure deletes the partially written artifact before the error
/// propagates, so the output directory never accumulates corrupt
/// files.
pub fn backup(connector: &dyn Connector, opts: &BackupOptions) -> Result<BackupResult> {
    if opts.kind != BackupKind::Full && !connector.supports_incremental() {
        return Err(Error::Configuration(format!(
            "{} backups are not supported by the {} engine",
            opts.kind,
            connector.kind()
        )));
    }

    let path = artifact_path(connector.kind(), &opts.output_path, opts.compress);
    let file = File::create(&path)
        .map_err(|e| Error::Backup(format!("failed to create {}: {e}", path.display())))?;
    let mut writer = ArtifactWriter::new(file, opts.compress);

    if let Err(err) = connector.backup(&mut writer) {
        drop(writer);
        let _ = fs::remove_file(&path);
        return Err(err);
    }

    // Finalize the compressor before reading the size back, or the
    // trailing gzip frame is missing and the size is wrong.
    if let Err(err) = writer.finish() {
        let _ = fs::remove_file(&path);
        return Err(Error::Backup(format!(
            "failed to finalize {}: {err}",
            path.display()
        )));
    }

    let size = fs::metadata(&path)
        .map_err(|e| Error::Backup(format!("failed to stat {}: {e}", path.display())))?
        .len();

    Ok(BackupResult {
        file_path: path,
        size,
    })
}

/// Run one restore: open the artifact read-only, transparently
/// decompress when its name carries the gzip suffix, and delegate the
/// replay to the connector. The artifact itself is never mutated.
pub fn restore(connector: &dyn Connector, opts: &RestoreOptions) -> Result<()> {
    if !opts.tables.is_empty() {
        return Err(Error::Configuration(format!(
            "selective restore is not supported by the {} engine",
            connector.kind()
        )));
    }

    let file = File::open(&opts.file_path).map_err(|e| {
        Error::Restore(format!("failed to open {}: {e}", opts.file_path.display()))
    })?;
    let mut reader = compress::artifact_reader(file, &opts.file_path);
    connector.restore(&mut reader)
}
