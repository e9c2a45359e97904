use std::fs;
use std::io::{self, Read, Write};
use std::sync::Arc;

use super::runner::{CommandRunner, Invocation};
use super::{ConnectionSpec, Connector, EngineKind, backup_error, probe_error, restore_error};
use crate::error::{Error, Result};

/// SQLite connector. The "connection" is a file on local storage; the
/// dump is the textual SQL script produced by `sqlite3 .dump`, and
/// restore replays that script against the (possibly freshly created)
/// file.
pub struct SqliteConnector {
    spec: ConnectionSpec,
    runner: Arc<dyn CommandRunner>,
}

impl SqliteConnector {
    pub fn new(spec: ConnectionSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self { spec, runner }
    }
}

impl Connector for SqliteConnector {
    fn kind(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn test_connection(&self) -> Result<()> {
        let meta = match fs::metadata(&self.spec.database) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::Connection(format!(
                    "database file does not exist: {}",
                    self.spec.database
                )));
            }
            Err(err) => {
                return Err(Error::Connection(format!(
                    "cannot access database file {}: {err}",
                    self.spec.database
                )));
            }
        };
        if meta.is_dir() {
            return Err(Error::Connection(format!(
                "path is a directory, not a database file: {}",
                self.spec.database
            )));
        }

        let probe = Invocation::new("sqlite3")
            .arg(&self.spec.database)
            .arg("SELECT 1");
        self.runner.run(&probe).map_err(probe_error)
    }

    fn backup(&self, sink: &mut dyn Write) -> Result<()> {
        let dump = Invocation::new("sqlite3")
            .arg(&self.spec.database)
            .arg(".dump");
        self.runner.run_to_sink(&dump, sink).map_err(backup_error)
    }

    fn restore(&self, source: &mut dyn Read) -> Result<()> {
        // sqlite3 creates the file on first write, so a missing target
        // is fine here.
        let replay = Invocation::new("sqlite3").arg(&self.spec.database);
        self.runner
            .run_from_source(&replay, source)
            .map_err(restore_error)
    }
}
