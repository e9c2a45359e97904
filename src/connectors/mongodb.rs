use std::io::{Read, Write};
use std::sync::Arc;

use super::runner::{CommandRunner, Invocation};
use super::{ConnectionSpec, Connector, EngineKind, backup_error, probe_error, restore_error};
use crate::error::Result;

/// MongoDB connector driving `mongodump` and `mongorestore` in archive
/// mode, so the whole database moves as one continuous byte stream.
pub struct MongoConnector {
    spec: ConnectionSpec,
    runner: Arc<dyn CommandRunner>,
}

impl MongoConnector {
    pub fn new(spec: ConnectionSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self { spec, runner }
    }

    fn connection_uri(&self) -> String {
        if self.spec.username.is_empty() {
            format!(
                "mongodb://{}:{}/{}",
                self.spec.host,
                self.spec.port(),
                self.spec.database
            )
        } else {
            format!(
                "mongodb://{}:{}@{}:{}/{}",
                self.spec.username,
                self.spec.password,
                self.spec.host,
                self.spec.port(),
                self.spec.database
            )
        }
    }

    fn with_archive_args(&self, inv: Invocation) -> Invocation {
        let mut inv = inv
            .arg("--host")
            .arg(&self.spec.host)
            .arg("--port")
            .arg(self.spec.port().to_string())
            .arg("--db")
            .arg(&self.spec.database)
            .arg("--archive");
        if !self.spec.username.is_empty() {
            // Credentials authenticate against the admin namespace.
            inv = inv
                .arg("--username")
                .arg(&self.spec.username)
                .arg("--password")
                .arg(&self.spec.password)
                .arg("--authenticationDatabase")
                .arg("admin");
        }
        inv
    }

    fn ping(&self, shell: &str) -> Invocation {
        Invocation::new(shell)
            .arg(self.connection_uri())
            .arg("--eval")
            .arg("db.runCommand({ ping: 1 })")
    }
}

impl Connector for MongoConnector {
    fn kind(&self) -> EngineKind {
        EngineKind::MongoDb
    }

    fn test_connection(&self) -> Result<()> {
        if self.runner.run(&self.ping("mongosh")).is_ok() {
            return Ok(());
        }
        // Older deployments only ship the legacy shell.
        self.runner.run(&self.ping("mongo")).map_err(probe_error)
    }

    fn backup(&self, sink: &mut dyn Write) -> Result<()> {
        let dump = self.with_archive_args(Invocation::new("mongodump"));
        self.runner.run_to_sink(&dump, sink).map_err(backup_error)
    }

    fn restore(&self, source: &mut dyn Read) -> Result<()> {
        let replay = self.with_archive_args(Invocation::new("mongorestore"));
        self.runner
            .run_from_source(&replay, source)
            .map_err(restore_error)
    }
}
