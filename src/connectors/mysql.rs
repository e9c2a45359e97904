use std::io::{Read, Write};
use std::sync::Arc;

use super::runner::{CommandRunner, Invocation};
use super::{ConnectionSpec, Connector, EngineKind, backup_error, probe_error, restore_error};
use crate::error::Result;

/// MySQL connector driving `mysql` and `mysqldump`.
pub struct MySqlConnector {
    spec: ConnectionSpec,
    runner: Arc<dyn CommandRunner>,
}

impl MySqlConnector {
    pub fn new(spec: ConnectionSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self { spec, runner }
    }

    fn with_connection_args(&self, inv: Invocation) -> Invocation {
        inv.arg("-h")
            .arg(&self.spec.host)
            .arg("-P")
            .arg(self.spec.port().to_string())
            .arg("-u")
            .arg(&self.spec.username)
            .arg(format!("-p{}", self.spec.password))
    }

    fn mysql(&self) -> Invocation {
        self.with_connection_args(Invocation::new("mysql"))
            .arg(&self.spec.database)
    }
}

impl Connector for MySqlConnector {
    fn kind(&self) -> EngineKind {
        EngineKind::MySql
    }

    fn test_connection(&self) -> Result<()> {
        let probe = self.mysql().arg("-e").arg("SELECT 1");
        self.runner.run(&probe).map_err(probe_error)
    }

    fn backup(&self, sink: &mut dyn Write) -> Result<()> {
        // Single-transaction gives a consistent dump without locking;
        // routines and triggers ride along.
        let dump = self
            .with_connection_args(Invocation::new("mysqldump"))
            .arg("--single-transaction")
            .arg("--routines")
            .arg("--triggers")
            .arg(&self.spec.database);
        self.runner.run_to_sink(&dump, sink).map_err(backup_error)
    }

    fn restore(&self, source: &mut dyn Read) -> Result<()> {
        self.runner
            .run_from_source(&self.mysql(), source)
            .map_err(restore_error)
    }
}
