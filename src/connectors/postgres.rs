use std::io::{Read, Write};
use std::sync::Arc;

use super::runner::{CommandRunner, Invocation};
use super::{ConnectionSpec, Connector, EngineKind, backup_error, probe_error, restore_error};
use crate::error::Result;

/// PostgreSQL connector driving `psql` and `pg_dump`.
///
/// The password travels in the process-scoped `PGPASSWORD` variable
/// rather than on the command line, so it never shows up in process
/// listings.
pub struct PostgresConnector {
    spec: ConnectionSpec,
    runner: Arc<dyn CommandRunner>,
}

impl PostgresConnector {
    pub fn new(spec: ConnectionSpec, runner: Arc<dyn CommandRunner>) -> Self {
        Self { spec, runner }
    }

    fn with_connection_args(&self, inv: Invocation) -> Invocation {
        inv.arg("-h")
            .arg(&self.spec.host)
            .arg("-p")
            .arg(self.spec.port().to_string())
            .arg("-U")
            .arg(&self.spec.username)
            .arg("-d")
            .arg(&self.spec.database)
            .arg("--no-password")
            .env("PGPASSWORD", &self.spec.password)
    }

    fn psql(&self) -> Invocation {
        self.with_connection_args(Invocation::new("psql"))
    }
}

impl Connector for PostgresConnector {
    fn kind(&self) -> EngineKind {
        EngineKind::Postgres
    }

    fn test_connection(&self) -> Result<()> {
        let probe = self.psql().arg("-c").arg("SELECT 1");
        self.runner.run(&probe).map_err(probe_error)
    }

    fn backup(&self, sink: &mut dyn Write) -> Result<()> {
        // Plain-text format so the dump streams cleanly through the
        // compression stage.
        let dump = self
            .with_connection_args(Invocation::new("pg_dump"))
            .arg("-F")
            .arg("p");
        self.runner.run_to_sink(&dump, sink).map_err(backup_error)
    }

    fn restore(&self, source: &mut dyn Read) -> Result<()> {
        self.runner
            .run_from_source(&self.psql(), source)
            .map_err(restore_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::runner::fake::FakeRunner;
    use crate::error::Error;

    fn connector(runner: Arc<FakeRunner>) -> PostgresConnector {
        PostgresConnector::new(
            ConnectionSpec {
                kind: EngineKind::Postgres,
                host: "db.internal".to_string(),
                port: 0,
                username: "admin".to_string(),
                password: "s3cret".to_string(),
                database: "orders".to_string(),
            },
            runner,
        )
    }

    #[test]
    fn probe_runs_psql_with_a_trivial_query() {
        let runner = Arc::new(FakeRunner::ok());
        connector(runner.clone()).test_connection().unwrap();

        let inv = runner.last();
        assert_eq!(inv.program, "psql");
        assert_eq!(
            inv.args,
            vec![
                "-h",
                "db.internal",
                "-p",
                "5432",
                "-U",
                "admin",
                "-d",
                "orders",
                "--no-password",
                "-c",
                "SELECT 1"
            ]
        );
    }

    #[test]
    fn password_goes_through_the_environment_not_the_argv() {
        let runner = Arc::new(FakeRunner::ok());
        connector(runner.clone()).test_connection().unwrap();

        let inv = runner.last();
        assert_eq!(inv.env, vec![("PGPASSWORD".to_string(), "s3cret".to_string())]);
        assert!(!inv.args.iter().any(|a| a.contains("s3cret")));
    }

    #[test]
    fn backup_streams_pg_dump_output_into_the_sink() {
        let runner = Arc::new(FakeRunner::with_stdout(b"CREATE TABLE t;\n"));
        let mut sink = Vec::new();
        connector(runner.clone()).backup(&mut sink).unwrap();

        assert_eq!(sink, b"CREATE TABLE t;\n");
        let inv = runner.last();
        assert_eq!(inv.program, "pg_dump");
        assert!(inv.args.windows(2).any(|w| w == ["-F", "p"]));
        assert!(inv.args.contains(&"--no-password".to_string()));
    }

    #[test]
    fn restore_feeds_the_artifact_into_psql_stdin() {
        let runner = Arc::new(FakeRunner::ok());
        let mut source = &b"INSERT INTO t VALUES (1);\n"[..];
        connector(runner.clone()).restore(&mut source).unwrap();

        assert_eq!(runner.last().program, "psql");
        assert_eq!(&*runner.stdin.lock().unwrap(), b"INSERT INTO t VALUES (1);\n");
    }

    #[test]
    fn missing_client_binary_is_distinguished() {
        let runner = Arc::new(FakeRunner::missing());
        let err = connector(runner).backup(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(tool) if tool == "pg_dump"));
    }

    #[test]
    fn failed_probe_surfaces_the_tool_output() {
        let runner = Arc::new(FakeRunner::failing("FATAL: password authentication failed"));
        let err = connector(runner).test_connection().unwrap_err();
        match err {
            Error::Connection(detail) => assert!(detail.contains("authentication failed")),
            other => panic!("expected Connection, got {other:?}"),
        }
    }

    #[test]
    fn explicit_port_overrides_the_default() {
        let runner = Arc::new(FakeRunner::ok());
        let mut connector = connector(runner.clone());
        connector.spec.port = 6432;
        connector.test_connection().unwrap();
        assert!(runner.last().args.windows(2).any(|w| w == ["-p", "6432"]));
    }
}
