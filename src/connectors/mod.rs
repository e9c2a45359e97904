use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};

pub mod mongodb;
pub mod mysql;
pub mod postgres;
pub mod runner;
pub mod sqlite;

use runner::{CommandRunner, RunError, SystemRunner};

/// Supported database engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Postgres,
    MySql,
    MongoDb,
    Sqlite,
}

impl EngineKind {
    /// Well-known default port; zero for the file-backed engine.
    pub fn default_port(self) -> u16 {
        match self {
            EngineKind::Postgres => 5432,
            EngineKind::MySql => 3306,
            EngineKind::MongoDb => 27017,
            EngineKind::Sqlite => 0,
        }
    }

    /// Whether the engine is reached over the network. SQLite is a
    /// local file and needs no host.
    pub fn requires_host(self) -> bool {
        !matches!(self, EngineKind::Sqlite)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::MySql => "mysql",
            EngineKind::MongoDb => "mongodb",
            EngineKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "postgres" => Ok(EngineKind::Postgres),
            "mysql" => Ok(EngineKind::MySql),
            "mongodb" => Ok(EngineKind::MongoDb),
            "sqlite" => Ok(EngineKind::Sqlite),
            "" => Err(Error::Configuration("database type is required".into())),
            other => Err(Error::Configuration(format!(
                "unsupported database type: {other}"
            ))),
        }
    }
}

/// Connection parameters for one database target. Built by the caller,
/// immutable once handed to a connector.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub kind: EngineKind,
    pub host: String,
    /// Zero means "use the engine's default port".
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database name, or the file path for SQLite.
    pub database: String,
}

impl ConnectionSpec {
    /// Effective port: the explicit value, or the engine default when
    /// unset.
    pub fn port(&self) -> u16 {
        if self.port == 0 {
            self.kind.default_port()
        } else {
            self.port
        }
    }

    /// Check the specification before anything is executed. Pure; no
    /// side effects.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(Error::Configuration("database name is required".into()));
        }
        if self.kind.requires_host() && self.host.is_empty() {
            return Err(Error::Configuration(format!(
                "host is required for {}",
                self.kind
            )));
        }
        Ok(())
    }
}

/// Capability contract every engine connector satisfies.
///
/// Connectors are stateless: each operation launches a fresh client
/// process, so there is no session to pool or share.
pub trait Connector {
    fn kind(&self) -> EngineKind;

    /// Cheapest possible round trip to the target. On failure the
    /// error carries the client tool's combined output.
    fn test_connection(&self) -> Result<()>;

    /// Dump the entire database into `sink`.
    fn backup(&self, sink: &mut dyn Write) -> Result<()>;

    /// Replay a dump read from `source` into the database.
    fn restore(&self, source: &mut dyn Read) -> Result<()>;

    /// Release held resources. No current variant keeps a persistent
    /// session, so this is a no-op everywhere.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the engine can produce incremental dumps. None of the
    /// current variants can; future engines may opt in.
    fn supports_incremental(&self) -> bool {
        false
    }
}

/// Build the connector for the specification's engine kind. The
/// specification is validated before any connector is constructed.
pub fn connect(spec: ConnectionSpec) -> Result<Box<dyn Connector>> {
    spec.validate()?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    Ok(match spec.kind {
        EngineKind::Postgres => Box::new(postgres::PostgresConnector::new(spec, runner)),
        EngineKind::MySql => Box::new(mysql::MySqlConnector::new(spec, runner)),
        EngineKind::MongoDb => Box::new(mongodb::MongoConnector::new(spec, runner)),
        EngineKind::Sqlite => Box::new(sqlite::SqliteConnector::new(spec, runner)),
    })
}

// Runner failures map onto the operation-specific taxonomy; a missing
// binary is always distinguished so operators fix the environment
// rather than their credentials.

pub(crate) fn probe_error(err: RunError) -> Error {
    match err {
        RunError::ToolNotFound(tool) => Error::ToolNotFound(tool),
        other => Error::Connection(other.to_string()),
    }
}

pub(crate) fn backup_error(err: RunError) -> Error {
    match err {
        RunError::ToolNotFound(tool) => Error::ToolNotFound(tool),
        other => Error::Backup(other.to_string()),
    }
}

pub(crate) fn restore_error(err: RunError) -> Error {
    match err {
        RunError::ToolNotFound(tool) => Error::ToolNotFound(tool),
        other => Error::Restore(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: EngineKind, host: &str, database: &str) -> ConnectionSpec {
        ConnectionSpec {
            kind,
            host: host.to_string(),
            port: 0,
            username: String::new(),
            password: String::new(),
            database: database.to_string(),
        }
    }

    #[test]
    fn valid_specs_pass_for_every_kind() {
        for kind in [
            EngineKind::Postgres,
            EngineKind::MySql,
            EngineKind::MongoDb,
            EngineKind::Sqlite,
        ] {
            assert!(spec(kind, "localhost", "mydb").validate().is_ok());
        }
    }

    #[test]
    fn empty_database_is_rejected() {
        let err = spec(EngineKind::Postgres, "localhost", "")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn network_engines_require_a_host() {
        for kind in [EngineKind::Postgres, EngineKind::MySql, EngineKind::MongoDb] {
            let err = spec(kind, "", "mydb").validate().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{kind}");
        }
    }

    #[test]
    fn sqlite_never_requires_a_host() {
        assert!(spec(EngineKind::Sqlite, "", "/tmp/t.db").validate().is_ok());
    }

    #[test]
    fn unknown_and_empty_type_strings_are_configuration_errors() {
        assert!(matches!(
            "oracle".parse::<EngineKind>(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            "".parse::<EngineKind>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn known_type_strings_round_trip_through_display() {
        for name in ["postgres", "mysql", "mongodb", "sqlite"] {
            let kind: EngineKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
    }

    #[test]
    fn default_ports_are_fixed_per_kind() {
        assert_eq!(EngineKind::Postgres.default_port(), 5432);
        assert_eq!(EngineKind::MySql.default_port(), 3306);
        assert_eq!(EngineKind::MongoDb.default_port(), 27017);
        assert_eq!(EngineKind::Sqlite.default_port(), 0);
    }

    #[test]
    fn zero_port_resolves_to_the_engine_default() {
        let mut s = spec(EngineKind::Postgres, "localhost", "mydb");
        assert_eq!(s.port(), 5432);
        s.port = 6543;
        assert_eq!(s.port(), 6543);
    }

    #[test]
    fn connect_rejects_invalid_specs_before_selecting_a_variant() {
        assert!(matches!(
            connect(spec(EngineKind::Postgres, "", "mydb")),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn connect_selects_the_variant_for_the_kind() {
        let connector = connect(spec(EngineKind::MongoDb, "localhost", "mydb")).unwrap();
        assert_eq!(connector.kind(), EngineKind::MongoDb);
        assert!(!connector.supports_incremental());
    }
}
