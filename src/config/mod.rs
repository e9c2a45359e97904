//! Application configuration: YAML settings file with defaults for
//! the database connection, storage target, and backup behaviour.

pub mod settings;

pub use settings::Settings;
