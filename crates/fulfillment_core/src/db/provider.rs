//! Connection provisioning for service units of work.
//!
//! # Responsibility
//! - Hand each orchestration call its own migrated connection.
//! - Keep connection settings injected rather than global.

use super::{open_db, DbResult};
use crate::config::StoreConfig;
use rusqlite::Connection;

/// Source of ready-to-use connections.
///
/// Implementations must return a connection in auto-commit mode with the
/// schema fully migrated. Callers own the connection and close it when done.
pub trait ConnectionProvider {
    fn connect(&self) -> DbResult<Connection>;
}

/// Opens a new file-backed connection per call from `StoreConfig`.
#[derive(Debug, Clone)]
pub struct SqliteConnectionProvider {
    config: StoreConfig,
}

impl SqliteConnectionProvider {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl ConnectionProvider for SqliteConnectionProvider {
    fn connect(&self) -> DbResult<Connection> {
        open_db(&self.config)
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    fn connect(&self) -> DbResult<Connection> {
        (**self).connect()
    }
}
