//! Record stores for shipments and orders.
//!
//! # Responsibility
//! - Provide parameterized insert/read/update/soft-delete per table.
//! - Translate SQLite failures into semantic store errors, classifying
//!   unique-key conflicts as `ConstraintViolation`.
//!
//! # Invariants
//! - Stores never open or finish transactions; they run on whatever
//!   connection or transaction the caller hands them.
//! - Every read/update/delete is filtered by `RecordState::Active`.
//! - Write paths normalize business keys and validate the record before
//!   touching SQL.

pub mod order_repo;
pub mod shipment_repo;

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::{ffi, Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Expected row effect did not happen (no id generated, zero rows touched).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceError {
    message: String,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for PersistenceError {}

/// Storage-side constraint conflict, classified by the violated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// Another active shipment already uses the tracking code.
    DuplicateTracking,
    /// Another active order already uses the order number.
    DuplicateOrderNumber,
    /// Another active order already references the shipment.
    DuplicateShipmentReference,
    /// Shipment reference points at a missing row.
    ForeignKey,
    /// A CHECK/NOT NULL rule rejected a value.
    Check(String),
    /// Any other constraint failure reported by the engine.
    Other(String),
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTracking => write!(f, "duplicate tracking code"),
            Self::DuplicateOrderNumber => write!(f, "duplicate order number"),
            Self::DuplicateShipmentReference => {
                write!(f, "shipment already referenced by another order")
            }
            Self::ForeignKey => write!(f, "shipment reference does not exist"),
            Self::Check(message) => write!(f, "value rejected by storage: {message}"),
            Self::Other(message) => write!(f, "constraint violation: {message}"),
        }
    }
}

impl Error for ConstraintViolation {}

/// Error for store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Record failed field validation before SQL ran.
    Validation(ValidationError),
    /// Transport/bootstrap failure.
    Db(DbError),
    /// Unique/foreign-key/check conflict raised by the engine.
    Constraint(ConstraintViolation),
    /// Write did not produce the expected effect.
    Persistence(PersistenceError),
    /// Persisted row cannot be mapped to the domain model.
    InvalidData(String),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "store requires table `{table}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Constraint(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistenceError> for StoreError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match classify_constraint(&value) {
            Some(violation) => Self::Constraint(violation),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Maps an engine constraint failure to the violated business key.
///
/// Returns `None` for errors that are not constraint failures.
pub fn classify_constraint(err: &rusqlite::Error) -> Option<ConstraintViolation> {
    let rusqlite::Error::SqliteFailure(failure, message) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }

    let message = message.clone().unwrap_or_else(|| failure.to_string());
    let violation = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            if message.contains("shipments.tracking") {
                ConstraintViolation::DuplicateTracking
            } else if message.contains("orders.numero") {
                ConstraintViolation::DuplicateOrderNumber
            } else if message.contains("orders.id_envio") {
                ConstraintViolation::DuplicateShipmentReference
            } else {
                ConstraintViolation::Other(message)
            }
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintViolation::ForeignKey,
        ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
            ConstraintViolation::Check(message)
        }
        _ => ConstraintViolation::Other(message),
    };
    Some(violation)
}

/// Verifies the connection is migrated and carries the given tables.
pub(crate) fn ensure_store_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [*table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::MissingRequiredTable(*table));
        }
    }

    Ok(())
}

pub(crate) fn parse_code<T>(
    value: &str,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> StoreResult<T> {
    parse(value).ok_or_else(|| StoreError::InvalidData(format!("invalid value `{value}` in {column}")))
}
