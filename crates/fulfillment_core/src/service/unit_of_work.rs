//! Scoped connection and transaction handling for service calls.
//!
//! # Responsibility
//! - Run one write unit of work as `Idle -> Open -> Committed|RolledBack -> Closed`.
//! - Run read-only work on a dedicated connection without a transaction.
//!
//! # Invariants
//! - `Committed` is reached only when the work and the commit both succeed.
//! - Any failure while `Open` rolls back before the error is returned.
//! - Rollback and close failures are logged, never returned, so the
//!   original cause is what the caller sees.
//! - The connection is back in auto-commit mode and closed on every path.

use crate::db::ConnectionProvider;
use crate::repo::{StoreError, StoreResult};
use crate::service::order_service::{ServiceError, ServiceResult};
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;
use uuid::Uuid;

/// Stage reached by a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Open,
    Committed,
    RolledBack,
    Closed,
}

impl TxState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Open => "open",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
            Self::Closed => "closed",
        }
    }
}

/// Runs `work` inside one immediate transaction on a fresh connection.
///
/// Errors raised after the connection was acquired come back as
/// `ServiceError::Transaction` carrying the original store error.
pub(crate) fn run_in_transaction<P, T, F>(
    provider: &P,
    operation: &'static str,
    work: F,
) -> ServiceResult<T>
where
    P: ConnectionProvider + ?Sized,
    F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
{
    let tx_id = Uuid::new_v4();
    let started_at = Instant::now();

    let mut conn = match provider.connect() {
        Ok(conn) => conn,
        Err(err) => {
            warn!(
                "event=tx module=service operation={} tx_id={} state={} status=error error_code=connect_failed error={}",
                operation,
                tx_id,
                TxState::Idle.as_str(),
                err
            );
            return Err(ServiceError::Transaction {
                operation,
                cause: StoreError::from(err),
            });
        }
    };

    let (state, outcome) = execute(&mut conn, operation, tx_id, work);
    release(conn, operation, tx_id);

    match outcome {
        Ok(value) => {
            info!(
                "event=tx module=service operation={} tx_id={} state={} status=ok duration_ms={}",
                operation,
                tx_id,
                state.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(cause) => {
            warn!(
                "event=tx module=service operation={} tx_id={} state={} status=error duration_ms={} error={}",
                operation,
                tx_id,
                state.as_str(),
                started_at.elapsed().as_millis(),
                cause
            );
            Err(ServiceError::Transaction { operation, cause })
        }
    }
}

/// Runs read-only `work` on a fresh connection in auto-commit mode.
pub(crate) fn run_read<P, T, F>(provider: &P, operation: &'static str, work: F) -> ServiceResult<T>
where
    P: ConnectionProvider + ?Sized,
    F: FnOnce(&Connection) -> StoreResult<T>,
{
    let conn = provider.connect().map_err(|err| ServiceError::Read {
        operation,
        cause: StoreError::from(err),
    })?;
    let outcome = work(&conn);
    release(conn, operation, Uuid::new_v4());
    outcome.map_err(|cause| ServiceError::Read { operation, cause })
}

fn execute<T, F>(
    conn: &mut Connection,
    operation: &'static str,
    tx_id: Uuid,
    work: F,
) -> (TxState, StoreResult<T>)
where
    F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
{
    let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
        Ok(tx) => tx,
        Err(err) => return (TxState::Idle, Err(err.into())),
    };
    debug!(
        "event=tx module=service operation={} tx_id={} state={}",
        operation,
        tx_id,
        TxState::Open.as_str()
    );

    match work(&tx) {
        Ok(value) => match tx.commit() {
            Ok(()) => (TxState::Committed, Ok(value)),
            // A failed COMMIT leaves the transaction to the drop guard, which rolls back.
            Err(err) => (TxState::RolledBack, Err(err.into())),
        },
        Err(cause) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(
                    "event=tx_rollback module=service operation={} tx_id={} status=error error={}",
                    operation, tx_id, rollback_err
                );
            }
            (TxState::RolledBack, Err(cause))
        }
    }
}

fn release(conn: Connection, operation: &'static str, tx_id: Uuid) {
    if !conn.is_autocommit() {
        warn!(
            "event=tx_release module=service operation={} tx_id={} status=error error_code=still_in_transaction",
            operation, tx_id
        );
        if let Err(err) = conn.execute_batch("ROLLBACK;") {
            warn!(
                "event=tx_release module=service operation={} tx_id={} status=error error_code=rollback_failed error={}",
                operation, tx_id, err
            );
        }
    }

    match conn.close() {
        Ok(()) => debug!(
            "event=tx module=service operation={} tx_id={} state={}",
            operation,
            tx_id,
            TxState::Closed.as_str()
        ),
        Err((_conn, err)) => warn!(
            "event=tx_release module=service operation={} tx_id={} status=error error_code=close_failed error={}",
            operation, tx_id, err
        ),
    }
}
