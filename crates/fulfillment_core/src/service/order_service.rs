//! Order fulfillment orchestration service.
//!
//! # Responsibility
//! - Create an order together with its shipment as one atomic unit.
//! - Provide transactional update/soft-delete and plain reads for orders.
//!
//! # Invariants
//! - `create_order_with_shipment` persists both rows or neither; a unique
//!   conflict on either table leaves no new row behind.
//! - The generated shipment id is the order's `id_envio`.
//! - Zero affected rows on update/delete is an error, never a silent success.

use crate::db::ConnectionProvider;
use crate::model::order::{Order, OrderDetail, OrderId};
use crate::model::shipment::{Shipment, ShipmentId};
use crate::model::ValidationError;
use crate::repo::order_repo::{OrderStore, SqliteOrderStore};
use crate::repo::shipment_repo::{ShipmentStore, SqliteShipmentStore};
use crate::repo::{ConstraintViolation, PersistenceError, StoreError};
use crate::service::unit_of_work::{run_in_transaction, run_read};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error returned to presentation callers.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before any transaction was opened.
    Validation(ValidationError),
    /// A write unit of work failed; rollback was already attempted.
    Transaction {
        operation: &'static str,
        cause: StoreError,
    },
    /// A read failed; no transaction was involved.
    Read {
        operation: &'static str,
        cause: StoreError,
    },
}

/// Coarse failure class for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Constraint,
    Persistence,
    Storage,
}

impl ServiceError {
    /// Store error carried by transaction/read failures.
    pub fn cause(&self) -> Option<&StoreError> {
        match self {
            Self::Validation(_) => None,
            Self::Transaction { cause, .. } | Self::Read { cause, .. } => Some(cause),
        }
    }

    pub fn constraint_violation(&self) -> Option<&ConstraintViolation> {
        match self.cause() {
            Some(StoreError::Constraint(violation)) => Some(violation),
            _ => None,
        }
    }

    pub fn persistence_error(&self) -> Option<&PersistenceError> {
        match self.cause() {
            Some(StoreError::Persistence(err)) => Some(err),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Transaction { cause, .. } | Self::Read { cause, .. } => match cause {
                StoreError::Validation(_) => ErrorCategory::Validation,
                StoreError::Constraint(_) => ErrorCategory::Constraint,
                StoreError::Persistence(_) => ErrorCategory::Persistence,
                _ => ErrorCategory::Storage,
            },
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid input: {err}"),
            Self::Transaction { operation, cause } => {
                write!(f, "transaction {operation} failed: {cause}")
            }
            Self::Read { operation, cause } => write!(f, "{operation} failed: {cause}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Transaction { cause, .. } | Self::Read { cause, .. } => Some(cause),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Identifiers assigned by a successful create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub shipment_id: ShipmentId,
}

/// Orchestration entry points for the presentation layer.
pub struct OrderService<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> OrderService<P> {
    /// Creates a service that acquires one connection per call from `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Inserts `shipment`, then `order` pointing at it, in one transaction.
    ///
    /// Order number and tracking code are stored in key form, so values that
    /// differ only by surrounding whitespace collide. Any existing
    /// `order.shipment_id` is replaced by the new shipment id.
    ///
    /// # Errors
    /// - `Validation` when a required field is blank or an amount negative.
    /// - `Transaction` when either insert fails, including unique conflicts
    ///   on tracking code, order number or shipment reference. Nothing is
    ///   persisted in that case.
    pub fn create_order_with_shipment(
        &self,
        order: &Order,
        shipment: &Shipment,
    ) -> ServiceResult<CreatedOrder> {
        let order = order.normalized();
        let shipment = shipment.normalized();
        order.validate()?;
        shipment.validate()?;

        let created = run_in_transaction(&self.provider, "create_order_with_shipment", |tx| {
            let shipments = SqliteShipmentStore::try_new(tx)?;
            let shipment_id = shipments.create(&shipment)?;

            let mut linked = order.clone();
            linked.shipment_id = Some(shipment_id);
            let orders = SqliteOrderStore::try_new(tx)?;
            let order_id = orders.create(&linked)?;

            Ok(CreatedOrder {
                order_id,
                shipment_id,
            })
        })?;

        info!(
            "event=order_create module=service status=ok order_id={} shipment_id={}",
            created.order_id, created.shipment_id
        );
        Ok(created)
    }

    /// Replaces all columns of an active order.
    ///
    /// A `shipment_id` whose shipment is no longer active is written as NULL,
    /// so the order drops the dangling reference instead of keeping it.
    pub fn update_order(&self, order: &Order) -> ServiceResult<()> {
        let order_id = order.id.ok_or(ValidationError::MissingId("order"))?;
        let mut order = order.normalized();
        order.validate()?;

        run_in_transaction(&self.provider, "update_order", |tx| {
            if let Some(shipment_id) = order.shipment_id {
                let shipments = SqliteShipmentStore::try_new(tx)?;
                if shipments.find_by_id(shipment_id)?.is_none() {
                    info!(
                        "event=order_update module=service status=detached order_id={order_id} shipment_id={shipment_id}"
                    );
                    order.shipment_id = None;
                }
            }

            let orders = SqliteOrderStore::try_new(tx)?;
            if !orders.update(&order)? {
                return Err(PersistenceError::new(format!("order {order_id} was not updated")).into());
            }
            Ok(())
        })?;

        info!("event=order_update module=service status=ok order_id={order_id}");
        Ok(())
    }

    /// Soft-deletes an active order.
    pub fn delete_order(&self, id: OrderId) -> ServiceResult<()> {
        run_in_transaction(&self.provider, "delete_order", |tx| {
            let orders = SqliteOrderStore::try_new(tx)?;
            if !orders.soft_delete(id)? {
                return Err(PersistenceError::new(format!("order {id} was not deleted")).into());
            }
            Ok(())
        })?;

        info!("event=order_delete module=service status=ok order_id={id}");
        Ok(())
    }

    /// Gets one active order with its visible shipment.
    pub fn get_order(&self, id: OrderId) -> ServiceResult<Option<OrderDetail>> {
        run_read(&self.provider, "get_order", |conn| {
            SqliteOrderStore::try_new(conn)?.find_by_id(id)
        })
    }

    /// Gets one active order by its unique number.
    pub fn get_order_by_number(&self, number: &str) -> ServiceResult<Option<OrderDetail>> {
        run_read(&self.provider, "get_order_by_number", |conn| {
            SqliteOrderStore::try_new(conn)?.find_by_number(number.trim())
        })
    }

    /// Lists active orders by ascending id.
    pub fn list_orders(&self) -> ServiceResult<Vec<OrderDetail>> {
        run_read(&self.provider, "list_orders", |conn| {
            SqliteOrderStore::try_new(conn)?.list_all()
        })
    }
}
