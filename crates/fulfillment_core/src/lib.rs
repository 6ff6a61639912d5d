//! Core domain logic for order fulfillment records.
//! This crate owns the order/shipment invariants and their persistence.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, StoreConfig};
pub use db::{ConnectionProvider, DbError, SqliteConnectionProvider};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogTarget,
    LoggingError,
};
pub use model::lifecycle::RecordState;
pub use model::money::{Money, ParseMoneyError};
pub use model::order::{Order, OrderDetail, OrderId, OrderStatus};
pub use model::shipment::{Carrier, Shipment, ShipmentId, ShipmentStatus, ShipmentType};
pub use model::ValidationError;
pub use repo::order_repo::{OrderStore, SqliteOrderStore};
pub use repo::shipment_repo::{ShipmentStore, SqliteShipmentStore};
pub use repo::{ConstraintViolation, PersistenceError, StoreError, StoreResult};
pub use service::order_service::{
    CreatedOrder, ErrorCategory, OrderService, ServiceError, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
