//! Order fulfillment use-case services.
//!
//! # Responsibility
//! - Compose shipment/order stores into multi-step units of work.
//! - Own transaction boundaries and pre-transaction input validation.
//! - Keep presentation layers decoupled from connections and SQL.
//!
//! # Invariants
//! - Validation errors are raised before any connection is acquired.
//! - Every connection acquired by a service call is released before the
//!   call returns, on success and failure alike.

pub mod order_service;
pub mod unit_of_work;
