//! Order (pedido) record and its joined read model.
//!
//! # Invariants
//! - `number` is non-blank and unique among active orders.
//! - `customer_name` is non-blank; `total` is not negative.
//! - `shipment_id` is an exclusive (1:1) reference to an active shipment.

use super::lifecycle::RecordState;
use super::money::Money;
use super::shipment::{Shipment, ShipmentId};
use super::{normalize_key, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Storage-generated order identifier.
pub type OrderId = i64;

/// Order billing/shipping progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Invoiced,
    Shipped,
}

impl OrderStatus {
    /// Persisted vocabulary for the `estado` column.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::New => "NUEVO",
            Self::Invoiced => "FACTURADO",
            Self::Shipped => "ENVIADO",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "NUEVO" => Some(Self::New),
            "FACTURADO" => Some(Self::Invoiced),
            "ENVIADO" => Some(Self::Shipped),
            _ => None,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_code(&value.trim().to_ascii_uppercase()).ok_or_else(|| {
            ValidationError::Unparseable {
                field: "order status",
                value: value.to_string(),
            }
        })
    }
}

/// Order record as stored in `orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// `None` until the store assigns an id.
    pub id: Option<OrderId>,
    pub state: RecordState,
    pub number: String,
    pub order_date: NaiveDate,
    pub customer_name: String,
    pub total: Money,
    pub status: OrderStatus,
    /// Foreign key into `shipments`; set by the service on creation.
    pub shipment_id: Option<ShipmentId>,
}

impl Order {
    /// Creates an unsaved active order with status `New` and no shipment.
    pub fn new(
        number: impl Into<String>,
        order_date: NaiveDate,
        customer_name: impl Into<String>,
        total: Money,
    ) -> Self {
        Self {
            id: None,
            state: RecordState::Active,
            number: number.into(),
            order_date,
            customer_name: customer_name.into(),
            total,
            status: OrderStatus::New,
            shipment_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns a copy with the order number in key form and the customer
    /// name trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            number: normalize_key(&self.number).to_string(),
            customer_name: self.customer_name.trim().to_string(),
            ..self.clone()
        }
    }

    /// Checks field-level invariants required before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("order number", &self.number)?;
        require_text("customer name", &self.customer_name)?;
        if self.total.is_negative() {
            return Err(ValidationError::NegativeAmount("order total"));
        }
        Ok(())
    }
}

/// Read model: an order plus its shipment when that shipment is active.
///
/// `shipment` is `None` both when the order has no reference and when the
/// referenced shipment is soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub shipment: Option<Shipment>,
}

impl Display for OrderDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let order = &self.order;
        write!(
            f,
            "order id={} number={} date={} customer={} total={} status={}",
            order.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            order.number,
            order.order_date,
            order.customer_name,
            order.total,
            order.status,
        )?;
        match &self.shipment {
            Some(shipment) => write!(
                f,
                " shipment id={} tracking={} status={}",
                shipment.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                shipment.tracking,
                shipment.status,
            ),
            None => write!(f, " shipment=none"),
        }
    }
}
