//! Domain model for order fulfillment records.
//!
//! # Responsibility
//! - Define the `Order` and `Shipment` records handled by stores and services.
//! - Own field-level validation that must pass before any write.
//!
//! # Invariants
//! - Records are identified by storage-generated integer ids.
//! - An order refers to its shipment by id only; reads join on demand.
//! - Deletion is a lifecycle state (`RecordState`), never a physical removal.

pub mod lifecycle;
pub mod money;
pub mod order;
pub mod shipment;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-level validation failure raised before any persistence work starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty or whitespace only.
    BlankField(&'static str),
    /// A monetary field holds a negative amount.
    NegativeAmount(&'static str),
    /// An update was requested for a record without an id.
    MissingId(&'static str),
    /// Estimated delivery date precedes the dispatch date.
    EstimatedBeforeDispatch,
    /// Text input could not be parsed into the named field.
    Unparseable { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} is required"),
            Self::NegativeAmount(field) => write!(f, "{field} must not be negative"),
            Self::MissingId(record) => write!(f, "{record} id is required"),
            Self::EstimatedBeforeDispatch => {
                write!(f, "estimated date must not be earlier than dispatch date")
            }
            Self::Unparseable { field, value } => write!(f, "invalid {field}: `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Canonical form of a business key (order number, tracking code).
pub fn normalize_key(value: &str) -> &str {
    value.trim()
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}
