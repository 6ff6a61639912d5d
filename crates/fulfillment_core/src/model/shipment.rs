//! Shipment (envío) record.
//!
//! # Invariants
//! - `tracking` is non-blank and unique among active shipments.
//! - `cost`, when present, is not negative.
//! - `estimated_date` is not earlier than `dispatch_date` when both are set.

use super::lifecycle::RecordState;
use super::money::Money;
use super::{normalize_key, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Storage-generated shipment identifier.
pub type ShipmentId = i64;

/// Shipping company handling the parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Carrier {
    Andreani,
    Oca,
    CorreoArg,
}

/// Delivery speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentType {
    Standard,
    Express,
}

/// Shipment progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Preparing,
    InTransit,
    Delivered,
}

impl Carrier {
    /// Persisted vocabulary for the `empresa` column.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Andreani => "ANDREANI",
            Self::Oca => "OCA",
            Self::CorreoArg => "CORREO_ARG",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "ANDREANI" => Some(Self::Andreani),
            "OCA" => Some(Self::Oca),
            "CORREO_ARG" => Some(Self::CorreoArg),
            _ => None,
        }
    }
}

impl ShipmentType {
    /// Persisted vocabulary for the `tipo` column.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Standard => "ESTANDAR",
            Self::Express => "EXPRES",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "ESTANDAR" => Some(Self::Standard),
            "EXPRES" => Some(Self::Express),
            _ => None,
        }
    }
}

impl ShipmentStatus {
    /// Persisted vocabulary for the `estado` column.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Preparing => "EN_PREPARACION",
            Self::InTransit => "EN_TRANSITO",
            Self::Delivered => "ENTREGADO",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "EN_PREPARACION" => Some(Self::Preparing),
            "EN_TRANSITO" => Some(Self::InTransit),
            "ENTREGADO" => Some(Self::Delivered),
            _ => None,
        }
    }
}

macro_rules! code_text_impls {
    ($kind:ty, $field:literal) => {
        impl Display for $kind {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_code())
            }
        }

        impl FromStr for $kind {
            type Err = ValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_uppercase();
                Self::from_code(&normalized).ok_or_else(|| ValidationError::Unparseable {
                    field: $field,
                    value: value.to_string(),
                })
            }
        }
    };
}

code_text_impls!(Carrier, "carrier");
code_text_impls!(ShipmentType, "shipment type");
code_text_impls!(ShipmentStatus, "shipment status");

/// Shipment record as stored in `shipments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    /// `None` until the store assigns an id.
    pub id: Option<ShipmentId>,
    pub state: RecordState,
    pub tracking: String,
    pub carrier: Carrier,
    #[serde(rename = "type")]
    pub kind: ShipmentType,
    pub cost: Option<Money>,
    pub dispatch_date: Option<NaiveDate>,
    pub estimated_date: Option<NaiveDate>,
    pub status: ShipmentStatus,
}

impl Shipment {
    /// Creates an unsaved active shipment with no cost or dates.
    pub fn new(
        tracking: impl Into<String>,
        carrier: Carrier,
        kind: ShipmentType,
        status: ShipmentStatus,
    ) -> Self {
        Self {
            id: None,
            state: RecordState::Active,
            tracking: tracking.into(),
            carrier,
            kind,
            cost: None,
            dispatch_date: None,
            estimated_date: None,
            status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns a copy with the tracking code in key form.
    pub fn normalized(&self) -> Self {
        Self {
            tracking: normalize_key(&self.tracking).to_string(),
            ..self.clone()
        }
    }

    /// Checks field-level invariants required before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("tracking code", &self.tracking)?;
        if self.cost.is_some_and(Money::is_negative) {
            return Err(ValidationError::NegativeAmount("shipment cost"));
        }
        if let (Some(dispatch), Some(estimated)) = (self.dispatch_date, self.estimated_date) {
            if estimated < dispatch {
                return Err(ValidationError::EstimatedBeforeDispatch);
            }
        }
        Ok(())
    }
}
