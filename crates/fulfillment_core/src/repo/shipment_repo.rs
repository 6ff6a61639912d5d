//! Shipment store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/read/update/soft-delete over the `shipments` table.
//! - Keep row mapping for shipment columns reusable by joined order reads.
//!
//! # Invariants
//! - `eliminado` is never written on insert; storage defaults it to 0.
//! - Absent cost/dates are stored as SQL NULL.
//! - Listing is ordered by `id ASC` and excludes soft-deleted rows.

use crate::model::lifecycle::RecordState;
use crate::model::money::Money;
use crate::model::shipment::{Carrier, Shipment, ShipmentId, ShipmentStatus, ShipmentType};
use crate::model::ValidationError;
use crate::repo::{
    ensure_store_connection_ready, parse_code, PersistenceError, StoreError, StoreResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SHIPMENT_SELECT_SQL: &str = "SELECT
    id,
    eliminado,
    tracking,
    empresa,
    tipo,
    costo,
    fechaDespacho,
    fechaEstimada,
    estado
FROM shipments";

/// Column names used to map a shipment out of a result row.
pub(crate) struct ShipmentColumns {
    pub id: &'static str,
    pub state: &'static str,
    pub tracking: &'static str,
    pub carrier: &'static str,
    pub kind: &'static str,
    pub cost: &'static str,
    pub dispatch_date: &'static str,
    pub estimated_date: &'static str,
    pub status: &'static str,
}

pub(crate) const SHIPMENT_COLUMNS: ShipmentColumns = ShipmentColumns {
    id: "id",
    state: "eliminado",
    tracking: "tracking",
    carrier: "empresa",
    kind: "tipo",
    cost: "costo",
    dispatch_date: "fechaDespacho",
    estimated_date: "fechaEstimada",
    status: "estado",
};

/// Store interface for shipment records.
pub trait ShipmentStore {
    /// Inserts a shipment and returns its generated id.
    fn create(&self, shipment: &Shipment) -> StoreResult<ShipmentId>;
    /// Returns the active shipment with this id.
    fn find_by_id(&self, id: ShipmentId) -> StoreResult<Option<Shipment>>;
    /// Returns all active shipments ordered by id.
    fn list_all(&self) -> StoreResult<Vec<Shipment>>;
    /// Replaces every column of an active shipment; `false` when no row matched.
    fn update(&self, shipment: &Shipment) -> StoreResult<bool>;
    /// Flags an active shipment as deleted; `false` when no row matched.
    fn soft_delete(&self, id: ShipmentId) -> StoreResult<bool>;
}

/// SQLite-backed shipment store.
///
/// Accepts a plain connection or a `Transaction` (through deref), so the
/// caller decides the transactional scope.
pub struct SqliteShipmentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShipmentStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn, &["shipments"])?;
        Ok(Self { conn })
    }
}

impl ShipmentStore for SqliteShipmentStore<'_> {
    fn create(&self, shipment: &Shipment) -> StoreResult<ShipmentId> {
        let shipment = &shipment.normalized();
        shipment.validate()?;

        let id: Option<ShipmentId> = self
            .conn
            .query_row(
                "INSERT INTO shipments (
                    tracking,
                    empresa,
                    tipo,
                    costo,
                    fechaDespacho,
                    fechaEstimada,
                    estado
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING id;",
                params![
                    shipment.tracking.as_str(),
                    shipment.carrier.as_code(),
                    shipment.kind.as_code(),
                    shipment.cost.map(Money::cents),
                    shipment.dispatch_date,
                    shipment.estimated_date,
                    shipment.status.as_code(),
                ],
                |row| row.get(0),
            )
            .optional()?;

        id.ok_or_else(|| PersistenceError::new("could not create shipment").into())
    }

    fn find_by_id(&self, id: ShipmentId) -> StoreResult<Option<Shipment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SHIPMENT_SELECT_SQL}
             WHERE id = ?1
               AND {};",
            RecordState::Active.predicate("eliminado")
        ))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_shipment_row(row, &SHIPMENT_COLUMNS)?));
        }

        Ok(None)
    }

    fn list_all(&self) -> StoreResult<Vec<Shipment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SHIPMENT_SELECT_SQL}
             WHERE {}
             ORDER BY id ASC;",
            RecordState::Active.predicate("eliminado")
        ))?;

        let mut rows = stmt.query([])?;
        let mut shipments = Vec::new();
        while let Some(row) = rows.next()? {
            shipments.push(parse_shipment_row(row, &SHIPMENT_COLUMNS)?);
        }

        Ok(shipments)
    }

    fn update(&self, shipment: &Shipment) -> StoreResult<bool> {
        let shipment = &shipment.normalized();
        shipment.validate()?;
        let id = shipment.id.ok_or(ValidationError::MissingId("shipment"))?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE shipments
                 SET
                    tracking = ?1,
                    empresa = ?2,
                    tipo = ?3,
                    costo = ?4,
                    fechaDespacho = ?5,
                    fechaEstimada = ?6,
                    estado = ?7
                 WHERE id = ?8
                   AND {};",
                RecordState::Active.predicate("eliminado")
            ),
            params![
                shipment.tracking.as_str(),
                shipment.carrier.as_code(),
                shipment.kind.as_code(),
                shipment.cost.map(Money::cents),
                shipment.dispatch_date,
                shipment.estimated_date,
                shipment.status.as_code(),
                id,
            ],
        )?;

        Ok(changed > 0)
    }

    fn soft_delete(&self, id: ShipmentId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE shipments
                 SET eliminado = {}
                 WHERE id = ?1
                   AND {};",
                RecordState::Deleted.as_flag(),
                RecordState::Active.predicate("eliminado")
            ),
            [id],
        )?;

        Ok(changed > 0)
    }
}

/// Maps one result row to a shipment using the given column names.
pub(crate) fn parse_shipment_row(row: &Row<'_>, columns: &ShipmentColumns) -> StoreResult<Shipment> {
    let flag: i64 = row.get(columns.state)?;
    let state = RecordState::from_flag(flag).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid eliminado value `{flag}` in shipments"))
    })?;

    let carrier_text: String = row.get(columns.carrier)?;
    let kind_text: String = row.get(columns.kind)?;
    let status_text: String = row.get(columns.status)?;

    Ok(Shipment {
        id: Some(row.get(columns.id)?),
        state,
        tracking: row.get(columns.tracking)?,
        carrier: parse_code(&carrier_text, "shipments.empresa", Carrier::from_code)?,
        kind: parse_code(&kind_text, "shipments.tipo", ShipmentType::from_code)?,
        cost: row.get::<_, Option<i64>>(columns.cost)?.map(Money::from_cents),
        dispatch_date: row.get(columns.dispatch_date)?,
        estimated_date: row.get(columns.estimated_date)?,
        status: parse_code(&status_text, "shipments.estado", ShipmentStatus::from_code)?,
    })
}
