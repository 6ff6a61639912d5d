//! Order store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/read/update/soft-delete over the `orders` table.
//! - Join the referenced shipment on reads and apply its visibility rule.
//!
//! # Invariants
//! - `id_envio` is written from `Order::shipment_id`, NULL when absent.
//! - `numero` is written and matched in key form (`normalize_key`).
//! - A joined shipment is returned only when it exists and is active; the
//!   order's `shipment_id` is reported as stored either way.
//! - Listing is ordered by `id ASC` and excludes soft-deleted orders.

use crate::model::lifecycle::RecordState;
use crate::model::money::Money;
use crate::model::order::{Order, OrderDetail, OrderId, OrderStatus};
use crate::model::{normalize_key, ValidationError};
use crate::repo::shipment_repo::{parse_shipment_row, ShipmentColumns};
use crate::repo::{
    ensure_store_connection_ready, parse_code, PersistenceError, StoreError, StoreResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const JOINED_SHIPMENT_COLUMNS: ShipmentColumns = ShipmentColumns {
    id: "e_id",
    state: "e_eliminado",
    tracking: "e_tracking",
    carrier: "e_empresa",
    kind: "e_tipo",
    cost: "e_costo",
    dispatch_date: "e_fechaDespacho",
    estimated_date: "e_fechaEstimada",
    status: "e_estado",
};

/// Store interface for order records.
pub trait OrderStore {
    /// Inserts an order and returns its generated id.
    fn create(&self, order: &Order) -> StoreResult<OrderId>;
    /// Returns the active order with this id plus its visible shipment.
    fn find_by_id(&self, id: OrderId) -> StoreResult<Option<OrderDetail>>;
    /// Returns the active order with this number (compared in key form) plus
    /// its visible shipment.
    fn find_by_number(&self, number: &str) -> StoreResult<Option<OrderDetail>>;
    /// Returns all active orders ordered by id.
    fn list_all(&self) -> StoreResult<Vec<OrderDetail>>;
    /// Replaces every column of an active order; `false` when no row matched.
    fn update(&self, order: &Order) -> StoreResult<bool>;
    /// Flags an active order as deleted; `false` when no row matched.
    fn soft_delete(&self, id: OrderId) -> StoreResult<bool>;
}

/// SQLite-backed order store.
pub struct SqliteOrderStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn, &["orders", "shipments"])?;
        Ok(Self { conn })
    }

    fn query_details(&self, filter: &str, bind_values: Vec<Value>) -> StoreResult<Vec<OrderDetail>> {
        let sql = format!(
            "SELECT
                o.id AS id,
                o.eliminado AS eliminado,
                o.numero AS numero,
                o.fecha AS fecha,
                o.clienteNombre AS clienteNombre,
                o.total AS total,
                o.estado AS estado,
                o.id_envio AS id_envio,
                s.id AS e_id,
                s.eliminado AS e_eliminado,
                s.tracking AS e_tracking,
                s.empresa AS e_empresa,
                s.tipo AS e_tipo,
                s.costo AS e_costo,
                s.fechaDespacho AS e_fechaDespacho,
                s.fechaEstimada AS e_fechaEstimada,
                s.estado AS e_estado
             FROM orders o
             LEFT JOIN shipments s
               ON s.id = o.id_envio
              AND {shipment_active}
             WHERE {order_active}{filter}
             ORDER BY o.id ASC;",
            shipment_active = RecordState::Active.predicate("s.eliminado"),
            order_active = RecordState::Active.predicate("o.eliminado"),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut details = Vec::new();
        while let Some(row) = rows.next()? {
            details.push(parse_order_detail_row(row)?);
        }

        Ok(details)
    }
}

impl OrderStore for SqliteOrderStore<'_> {
    fn create(&self, order: &Order) -> StoreResult<OrderId> {
        let order = &order.normalized();
        order.validate()?;

        let id: Option<OrderId> = self
            .conn
            .query_row(
                "INSERT INTO orders (
                    numero,
                    fecha,
                    clienteNombre,
                    total,
                    estado,
                    id_envio
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING id;",
                params![
                    order.number.as_str(),
                    order.order_date,
                    order.customer_name.as_str(),
                    order.total.cents(),
                    order.status.as_code(),
                    order.shipment_id,
                ],
                |row| row.get(0),
            )
            .optional()?;

        id.ok_or_else(|| PersistenceError::new("could not create order").into())
    }

    fn find_by_id(&self, id: OrderId) -> StoreResult<Option<OrderDetail>> {
        let mut details = self.query_details(" AND o.id = ?", vec![Value::Integer(id)])?;
        Ok(details.pop())
    }

    fn find_by_number(&self, number: &str) -> StoreResult<Option<OrderDetail>> {
        let key = Value::Text(normalize_key(number).to_string());
        let mut details = self.query_details(" AND o.numero = ?", vec![key])?;
        Ok(details.pop())
    }

    fn list_all(&self) -> StoreResult<Vec<OrderDetail>> {
        self.query_details("", Vec::new())
    }

    fn update(&self, order: &Order) -> StoreResult<bool> {
        let order = &order.normalized();
        order.validate()?;
        let id = order.id.ok_or(ValidationError::MissingId("order"))?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE orders
                 SET
                    numero = ?1,
                    fecha = ?2,
                    clienteNombre = ?3,
                    total = ?4,
                    estado = ?5,
                    id_envio = ?6
                 WHERE id = ?7
                   AND {};",
                RecordState::Active.predicate("eliminado")
            ),
            params![
                order.number.as_str(),
                order.order_date,
                order.customer_name.as_str(),
                order.total.cents(),
                order.status.as_code(),
                order.shipment_id,
                id,
            ],
        )?;

        Ok(changed > 0)
    }

    fn soft_delete(&self, id: OrderId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE orders
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

fn parse_order_detail_row(row: &Row<'_>) -> StoreResult<OrderDetail> {
    let flag: i64 = row.get("eliminado")?;
    let state = RecordState::from_flag(flag).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid eliminado value `{flag}` in orders"))
    })?;
    let status_text: String = row.get("estado")?;

    let order = Order {
        id: Some(row.get("id")?),
        state,
        number: row.get("numero")?,
        order_date: row.get("fecha")?,
        customer_name: row.get("clienteNombre")?,
        total: Money::from_cents(row.get("total")?),
        status: parse_code(&status_text, "orders.estado", OrderStatus::from_code)?,
        shipment_id: row.get("id_envio")?,
    };

    let shipment = match row.get::<_, Option<i64>>(JOINED_SHIPMENT_COLUMNS.id)? {
        Some(_) => Some(parse_shipment_row(row, &JOINED_SHIPMENT_COLUMNS)?),
        None => None,
    };

    Ok(OrderDetail { order, shipment })
}
