use chrono::NaiveDate;
use fulfillment_core::db::{open_db, DbError, DbResult};
use fulfillment_core::{
    Carrier, ConnectionProvider, ConstraintViolation, ErrorCategory, Money, Order, OrderService,
    OrderStatus, ServiceError, Shipment, ShipmentStatus, ShipmentStore, ShipmentType,
    SqliteConnectionProvider, SqliteShipmentStore, StoreConfig, StoreError, ValidationError,
};
use rusqlite::Connection;
use std::cell::Cell;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    config: StoreConfig,
    service: OrderService<SqliteConnectionProvider>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("fulfillment.db"));
    let service = OrderService::new(SqliteConnectionProvider::new(config.clone()));
    Fixture {
        _dir: dir,
        config,
        service,
    }
}

fn order(number: &str) -> Order {
    Order::new(
        number,
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        "Cliente Rollback",
        Money::from_cents(1_234_500),
    )
}

fn shipment(tracking: &str) -> Shipment {
    Shipment::new(
        tracking,
        Carrier::Oca,
        ShipmentType::Standard,
        ShipmentStatus::Preparing,
    )
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn create_persists_both_rows_linked_by_generated_id() {
    let fx = fixture();

    let created = fx
        .service
        .create_order_with_shipment(&order("PED-1"), &shipment("TRK-1"))
        .unwrap();

    let conn = open_db(&fx.config).unwrap();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM shipments;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM orders;"), 1);
    let fk: i64 = conn
        .query_row(
            "SELECT id_envio FROM orders WHERE id = ?1;",
            [created.order_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(fk, created.shipment_id);

    let detail = fx.service.get_order(created.order_id).unwrap().unwrap();
    assert_eq!(detail.order.number, "PED-1");
    assert_eq!(detail.shipment.unwrap().tracking, "TRK-1");
}

#[test]
fn create_replaces_any_caller_supplied_shipment_reference() {
    let fx = fixture();
    let mut input = order("PED-REF");
    input.shipment_id = Some(777);

    let created = fx
        .service
        .create_order_with_shipment(&input, &shipment("TRK-REF"))
        .unwrap();

    let detail = fx.service.get_order(created.order_id).unwrap().unwrap();
    assert_eq!(detail.order.shipment_id, Some(created.shipment_id));
}

#[test]
fn duplicate_tracking_rolls_back_whole_unit() {
    let fx = fixture();
    let first = fx
        .service
        .create_order_with_shipment(&order("PED-1"), &shipment("TRK-1"))
        .unwrap();

    let err = fx
        .service
        .create_order_with_shipment(&order("PED-2"), &shipment("TRK-1"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transaction {
            operation: "create_order_with_shipment",
            ..
        }
    ));
    assert_eq!(
        err.constraint_violation(),
        Some(&ConstraintViolation::DuplicateTracking)
    );
    assert_eq!(err.category(), ErrorCategory::Constraint);

    let conn = open_db(&fx.config).unwrap();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM shipments;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM orders;"), 1);
    assert!(fx.service.get_order_by_number("PED-2").unwrap().is_none());

    let survivor = fx.service.get_order(first.order_id).unwrap().unwrap();
    assert_eq!(survivor.shipment.unwrap().tracking, "TRK-1");
}

#[test]
fn order_failure_after_shipment_insert_rolls_back_shipment() {
    let fx = fixture();
    fx.service
        .create_order_with_shipment(&order("PED-1"), &shipment("TRK-1"))
        .unwrap();

    let err = fx
        .service
        .create_order_with_shipment(&order("PED-1"), &shipment("TRK-2"))
        .unwrap_err();
    assert_eq!(
        err.constraint_violation(),
        Some(&ConstraintViolation::DuplicateOrderNumber)
    );

    let conn = open_db(&fx.config).unwrap();
    assert_eq!(
        count(&conn, "SELECT COUNT(*) FROM shipments WHERE tracking = 'TRK-2';"),
        0
    );
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM orders;"), 1);
}

#[test]
fn reusing_a_referenced_shipment_is_rejected_and_rolled_back() {
    let fx = fixture();
    let a = fx
        .service
        .create_order_with_shipment(&order("PED-A"), &shipment("TRK-A"))
        .unwrap();
    let b = fx
        .service
        .create_order_with_shipment(&order("PED-B"), &shipment("TRK-B"))
        .unwrap();

    let mut order_b = fx.service.get_order(b.order_id).unwrap().unwrap().order;
    order_b.shipment_id = Some(a.shipment_id);
    order_b.status = OrderStatus::Shipped;
    let err = fx.service.update_order(&order_b).unwrap_err();
    assert_eq!(
        err.constraint_violation(),
        Some(&ConstraintViolation::DuplicateShipmentReference)
    );

    let unchanged = fx.service.get_order(b.order_id).unwrap().unwrap();
    assert_eq!(unchanged.order.shipment_id, Some(b.shipment_id));
    assert_eq!(unchanged.order.status, OrderStatus::New);
}

#[test]
fn validation_fails_before_any_connection_is_opened() {
    struct CountingProvider {
        inner: SqliteConnectionProvider,
        calls: Cell<usize>,
    }

    impl ConnectionProvider for CountingProvider {
        fn connect(&self) -> DbResult<Connection> {
            self.calls.set(self.calls.get() + 1);
            self.inner.connect()
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let provider = CountingProvider {
        inner: SqliteConnectionProvider::new(StoreConfig::new(dir.path().join("v.db"))),
        calls: Cell::new(0),
    };
    let service = OrderService::new(&provider);

    let mut blank = order("PED-V");
    blank.customer_name = "  ".to_string();
    let err = service
        .create_order_with_shipment(&blank, &shipment("TRK-V"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::BlankField("customer name"))
    ));

    let err = service
        .create_order_with_shipment(&order("PED-V"), &shipment(""))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    let err = service.update_order(&order("PED-V")).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MissingId("order"))
    ));

    assert_eq!(provider.calls.get(), 0);
}

#[test]
fn connection_failure_is_reported_as_transaction_error() {
    struct BrokenProvider;

    impl ConnectionProvider for BrokenProvider {
        fn connect(&self) -> DbResult<Connection> {
            Err(DbError::UnsupportedSchemaVersion {
                db_version: 99,
                latest_supported: 1,
            })
        }
    }

    let service = OrderService::new(BrokenProvider);
    let err = service
        .create_order_with_shipment(&order("PED-X"), &shipment("TRK-X"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transaction {
            cause: StoreError::Db(DbError::UnsupportedSchemaVersion { .. }),
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::Storage);

    let err = service.list_orders().unwrap_err();
    assert!(matches!(err, ServiceError::Read { operation: "list_orders", .. }));
}

#[test]
fn failed_transaction_releases_database_for_next_call() {
    let fx = fixture();
    fx.service
        .create_order_with_shipment(&order("PED-1"), &shipment("TRK-1"))
        .unwrap();
    fx.service
        .create_order_with_shipment(&order("PED-2"), &shipment("TRK-1"))
        .unwrap_err();

    let created = fx
        .service
        .create_order_with_shipment(&order("PED-2"), &shipment("TRK-2"))
        .unwrap();
    assert!(fx.service.get_order(created.order_id).unwrap().is_some());
}

#[test]
fn update_changes_fields_and_rejects_unknown_or_deleted_orders() {
    let fx = fixture();
    let created = fx
        .service
        .create_order_with_shipment(&order("PED-U"), &shipment("TRK-U"))
        .unwrap();

    let mut current = fx.service.get_order(created.order_id).unwrap().unwrap().order;
    current.status = OrderStatus::Invoiced;
    fx.service.update_order(&current).unwrap();
    assert_eq!(
        fx.service
            .get_order(created.order_id)
            .unwrap()
            .unwrap()
            .order
            .status,
        OrderStatus::Invoiced
    );

    let mut ghost = current.clone();
    ghost.id = Some(9_999);
    ghost.shipment_id = None;
    let err = fx.service.update_order(&ghost).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Persistence);
    assert!(err.persistence_error().is_some());

    fx.service.delete_order(created.order_id).unwrap();
    let err = fx.service.update_order(&current).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transaction {
            operation: "update_order",
            cause: StoreError::Persistence(_),
        }
    ));
}

#[test]
fn update_drops_reference_to_deleted_shipment() {
    let fx = fixture();
    let created = fx
        .service
        .create_order_with_shipment(&order("PED-S"), &shipment("TRK-S"))
        .unwrap();

    let conn = open_db(&fx.config).unwrap();
    SqliteShipmentStore::try_new(&conn)
        .unwrap()
        .soft_delete(created.shipment_id)
        .unwrap();
    drop(conn);

    let mut current = fx.service.get_order(created.order_id).unwrap().unwrap();
    assert!(current.shipment.is_none());
    assert_eq!(current.order.shipment_id, Some(created.shipment_id));

    current.order.status = OrderStatus::Invoiced;
    fx.service.update_order(&current.order).unwrap();

    let reloaded = fx.service.get_order(created.order_id).unwrap().unwrap();
    assert_eq!(reloaded.order.status, OrderStatus::Invoiced);
    assert_eq!(reloaded.order.shipment_id, None);
}

#[test]
fn padded_order_number_and_tracking_collide_with_stored_keys() {
    let fx = fixture();
    fx.service
        .create_order_with_shipment(&order("PED-1"), &shipment("TRK-1"))
        .unwrap();

    let err = fx
        .service
        .create_order_with_shipment(&order("PED-2"), &shipment("TRK-1 "))
        .unwrap_err();
    assert_eq!(
        err.constraint_violation(),
        Some(&ConstraintViolation::DuplicateTracking)
    );

    let err = fx
        .service
        .create_order_with_shipment(&order(" PED-1 "), &shipment("TRK-2"))
        .unwrap_err();
    assert_eq!(
        err.constraint_violation(),
        Some(&ConstraintViolation::DuplicateOrderNumber)
    );

    let conn = open_db(&fx.config).unwrap();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM orders;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM shipments;"), 1);
}

#[test]
fn keys_are_stored_trimmed_and_found_by_padded_lookup() {
    let fx = fixture();
    let created = fx
        .service
        .create_order_with_shipment(&order("  PED-7\t"), &shipment(" TRK-7 "))
        .unwrap();

    let detail = fx.service.get_order_by_number("PED-7 ").unwrap().unwrap();
    assert_eq!(detail.order.id, Some(created.order_id));
    assert_eq!(detail.order.number, "PED-7");
    assert_eq!(detail.shipment.unwrap().tracking, "TRK-7");

    let mut renamed = detail.order;
    renamed.number = " PED-8 ".to_string();
    fx.service.update_order(&renamed).unwrap();
    assert!(fx.service.get_order_by_number("PED-7").unwrap().is_none());
    let reloaded = fx.service.get_order_by_number(" PED-8").unwrap().unwrap();
    assert_eq!(reloaded.order.number, "PED-8");
}

#[test]
fn delete_hides_order_but_keeps_row() {
    let fx = fixture();
    let a = fx
        .service
        .create_order_with_shipment(&order("PED-A"), &shipment("TRK-A"))
        .unwrap();
    let b = fx
        .service
        .create_order_with_shipment(&order("PED-B"), &shipment("TRK-B"))
        .unwrap();

    fx.service.delete_order(a.order_id).unwrap();

    assert!(fx.service.get_order(a.order_id).unwrap().is_none());
    let listed: Vec<_> = fx
        .service
        .list_orders()
        .unwrap()
        .into_iter()
        .map(|detail| detail.order.id.unwrap())
        .collect();
    assert_eq!(listed, vec![b.order_id]);

    let conn = open_db(&fx.config).unwrap();
    let flag: i64 = conn
        .query_row(
            "SELECT eliminado FROM orders WHERE id = ?1;",
            [a.order_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(flag, 1);

    let err = fx.service.delete_order(a.order_id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Persistence);
}

#[test]
fn list_orders_returns_ascending_ids() {
    let fx = fixture();
    let ids: Vec<_> = ["1", "2", "3"]
        .iter()
        .map(|suffix| {
            fx.service
                .create_order_with_shipment(
                    &order(&format!("PED-{suffix}")),
                    &shipment(&format!("TRK-{suffix}")),
                )
                .unwrap()
                .order_id
        })
        .collect();

    let listed: Vec<_> = fx
        .service
        .list_orders()
        .unwrap()
        .into_iter()
        .map(|detail| detail.order.id.unwrap())
        .collect();
    assert_eq!(listed, ids);
}

#[test]
fn shipments_remain_visible_through_store_after_order_delete() {
    let fx = fixture();
    let created = fx
        .service
        .create_order_with_shipment(&order("PED-K"), &shipment("TRK-K"))
        .unwrap();
    fx.service.delete_order(created.order_id).unwrap();

    let conn = open_db(&fx.config).unwrap();
    let store = SqliteShipmentStore::try_new(&conn).unwrap();
    assert!(store.find_by_id(created.shipment_id).unwrap().is_some());
}
