//! Interactive menu loop.
//!
//! Every service failure is reported with a message for its category and
//! the loop keeps running; only console I/O errors end it.

use chrono::{Local, NaiveDate};
use fulfillment_core::{
    Carrier, ConnectionProvider, ErrorCategory, Money, Order, OrderService, OrderStatus,
    ServiceError, Shipment, ShipmentStatus, ShipmentType, ValidationError,
};
use log::debug;
use uuid::Uuid;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

const MENU_TEXT: &str = "
==== ORDER -> SHIPMENT ====
1) Create order + shipment (transaction)
2) List orders
3) Find order by id
4) Find order by number
5) Update order status
6) Delete order (soft)
7) Rollback demo (duplicate tracking code)
0) Exit";

/// Menu action failure: bad console input or a service error.
enum ActionError {
    Input(ValidationError),
    Service(ServiceError),
    Io(io::Error),
}

impl From<ValidationError> for ActionError {
    fn from(value: ValidationError) -> Self {
        Self::Input(value)
    }
}

impl From<ServiceError> for ActionError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<io::Error> for ActionError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

type ActionResult = Result<(), ActionError>;

pub struct Menu<'svc, P: ConnectionProvider, R, W> {
    service: &'svc OrderService<P>,
    input: R,
    output: W,
}

impl<'svc, P, R, W> Menu<'svc, P, R, W>
where
    P: ConnectionProvider,
    R: BufRead,
    W: Write,
{
    pub fn new(service: &'svc OrderService<P>, input: R, output: W) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    /// Runs until the user picks exit or input reaches end of file.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "{MENU_TEXT}")?;
            let Some(choice) = self.prompt("Option: ")? else {
                break;
            };

            let outcome = match choice.as_str() {
                "1" => self.create_order(),
                "2" => self.list_orders(),
                "3" => self.find_by_id(),
                "4" => self.find_by_number(),
                "5" => self.update_status(),
                "6" => self.delete_order(),
                "7" => self.rollback_demo(),
                "0" => break,
                other => {
                    writeln!(self.output, "Unknown option `{other}`")?;
                    Ok(())
                }
            };

            match outcome {
                Ok(()) => {}
                Err(ActionError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(ActionError::Io(err)) => return Err(err),
                Err(ActionError::Input(err)) => writeln!(self.output, "Invalid input: {err}")?,
                Err(ActionError::Service(err)) => {
                    debug!("event=menu_action module=cli status=error category={:?}", err.category());
                    writeln!(self.output, "{}", describe_failure(&err))?;
                }
            }
        }

        writeln!(self.output, "Bye!")?;
        self.output.flush()
    }

    fn create_order(&mut self) -> ActionResult {
        writeln!(self.output, "\n-- Shipment --")?;
        let tracking = self.ask("Tracking (e.g. TRK-9999): ")?;
        let carrier: Carrier = self.ask_parsed("Carrier [ANDREANI/OCA/CORREO_ARG]: ")?;
        let kind: ShipmentType = self.ask_parsed("Type [ESTANDAR/EXPRES]: ")?;
        let cost = parse_optional_money(&self.ask("Cost (e.g. 2500.00, empty for none): ")?)?;
        let dispatch_date =
            parse_optional_date(&self.ask("Dispatch date (YYYY-MM-DD, empty for none): ")?)?;
        let estimated_date =
            parse_optional_date(&self.ask("Estimated date (YYYY-MM-DD, empty for none): ")?)?;
        let status: ShipmentStatus =
            self.ask_parsed("Status [EN_PREPARACION/EN_TRANSITO/ENTREGADO]: ")?;

        let mut shipment = Shipment::new(tracking, carrier, kind, status);
        shipment.cost = cost;
        shipment.dispatch_date = dispatch_date;
        shipment.estimated_date = estimated_date;

        writeln!(self.output, "\n-- Order --")?;
        let number = self.ask("Number (e.g. PED-2001): ")?;
        let order_date = parse_date(&self.ask("Date (YYYY-MM-DD): ")?)?;
        let customer_name = self.ask("Customer name: ")?;
        let total = parse_money(&self.ask("Total (e.g. 30000.00): ")?)?;
        let status: OrderStatus = self.ask_parsed("Status [NUEVO/FACTURADO/ENVIADO]: ")?;

        let mut order = Order::new(number, order_date, customer_name, total);
        order.status = status;

        let created = self.service.create_order_with_shipment(&order, &shipment)?;
        writeln!(
            self.output,
            "Transaction OK: order {} created with id {} and shipment id {}",
            order.number, created.order_id, created.shipment_id
        )?;
        Ok(())
    }

    fn list_orders(&mut self) -> ActionResult {
        let orders = self.service.list_orders()?;
        if orders.is_empty() {
            writeln!(self.output, "(no orders)")?;
        }
        for detail in orders {
            writeln!(self.output, "{detail}")?;
        }
        Ok(())
    }

    fn find_by_id(&mut self) -> ActionResult {
        let id = parse_id(&self.ask("Order id: ")?)?;
        match self.service.get_order(id)? {
            Some(detail) => writeln!(self.output, "{detail}")?,
            None => writeln!(self.output, "(not found)")?,
        }
        Ok(())
    }

    fn find_by_number(&mut self) -> ActionResult {
        let number = self.ask("Order number: ")?;
        match self.service.get_order_by_number(&number)? {
            Some(detail) => writeln!(self.output, "{detail}")?,
            None => writeln!(self.output, "(not found)")?,
        }
        Ok(())
    }

    fn update_status(&mut self) -> ActionResult {
        let id = parse_id(&self.ask("Order id to update: ")?)?;
        let status: OrderStatus = self.ask_parsed("New status [NUEVO/FACTURADO/ENVIADO]: ")?;

        let Some(detail) = self.service.get_order(id)? else {
            writeln!(self.output, "(not found)")?;
            return Ok(());
        };
        let mut order = detail.order;
        order.status = status;
        self.service.update_order(&order)?;
        writeln!(self.output, "Updated")?;
        Ok(())
    }

    fn delete_order(&mut self) -> ActionResult {
        let id = parse_id(&self.ask("Order id to delete: ")?)?;
        self.service.delete_order(id)?;
        writeln!(self.output, "Order soft-deleted")?;
        Ok(())
    }

    fn rollback_demo(&mut self) -> ActionResult {
        let suffix = demo_suffix();
        let today = Local::now().date_naive();
        let tracking = format!("TRK-ROLL-{suffix}");

        let first_shipment = Shipment::new(
            tracking.clone(),
            Carrier::Oca,
            ShipmentType::Standard,
            ShipmentStatus::Preparing,
        );
        let first_order = Order::new(
            format!("PED-ROLL-{suffix}-1"),
            today,
            "Rollback customer",
            Money::from_cents(1_234_500),
        );
        let created = self
            .service
            .create_order_with_shipment(&first_order, &first_shipment)?;
        writeln!(
            self.output,
            "First pair created: order id {} with shipment id {}",
            created.order_id, created.shipment_id
        )?;

        let second_shipment = Shipment::new(
            tracking,
            Carrier::Oca,
            ShipmentType::Standard,
            ShipmentStatus::Preparing,
        );
        let second_order = Order::new(
            format!("PED-ROLL-{suffix}-2"),
            today,
            "Duplicate customer",
            Money::from_cents(999_900),
        );
        match self
            .service
            .create_order_with_shipment(&second_order, &second_shipment)
        {
            Ok(_) => writeln!(self.output, "(!) second pair was created; no rollback happened")?,
            Err(err) => writeln!(self.output, "Rollback confirmed: {err}")?,
        }
        Ok(())
    }

    /// Reads one trimmed line; `None` at end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask(&mut self, label: &str) -> Result<String, ActionError> {
        self.prompt(label)?
            .ok_or_else(|| ActionError::Io(io::ErrorKind::UnexpectedEof.into()))
    }

    fn ask_parsed<T>(&mut self, label: &str) -> Result<T, ActionError>
    where
        T: FromStr<Err = ValidationError>,
    {
        Ok(self.ask(label)?.parse::<T>()?)
    }
}

fn describe_failure(err: &ServiceError) -> String {
    match err.category() {
        ErrorCategory::Validation => format!("Invalid data: {err}"),
        ErrorCategory::Constraint => format!("Rejected, nothing was saved: {err}"),
        ErrorCategory::Persistence => format!("Not applied: {err}"),
        ErrorCategory::Storage => format!("Storage error: {err}"),
    }
}

/// Unique key suffix for demo records: timestamp plus a random component.
fn demo_suffix() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Local::now().format("%Y%m%d%H%M%S"), &random[..8])
}

fn parse_id(value: &str) -> Result<i64, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::Unparseable {
        field: "id",
        value: value.to_string(),
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::Unparseable {
        field: "date",
        value: value.to_string(),
    })
}

fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_date(value).map(Some)
}

fn parse_money(value: &str) -> Result<Money, ValidationError> {
    value.parse().map_err(|_| ValidationError::Unparseable {
        field: "amount",
        value: value.to_string(),
    })
}

fn parse_optional_money(value: &str) -> Result<Option<Money>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_money(value).map(Some)
}

#[cfg(test)]
mod tests {
    use super::{
        demo_suffix, parse_date, parse_id, parse_optional_date, parse_optional_money, Menu,
    };
    use fulfillment_core::{Money, OrderService, SqliteConnectionProvider, StoreConfig};
    use std::io::Cursor;

    #[test]
    fn optional_fields_accept_empty_input() {
        assert_eq!(parse_optional_money("  ").unwrap(), None);
        assert_eq!(parse_optional_date("").unwrap(), None);
        assert_eq!(
            parse_optional_money("2500.00").unwrap(),
            Some(Money::from_cents(250_000))
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(parse_date("2025-13-01").is_err());
        assert!(parse_id("seven").is_err());
        assert!(parse_optional_money("12,5").is_err());
    }

    #[test]
    fn menu_creates_lists_and_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let service = OrderService::new(SqliteConnectionProvider::new(StoreConfig::new(
            dir.path().join("menu.db"),
        )));
        let script = [
            "1", "TRK-1", "oca", "estandar", "", "", "", "en_preparacion", "PED-1",
            "2025-06-01", "Ana", "100.00", "nuevo", // valid pair
            "1", "TRK-1", "oca", "estandar", "", "", "", "en_preparacion", "PED-2",
            "2025-06-01", "Ana", "50", "nuevo", // duplicate tracking
            "3", "abc", // bad id
            "2", "0",
        ]
        .join("\n");

        let mut output = Vec::new();
        Menu::new(&service, Cursor::new(script), &mut output)
            .run()
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Transaction OK: order PED-1"));
        assert!(text.contains("Rejected, nothing was saved"));
        assert!(text.contains("Invalid input: invalid id"));
        assert!(text.contains("number=PED-1"));
        assert!(!text.contains("number=PED-2"));
        assert!(text.ends_with("Bye!\n"));
    }

    #[test]
    fn demo_suffixes_differ_within_one_second() {
        assert_ne!(demo_suffix(), demo_suffix());
    }

    #[test]
    fn rollback_demo_can_run_back_to_back() {
        let dir = tempfile::tempdir().unwrap();
        let service = OrderService::new(SqliteConnectionProvider::new(StoreConfig::new(
            dir.path().join("demo.db"),
        )));

        let mut output = Vec::new();
        Menu::new(&service, Cursor::new("7\n7\n0\n"), &mut output)
            .run()
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert_eq!(text.matches("First pair created").count(), 2);
        assert_eq!(text.matches("Rollback confirmed").count(), 2);
    }
}
