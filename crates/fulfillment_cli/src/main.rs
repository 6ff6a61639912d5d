//! Console menu for order fulfillment records.
//!
//! # Responsibility
//! - Load configuration, start logging and build the order service.
//! - Hand stdin/stdout to the menu loop.

mod menu;

use fulfillment_core::{
    core_version, init_logging_from_config, AppConfig, OrderService, SqliteConnectionProvider,
};
use std::io::{self, BufWriter};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    println!("Order fulfillment console {}", core_version());
    let service = OrderService::new(SqliteConnectionProvider::new(config.store));
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut menu = menu::Menu::new(&service, stdin.lock(), BufWriter::new(stdout.lock()));

    match menu.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("console error: {err}");
            ExitCode::FAILURE
        }
    }
}
