pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::TomlConfig;

pub use adapters::{storage::LocalStorage, warehouse::SqliteWarehouse};
pub use core::{etl::EtlEngine, SalesPipeline};
pub use utils::error::{EtlError, Result};
