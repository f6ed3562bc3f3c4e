pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::DiffConfig;

pub use adapters::{
    postgres::PgSession, report::ReportWriter, status::ConsoleStatus, storage::LocalStorage,
};
pub use core::{engine::DiffEngine, DiffOptions};
pub use utils::error::{DiffError, Result};
