pub mod error;
pub mod logger;
pub mod monitor;
pub mod retry;
pub mod validation;
