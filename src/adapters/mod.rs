// Adapters layer: concrete implementations of the domain ports.

pub mod postgres;
pub mod report;
pub mod status;
pub mod storage;
