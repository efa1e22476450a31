//! Structured logging setup for ProGlot.

pub mod logger;

pub use logger::init_logger;
