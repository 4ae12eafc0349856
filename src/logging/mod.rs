//! Structured logging with request context.

pub mod structured;

pub use structured::LogContext;
