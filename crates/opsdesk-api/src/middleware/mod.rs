//! Middleware for request processing

pub mod logging;

pub use logging::{RequestId, request_logging_middleware};
