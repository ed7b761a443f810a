//! REST API Server Module
//!
//! Exposes the server identity endpoint (`POST {prefix}/info`) and a health
//! check. Business faults are answered with their code and message; backend
//! faults are logged and answered with a generic 500.

mod generic;

pub use generic::{handle_rejection, ApiServer, ErrorResponse};
