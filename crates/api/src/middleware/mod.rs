//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. CORS
//! 3. `TraceLayer` (request span)
//! 4. Request ID

pub mod client_ip;
pub mod request_id;

pub use client_ip::ClientIp;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
