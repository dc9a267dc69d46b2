//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded in the span, echoed in the response)
//!
//! Authentication is an extractor ([`CurrentTenant`]) on the `/api` handlers
//! rather than a layer, so public routes need no exemption list.

pub mod auth;
pub mod request_id;

pub use auth::{CurrentTenant, SessionClaims, SessionTokenError, SessionTokenVerifier};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
