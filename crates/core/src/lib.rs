//! Shop QR Core - Shared types library.
//!
//! This crate provides the domain types used across all shop QR components:
//! - `api` - Tenant-scoped REST API for the embedded app frontend
//! - `cli` - Command-line tools for migrations and shop sessions
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - QR code IDs, shop domains, destinations and the QR code record

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
