//! Shop QR code API library.
//!
//! A tenant-scoped REST API for the QR code app embedded in the Shopify
//! admin. Each request is authenticated with a Shopify session token and
//! scoped to the shop it names; no operation reads or writes another shop's
//! QR codes.
//!
//! The binary in `main.rs` wires the `PostgreSQL` stores and the Shopify
//! [`shopify::AdminClient`] into [`routes::router`]; tests wire in-memory
//! stores and a fake gateway instead.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
pub mod tenant;
