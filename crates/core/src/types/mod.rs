//! Core types for the shop QR service.
//!
//! This module provides type-safe wrappers for the QR code domain.

pub mod destination;
pub mod id;
pub mod qr_code;
pub mod shop;

pub use destination::Destination;
pub use id::QrCodeId;
pub use qr_code::{QrCode, QrCodeError, QrCodeFields, QrCodePatch, QrCodePayload};
pub use shop::{ShopDomain, ShopDomainError};
