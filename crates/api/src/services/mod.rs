//! Business logic between the routes and the stores/gateway.

pub mod composer;
pub mod qr_codes;
pub mod script_tags;

pub use composer::{ClientQrCode, DISCOUNT_LIMIT, ResponseComposer};
pub use qr_codes::QrCodeService;
pub use script_tags::{ScriptTagService, find_existing};
