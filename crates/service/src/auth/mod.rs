//! Auth module: domain types, errors and the session gate.
//!
//! The gate caches the signed-in identity and turns it into privilege checks
//! and routing decisions for the admin and storefront views.

pub mod domain;
pub mod errors;
pub mod gate;

pub use gate::SessionGate;
