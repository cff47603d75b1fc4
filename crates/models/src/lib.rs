//! Catalog entities and the traits that let one generic service manage them.
//!
//! Each entity type implements [`resource::Resource`], which carries its
//! storage schema, validation rules, outgoing references and media fields.

pub mod errors;
pub mod validation;
pub mod resource;
pub mod schema;
pub mod media;
pub mod category;
pub mod sub_category;
pub mod brand;
pub mod product;
pub mod profile;

pub use resource::{Document, MediaRef, Reference, Resource, ResourceKind, ResourcePatch};
