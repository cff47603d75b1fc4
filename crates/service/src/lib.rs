//! Service layer for the grocery catalog admin.
//! - One generic resource service per entity kind, built on injected backends.
//! - Session gate for sign-in state, privilege checks and view guards.
//! - Schema provisioning for a fresh backend project.

pub mod errors;
pub mod backend;
pub mod assets;
pub mod pagination;
pub mod resource;
pub mod catalog;
pub mod auth;
pub mod provision;

pub use catalog::Catalog;
pub use errors::ServiceError;
pub use resource::ResourceService;
