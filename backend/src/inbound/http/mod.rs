//! HTTP inbound helpers: error-to-status mapping and the ownership guard.
//!
//! No routes are defined here; hosts mount their own handlers and use these
//! pieces at the edge.

pub mod authorization;
pub mod error;

pub use authorization::{OwnedResource, require_ownership};
pub use error::ApiResult;
