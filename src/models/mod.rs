//! Data models for the kids activities application.
//!
//! Field names serialize in camelCase to match the stored documents.

mod activity;
mod auth;
mod tag;

pub use activity::*;
pub use auth::*;
pub use tag::*;
