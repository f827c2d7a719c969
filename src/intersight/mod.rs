//! Intersight collaborator.
//!
//! This module provides the boundary between the engine and the remote
//! service: the [`IntersightApi`] trait, its HTTP implementation, the
//! structured filter builder and the opaque resource types.

mod api;
mod client;
mod filter;
mod types;

pub use api::IntersightApi;
pub use client::IntersightClient;
pub use filter::{Clause, Filter, FilterValue};
pub use types::{
    is_falsy, DesiredSpec, ListResponse, RelationMember, RemoteResource, ResourceReference,
};
