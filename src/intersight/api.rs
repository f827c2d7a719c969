//! Boundary trait between the reconciliation engine and Intersight.

use async_trait::async_trait;

use crate::engine::compare::spec_matches;
use crate::error::Result;

use super::filter::Filter;
use super::types::{DesiredSpec, RelationMember, RemoteResource};

/// Operations the engine needs from an Intersight endpoint.
///
/// Every call is a single round trip. Implementations surface transport
/// and authentication failures as errors and never retry.
#[async_trait]
pub trait IntersightApi: Send + Sync {
    /// Returns the first resource in `resource_path` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn get(&self, resource_path: &str, filter: &Filter) -> Result<Option<RemoteResource>>;

    /// Creates a resource in `resource_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn create(&self, resource_path: &str, body: &DesiredSpec) -> Result<RemoteResource>;

    /// Updates the resource addressed by `moid` in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn update(
        &self,
        resource_path: &str,
        moid: &str,
        body: &DesiredSpec,
    ) -> Result<RemoteResource>;

    /// Creates a resource (`moid` is `None`) or updates the addressed one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn create_or_update(
        &self,
        resource_path: &str,
        moid: Option<&str>,
        body: &DesiredSpec,
    ) -> Result<RemoteResource> {
        match moid {
            Some(moid) => self.update(resource_path, moid, body).await,
            None => self.create(resource_path, body).await,
        }
    }

    /// Deletes the addressed resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn delete(&self, resource_path: &str, moid: &str) -> Result<()>;

    /// Adds members to a relation collection of a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn add_relation(
        &self,
        resource_path: &str,
        moid: &str,
        relation: &str,
        members: &[RelationMember],
    ) -> Result<()>;

    /// Removes one member from a relation collection of a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn remove_relation(
        &self,
        resource_path: &str,
        moid: &str,
        relation: &str,
        member_moid: &str,
    ) -> Result<()>;

    /// Returns true if every field of `desired` is matched by `actual`.
    fn compare(&self, desired: &DesiredSpec, actual: &RemoteResource) -> bool {
        spec_matches(desired, actual)
    }
}
