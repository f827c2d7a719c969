//! Resource locator.
//!
//! Finds at most one existing resource by natural key. Errors from the
//! collaborator propagate unchanged; only "no match" is absorbed into an
//! empty reference.

use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::intersight::{Filter, IntersightApi, RemoteResource, ResourceReference};

use super::schema::ReferenceTarget;

/// Collection holding organizations.
pub const ORGANIZATIONS_PATH: &str = "/organization/Organizations";

/// Looks up resources through an [`IntersightApi`].
#[derive(Clone, Copy)]
pub struct Locator<'a> {
    api: &'a dyn IntersightApi,
}

impl<'a> Locator<'a> {
    /// Creates a locator.
    #[must_use]
    pub const fn new(api: &'a dyn IntersightApi) -> Self {
        Self { api }
    }

    /// Fetches the first resource matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn find(&self, resource_path: &str, filter: &Filter) -> Result<Option<RemoteResource>> {
        debug!("Looking up {resource_path} where {filter}");
        self.api.get(resource_path, filter).await
    }

    /// Returns the identifier of the first resource matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn locate(&self, resource_path: &str, filter: &Filter) -> Result<ResourceReference> {
        let found = self.find(resource_path, filter).await?;
        Ok(found
            .as_ref()
            .and_then(RemoteResource::moid)
            .map_or_else(ResourceReference::missing, ResourceReference::found))
    }

    /// Locates a resource by `Name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn locate_by_name(&self, resource_path: &str, name: &str) -> Result<ResourceReference> {
        self.locate(resource_path, &Filter::by_name(name)).await
    }

    /// Resolves a named reference that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ReferenceNotFound`] if nothing matches, or
    /// the lookup error.
    pub async fn require(&self, target: &ReferenceTarget, name: &str) -> Result<String> {
        self.locate_by_name(target.resource_path, name)
            .await?
            .moid()
            .map(str::to_string)
            .ok_or_else(|| {
                ResolveError::not_found(target.label, name, target.resource_path).into()
            })
    }

    /// Resolves an organization name to its Moid.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn organization(&self, name: &str) -> Result<ResourceReference> {
        self.locate_by_name(ORGANIZATIONS_PATH, name).await
    }
}
