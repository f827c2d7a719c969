//! Intersight REST client implementation.
//!
//! This module provides the HTTP client used by the engine to read and
//! write Intersight resources. Requests carry a bearer token; every call
//! is a single round trip.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::ConnectionConfig;
use crate::error::{ApiError, IntersightError, Result};

use super::api::IntersightApi;
use super::filter::Filter;
use super::types::{DesiredSpec, ListResponse, RelationMember, RemoteResource};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Response header carrying the Intersight trace identifier.
const TRACE_ID_HEADER: &str = "x-starship-traceid";

/// Intersight API client.
#[derive(Debug, Clone)]
pub struct IntersightClient {
    /// HTTP client.
    client: Client,
    /// API root, e.g. `https://intersight.com/api/v1`.
    base_url: String,
    /// Bearer token.
    api_token: String,
}

impl IntersightClient {
    /// Creates a new client for the given API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, api_token: &str) -> Result<Self> {
        Self::build(base_url, api_token, DEFAULT_TIMEOUT_SECS, true)
    }

    /// Creates a client from the manifest connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &ConnectionConfig, api_token: &str) -> Result<Self> {
        Self::build(
            &config.api_uri,
            api_token,
            config.timeout_secs,
            config.validate_certs,
        )
    }

    fn build(
        base_url: &str,
        api_token: &str,
        timeout_secs: u64,
        validate_certs: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(!validate_certs)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Returns the API root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource_path: &str) -> String {
        if resource_path.starts_with('/') {
            format!("{}{resource_path}", self.base_url)
        } else {
            format!("{}/{resource_path}", self.base_url)
        }
    }

    /// Sends a request and maps error statuses.
    async fn send(&self, request: RequestBuilder, resource_path: &str) -> Result<Response> {
        let response = request
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        let trace_id = response
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        trace!("{resource_path} -> {status} (trace id: {trace_id:?})");

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(IntersightError::Api(ApiError::AuthenticationFailed {
                message: format!("{status} returned for {resource_path}"),
            }));
        }

        if status.as_u16() == 404 {
            return Err(IntersightError::Api(ApiError::NotFound {
                resource_path: resource_path.to_string(),
            }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntersightError::Api(ApiError::api_error(
                status.as_u16(),
                body,
                trace_id,
            )));
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json().await.map_err(|e| {
            IntersightError::Api(ApiError::invalid_response(format!(
                "Failed to parse response: {e}"
            )))
        })
    }
}

#[async_trait]
impl IntersightApi for IntersightClient {
    async fn get(&self, resource_path: &str, filter: &Filter) -> Result<Option<RemoteResource>> {
        debug!("GET {resource_path} $filter={filter}");

        let mut request = self.client.get(self.url(resource_path));
        if !filter.is_empty() {
            request = request.query(&[("$filter", filter.to_query())]);
        }

        let response = self.send(request, resource_path).await?;
        let list: ListResponse = Self::read_json(response).await?;
        let mut results = list.results.unwrap_or_default();

        if results.len() > 1 {
            warn!(
                "{} resources in {resource_path} match '{filter}', using the first",
                results.len()
            );
        }

        if results.is_empty() {
            Ok(None)
        } else {
            Ok(Some(results.swap_remove(0)))
        }
    }

    async fn create(&self, resource_path: &str, body: &DesiredSpec) -> Result<RemoteResource> {
        debug!("POST {resource_path}");
        let request = self.client.post(self.url(resource_path)).json(body);
        let response = self.send(request, resource_path).await?;
        Self::read_json(response).await
    }

    async fn update(
        &self,
        resource_path: &str,
        moid: &str,
        body: &DesiredSpec,
    ) -> Result<RemoteResource> {
        let target = format!("{resource_path}/{moid}");
        debug!("PATCH {target}");
        let request = self.client.patch(self.url(&target)).json(body);
        let response = self.send(request, &target).await?;
        Self::read_json(response).await
    }

    async fn delete(&self, resource_path: &str, moid: &str) -> Result<()> {
        let target = format!("{resource_path}/{moid}");
        debug!("DELETE {target}");
        self.send(self.client.delete(self.url(&target)), &target)
            .await?;
        Ok(())
    }

    async fn add_relation(
        &self,
        resource_path: &str,
        moid: &str,
        relation: &str,
        members: &[RelationMember],
    ) -> Result<()> {
        let target = format!("{resource_path}/{moid}/{relation}");
        debug!("POST {target}");
        self.send(self.client.post(self.url(&target)).json(members), &target)
            .await?;
        Ok(())
    }

    async fn remove_relation(
        &self,
        resource_path: &str,
        moid: &str,
        relation: &str,
        member_moid: &str,
    ) -> Result<()> {
        let target = format!("{resource_path}/{moid}/{relation}/{member_moid}");
        debug!("DELETE {target}");
        self.send(self.client.delete(self.url(&target)), &target)
            .await?;
        Ok(())
    }
}
