//! HTTP client for the remote analytics API
//!
//! Every request is built against a placeholder origin, then handed to the
//! [`CredentialResolver`], which rewrites scheme, host and Authorization
//! from the winning strategy. A request that cannot be authenticated is
//! never sent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::types::{EventsQuery, PromQuery, SysqlQuery, UserPermissions};
use crate::auth::{CallContext, CredentialResolver};
use crate::error::RemoteError;
use crate::permissions::{PermissionSet, PermissionSource};

/// Origin every request starts from before authentication rewrites it
const PLACEHOLDER_ORIGIN: &str = "https://remote.invalid";
/// Longest response body excerpt kept in status errors
const MAX_ERROR_BODY: usize = 2000;

const PERMISSIONS_PATH: &str = "/api/users/me/permissions";
const SYSQL_PATH: &str = "/api/sysql/v2/query";
const EVENTS_PATH: &str = "/secure/events/v1/events";
const PROMQL_PATH: &str = "/prometheus/api/v1/query";
const SYSQL_GENERATE_PATH: &str = "/api/sage/sysql/generate";
const PROCESS_BRANCHES_PATH: &str = "/api/process-tree/v1/process-branches";
const PROCESS_TREES_PATH: &str = "/api/process-tree/v1/process-trees";

/// Options for building the underlying HTTP client
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Accept invalid TLS certificates (self-signed on-prem installs)
    pub skip_tls_verification: bool,
    /// Per-request timeout; none by default, callers cancel through the context
    pub timeout: Option<Duration>,
}

/// Authenticated client for the remote API
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    origin: Url,
    resolver: CredentialResolver,
}

impl RemoteClient {
    /// Create a client with default options
    pub fn new(resolver: CredentialResolver) -> Result<Self, RemoteError> {
        Self::with_options(resolver, ClientOptions::default())
    }

    pub fn with_options(
        resolver: CredentialResolver,
        options: ClientOptions,
    ) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if options.skip_tls_verification {
            tracing::warn!("[RemoteClient] TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            origin: Url::parse(PLACEHOLDER_ORIGIN)
                .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?,
            resolver,
        })
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Fetch the permissions of the identity behind `ctx`
    pub async fn get_my_permissions(&self, ctx: &CallContext) -> Result<PermissionSet, RemoteError> {
        let body: UserPermissions = self
            .send_json(ctx, self.request(Method::GET, PERMISSIONS_PATH)?)
            .await?;
        Ok(body.permissions)
    }

    /// Run a SysQL query
    pub async fn query_sysql(&self, ctx: &CallContext, query: &str) -> Result<Value, RemoteError> {
        let body = SysqlQuery {
            q: query.to_string(),
        };
        self.post_json(ctx, SYSQL_PATH, &body).await
    }

    /// Fetch one security event by id
    pub async fn get_event(&self, ctx: &CallContext, event_id: &str) -> Result<Value, RemoteError> {
        self.get_by_id(ctx, EVENTS_PATH, event_id).await
    }

    /// Translate a natural language question into a SysQL query
    pub async fn generate_sysql(&self, ctx: &CallContext, question: &str) -> Result<Value, RemoteError> {
        self.get_json(ctx, SYSQL_GENERATE_PATH, &[("question", question)])
            .await
    }

    /// Process branches of an event; `None` when the event has none
    pub async fn get_process_branches(
        &self,
        ctx: &CallContext,
        event_id: &str,
    ) -> Result<Option<Value>, RemoteError> {
        not_found_as_none(self.get_by_id(ctx, PROCESS_BRANCHES_PATH, event_id).await)
    }

    /// Process tree of an event; `None` when the event has none
    pub async fn get_process_tree(
        &self,
        ctx: &CallContext,
        event_id: &str,
    ) -> Result<Option<Value>, RemoteError> {
        not_found_as_none(self.get_by_id(ctx, PROCESS_TREES_PATH, event_id).await)
    }

    /// List security events
    pub async fn list_events(
        &self,
        ctx: &CallContext,
        query: &EventsQuery,
    ) -> Result<Value, RemoteError> {
        self.get_json(ctx, EVENTS_PATH, query).await
    }

    /// Run an instant PromQL query
    pub async fn query_prometheus(
        &self,
        ctx: &CallContext,
        query: &PromQuery,
    ) -> Result<Value, RemoteError> {
        self.get_json(ctx, PROMQL_PATH, query).await
    }

    /// GET `path` with `query` parameters and decode the JSON body
    pub async fn get_json<Q, T>(&self, ctx: &CallContext, path: &str, query: &Q) -> Result<T, RemoteError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ctx, self.request(Method::GET, path)?.query(query))
            .await
    }

    /// POST `body` as JSON to `path` and decode the JSON response
    pub async fn post_json<B, T>(&self, ctx: &CallContext, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ctx, self.request(Method::POST, path)?.json(body))
            .await
    }

    /// GET `path/{id}` with `id` escaped as a single path segment
    async fn get_by_id(&self, ctx: &CallContext, path: &str, id: &str) -> Result<Value, RemoteError> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(format!("cannot append to {}", path)))?
            .push(id);
        self.send_json(ctx, self.client.get(url)).await
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.origin
            .join(path)
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        builder: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let body = self.send(ctx, builder).await?;
        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Authenticate, send and read the body, racing the caller's cancellation
    async fn send(&self, ctx: &CallContext, builder: RequestBuilder) -> Result<String, RemoteError> {
        let mut request = builder.build()?;
        self.resolver.authenticate(ctx, &mut request)?;

        tracing::debug!(
            "[RemoteClient] {} {} (request {})",
            request.method(),
            request.url(),
            ctx.request_id()
        );

        let exchange = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, RemoteError>((status, text))
        };

        let (status, text) = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(RemoteError::Cancelled),
            result = exchange => result?,
        };

        tracing::debug!("[RemoteClient] Response status: {}", status);
        if !status.is_success() {
            tracing::error!("[RemoteClient] API error: {} - {}", status, truncate(&text));
            return Err(RemoteError::Status {
                status,
                body: truncate(&text),
            });
        }

        Ok(text)
    }
}

fn not_found_as_none(result: Result<Value, RemoteError>) -> Result<Option<Value>, RemoteError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RemoteError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND => Ok(None),
        Err(e) => Err(e),
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[async_trait]
impl PermissionSource for RemoteClient {
    async fn fetch_permissions(&self, ctx: &CallContext) -> Result<PermissionSet, RemoteError> {
        self.get_my_permissions(ctx).await
    }
}
