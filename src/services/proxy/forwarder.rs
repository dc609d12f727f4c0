use axum::body::{Body, Bytes};
use http::{HeaderMap, Method, Response, Uri, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::ProxyError;
use crate::services::discovery::DiscoveryClient;

/// One forwarding rule: requests under `prefix` go to `app_id`, with
/// `prefix` replaced by `target_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRoute {
    pub prefix: String,
    pub app_id: String,
    pub target_prefix: String,
}

impl ProxyRoute {
    pub fn new(prefix: impl Into<String>, app_id: impl Into<String>, target_prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            app_id: app_id.into(),
            target_prefix: target_prefix.into(),
        }
    }

    // 只匹配完整路径段，/api/products 不匹配 /api/productsx
    fn rewrite(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(format!("{}{}", self.target_prefix, rest))
    }
}

#[derive(Debug, Clone)]
pub struct ApiProxy {
    discovery: DiscoveryClient,
    routes: Arc<Vec<ProxyRoute>>,
    client: reqwest::Client,
}

impl ApiProxy {
    pub fn new(discovery: DiscoveryClient, routes: Vec<ProxyRoute>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            discovery,
            routes: Arc::new(routes),
            client,
        })
    }

    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }

    /// Matching route and the rewritten path (query string kept).
    pub fn resolve_route(&self, uri: &Uri) -> Option<(&ProxyRoute, String)> {
        self.routes.iter().find_map(|route| {
            let mut path = route.rewrite(uri.path())?;
            if let Some(query) = uri.query() {
                path.push('?');
                path.push_str(query);
            }
            Some((route, path))
        })
    }

    // 转发请求到目标服务
    pub async fn forward(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response<Body>, ProxyError> {
        let (route, path) = self
            .resolve_route(uri)
            .ok_or_else(|| ProxyError::RouteNotFound(uri.path().to_string()))?;
        let unavailable = |reason: String| ProxyError::ServiceUnavailable {
            app_id: route.app_id.clone(),
            reason,
        };

        let endpoint = self
            .discovery
            .resolve(&route.app_id)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let url = format!("{}{}", endpoint.base_url(), path);

        // 目标地址由代理决定，不透传 Host
        let mut forwarded = headers.clone();
        forwarded.remove(header::HOST);
        forwarded.remove(header::CONTENT_LENGTH);

        tracing::debug!(method = %method, url = %url, app_id = %route.app_id, "Forwarding request");
        let response = self
            .client
            .request(method, &url)
            .headers(forwarded)
            .body(body)
            .send()
            .await
            .map_err(|e| unavailable(format!("failed to forward request: {e}")))?;

        let status = response.status();
        let mut response_headers = response.headers().clone();
        response_headers.remove(header::TRANSFER_ENCODING);
        response_headers.remove(header::CONTENT_LENGTH);
        response_headers.remove(header::CONNECTION);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| unavailable(format!("failed to read response: {e}")))?;

        let mut proxied = Response::new(Body::from(bytes));
        *proxied.status_mut() = status;
        *proxied.headers_mut() = response_headers;
        Ok(proxied)
    }
}
