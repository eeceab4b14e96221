use crate::backend::{RateLimitSpec, SharedWindowBackend};
use crate::requester::{MultipartPayload, ParameterMap, RateLimitExceeded, Requester};
use async_trait::async_trait;

/// A [Requester] that limits the outgoing requests of the requester it wraps.
///
/// Every method shares one sliding window, whatever the destination. Requests within the limit
/// are forwarded and their result returned as is; requests beyond it fail with
/// [RateLimitExceeded] without reaching the wrapped requester.
pub struct RateLimitRequester<R> {
    requester: R,
    backend: SharedWindowBackend,
}

impl<R: Requester> RateLimitRequester<R> {
    pub fn new(requester: R, spec: RateLimitSpec) -> Self {
        Self::with_backend(requester, SharedWindowBackend::new(spec))
    }

    /// Use an existing window, allowing several requesters to share one limit.
    pub fn with_backend(requester: R, backend: SharedWindowBackend) -> Self {
        Self { requester, backend }
    }

    pub fn inner(&self) -> &R {
        &self.requester
    }

    pub fn backend(&self) -> &SharedWindowBackend {
        &self.backend
    }

    fn check(&self) -> Result<(), RateLimitExceeded> {
        if self.backend.request().is_denied() {
            log::debug!("Outgoing request rate limit exceeded");
            return Err(RateLimitExceeded);
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Requester> Requester for RateLimitRequester<R> {
    type Response = R::Response;
    type Error = R::Error;

    async fn get(&self, url: &str, params: &ParameterMap) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.get(url, params).await
    }

    async fn post(&self, url: &str, params: &ParameterMap) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.post(url, params).await
    }

    async fn post_json(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &serde_json::Value,
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.post_json(url, params, body).await
    }

    async fn post_raw(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &[u8],
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.post_raw(url, params, body).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &MultipartPayload,
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.post_multipart(url, params, body).await
    }

    async fn post_values(
        &self,
        url: &str,
        params: &ParameterMap,
        values: &[(String, String)],
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.post_values(url, params, values).await
    }

    async fn put(&self, url: &str, params: &ParameterMap) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.put(url, params).await
    }

    async fn put_json(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &serde_json::Value,
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.put_json(url, params, body).await
    }

    async fn put_raw(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &[u8],
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.put_raw(url, params, body).await
    }

    async fn put_multipart(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &MultipartPayload,
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.put_multipart(url, params, body).await
    }

    async fn put_values(
        &self,
        url: &str,
        params: &ParameterMap,
        values: &[(String, String)],
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.put_values(url, params, values).await
    }

    async fn delete(
        &self,
        url: &str,
        params: &ParameterMap,
    ) -> Result<Self::Response, Self::Error> {
        self.check()?;
        self.requester.delete(url, params).await
    }
}
