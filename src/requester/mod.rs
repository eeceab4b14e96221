mod payload;
mod rate_limit;

pub use payload::{FormFile, MultipartPayload, ParameterMap, PayloadError};
pub use rate_limit::RateLimitRequester;

use async_trait::async_trait;
use thiserror::Error;

/// Returned by a [RateLimitRequester] instead of making a request beyond the limit.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Error)]
#[error("Rate limit exceeded")]
pub struct RateLimitExceeded;

/// An HTTP client that can make outgoing requests.
///
/// Building the URL from the parameters, encoding the body and decoding the response are left
/// to the implementation. The [Requester::Error] type must be able to carry [RateLimitExceeded]
/// so that a requester can be wrapped by a [RateLimitRequester].
#[async_trait]
pub trait Requester: Send + Sync {
    type Response: Send;
    type Error: From<RateLimitExceeded> + Send;

    async fn get(&self, url: &str, params: &ParameterMap) -> Result<Self::Response, Self::Error>;

    /// POST without a request body.
    async fn post(&self, url: &str, params: &ParameterMap) -> Result<Self::Response, Self::Error>;

    async fn post_json(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &serde_json::Value,
    ) -> Result<Self::Response, Self::Error>;

    /// POST with the bytes as an `application/octet-stream` body.
    async fn post_raw(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &[u8],
    ) -> Result<Self::Response, Self::Error>;

    async fn post_multipart(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &MultipartPayload,
    ) -> Result<Self::Response, Self::Error>;

    /// POST with the values as an `application/x-www-form-urlencoded` body.
    async fn post_values(
        &self,
        url: &str,
        params: &ParameterMap,
        values: &[(String, String)],
    ) -> Result<Self::Response, Self::Error>;

    async fn put(&self, url: &str, params: &ParameterMap) -> Result<Self::Response, Self::Error>;

    async fn put_json(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &serde_json::Value,
    ) -> Result<Self::Response, Self::Error>;

    async fn put_raw(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &[u8],
    ) -> Result<Self::Response, Self::Error>;

    async fn put_multipart(
        &self,
        url: &str,
        params: &ParameterMap,
        body: &MultipartPayload,
    ) -> Result<Self::Response, Self::Error>;

    async fn put_values(
        &self,
        url: &str,
        params: &ParameterMap,
        values: &[(String, String)],
    ) -> Result<Self::Response, Self::Error>;

    async fn delete(&self, url: &str, params: &ParameterMap)
        -> Result<Self::Response, Self::Error>;
}
