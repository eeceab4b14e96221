use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Reasons a [ClientPolicy] could not identify the client behind a request.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PolicyError {
    #[error("Unable to determine the remote address of the request")]
    MalformedRemoteAddress,
    #[error("No authorization header value")]
    MissingAuthorizationHeader,
    #[error("Authorization has no bearer prefix")]
    MissingBearerPrefix,
    #[error("No value for header {0}")]
    MissingHeaderValue(String),
    #[error("Value for header {0} is not visible ASCII")]
    InvalidHeaderValue(String),
    #[error("Cookie {0} not found")]
    CookieNotFound(String),
}

/// How the client behind a request is identified for rate limiting purposes.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "name", rename_all = "lowercase"))]
pub enum ClientPolicy {
    /// The IP address of the connection peer.
    ///
    /// This is only suitable when clients connect directly to the application; behind a proxy
    /// every client shares the proxy's address, consider [ClientPolicy::Header] instead.
    Ip,
    /// The token of an `Authorization: Bearer <token>` header.
    Token,
    /// The value of the named header.
    Header(String),
    /// The value of the named cookie.
    Cookie(String),
}

impl ClientPolicy {
    /// Extract the client identity from the request.
    pub fn client(&self, req: &HttpRequest) -> Result<String, PolicyError> {
        match self {
            ClientPolicy::Ip => ip_client(req),
            ClientPolicy::Token => token_client(req),
            ClientPolicy::Header(name) => header_client(req, name),
            ClientPolicy::Cookie(name) => cookie_client(req, name),
        }
    }

    /// Short name of the policy, safe to log where the identity itself is not.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientPolicy::Ip => "ip",
            ClientPolicy::Token => "token",
            ClientPolicy::Header(_) => "header",
            ClientPolicy::Cookie(_) => "cookie",
        }
    }
}

fn ip_client(req: &HttpRequest) -> Result<String, PolicyError> {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .ok_or(PolicyError::MalformedRemoteAddress)
}

fn token_client(req: &HttpRequest) -> Result<String, PolicyError> {
    let authorization = match req.headers().get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(PolicyError::MissingAuthorizationHeader),
    };
    let authorization = authorization
        .to_str()
        .map_err(|_| PolicyError::InvalidHeaderValue(AUTHORIZATION.to_string()))?;
    authorization
        .strip_prefix(BEARER_PREFIX)
        .map(str::to_owned)
        .ok_or(PolicyError::MissingBearerPrefix)
}

fn header_client(req: &HttpRequest, name: &str) -> Result<String, PolicyError> {
    let value = match req.headers().get(name) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(PolicyError::MissingHeaderValue(name.to_owned())),
    };
    value
        .to_str()
        .map(str::to_owned)
        .map_err(|_| PolicyError::InvalidHeaderValue(name.to_owned()))
}

fn cookie_client(req: &HttpRequest, name: &str) -> Result<String, PolicyError> {
    req.cookie(name)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| PolicyError::CookieNotFound(name.to_owned()))
}
