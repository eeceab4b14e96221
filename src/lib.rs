#![cfg_attr(docsrs, feature(doc_cfg))]

//! Sliding window rate limiting in both directions: an actix-web middleware throttling incoming
//! requests per client, and a [Requester](requester::Requester) decorator throttling outgoing
//! requests.

pub mod backend;
mod middleware;
pub mod policy;
pub mod requester;

pub use middleware::{RateLimiter, RateLimiterMiddleware};
