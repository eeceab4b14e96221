#[cfg(test)]
mod tests;

use crate::backend::InMemoryBackend;
use crate::policy::ClientPolicy;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::HttpResponse;
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

/// Rate limit middleware.
///
/// Identifies the client of every request with a [ClientPolicy] and runs the admission check
/// against an [InMemoryBackend]. Requests that are denied, or whose client cannot be identified,
/// receive an empty `429 Too Many Requests` response and never reach the wrapped service.
///
/// # Examples
///
/// ```no_run
/// # use actix_sliding_rate_limit::backend::{InMemoryBackend, RateLimitSpec};
/// # use actix_sliding_rate_limit::policy::ClientPolicy;
/// # use actix_sliding_rate_limit::RateLimiter;
/// # use actix_web::{App, HttpServer};
/// # use std::time::Duration;
/// # async fn example() -> std::io::Result<()> {
/// let spec = RateLimitSpec::new(10, Duration::from_secs(3600)).unwrap();
/// let backend = InMemoryBackend::builder(spec).build();
/// HttpServer::new(move || {
///     App::new().wrap(RateLimiter::new(backend.clone(), ClientPolicy::Ip))
/// })
/// .bind("127.0.0.1:8080")?
/// .run()
/// .await
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    backend: InMemoryBackend,
    policy: Rc<ClientPolicy>,
}

impl RateLimiter {
    /// # Arguments
    ///
    /// * `backend`: The per-client sliding window counters, shared by every clone.
    /// * `policy`: How the client is identified from the incoming request.
    pub fn new(backend: InMemoryBackend, policy: ClientPolicy) -> Self {
        Self {
            backend,
            policy: Rc::new(policy),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service: Rc::new(service),
            backend: self.backend.clone(),
            policy: Rc::clone(&self.policy),
        })
    }
}

pub struct RateLimiterMiddleware<S> {
    service: Rc<S>,
    backend: InMemoryBackend,
    policy: Rc<ClientPolicy>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client = match self.policy.client(req.request()) {
            Ok(client) => client,
            Err(e) => {
                log::warn!("Rate limiter unable to identify client: {e}");
                return Box::pin(async move { Ok(denied(req)) });
            }
        };

        if self.backend.request(&client).is_denied() {
            // The identity may be a credential, so only the policy is logged.
            log::debug!("Rate limit exceeded for {} client", self.policy.kind());
            return Box::pin(async move { Ok(denied(req)) });
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let service_response = service.call(req).await?;
            Ok(service_response.map_into_left_body())
        })
    }
}

fn denied<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    req.into_response(HttpResponse::TooManyRequests().finish())
        .map_into_right_body()
}
