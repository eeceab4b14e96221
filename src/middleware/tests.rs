use crate::backend::{InMemoryBackend, RateLimitSpec};
use crate::middleware::*;
use actix_web::cookie::Cookie;
use actix_web::http::header::AUTHORIZATION;
use actix_web::http::StatusCode;
use actix_web::test::{read_body, TestRequest};
use actix_web::{test, web, App, HttpResponse};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Default)]
struct HitCounter(Arc<AtomicU64>);

impl HitCounter {
    fn hits(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

async fn route_hit(counter: web::Data<HitCounter>) -> HttpResponse {
    counter.0.fetch_add(1, Ordering::Relaxed);
    HttpResponse::Ok().body("Hello world!")
}

fn backend(max_requests: u64, window: Duration) -> InMemoryBackend {
    InMemoryBackend::builder(RateLimitSpec::new(max_requests, window).unwrap()).build()
}

fn peer(addr: &str) -> SocketAddr {
    addr.parse().unwrap()
}

fn assert_first_allowed(statuses: &[StatusCode], allowed: usize) {
    for (i, status) in statuses.iter().enumerate() {
        if i < allowed {
            assert_eq!(*status, StatusCode::OK, "request {i} should be allowed");
        } else {
            assert_eq!(
                *status,
                StatusCode::TOO_MANY_REQUESTS,
                "request {i} should be denied"
            );
        }
    }
}

macro_rules! limited_app {
    ($counter:expr, $limiter:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($counter.clone()))
                .route("/", web::get().to(route_hit))
                .wrap($limiter),
        )
        .await
    };
}

#[actix_web::test]
async fn test_ip_rate_limit() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(counter, RateLimiter::new(backend(10, HOUR), ClientPolicy::Ip));
    let mut statuses = Vec::new();
    for _ in 0..20 {
        let req = TestRequest::get()
            .uri("/")
            .peer_addr(peer("127.0.0.1:12345"))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert_first_allowed(&statuses, 10);
    assert_eq!(counter.hits(), 10);
}

#[actix_web::test]
async fn test_denied_response_is_empty() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(counter, RateLimiter::new(backend(0, HOUR), ClientPolicy::Ip));
    let req = TestRequest::get()
        .uri("/")
        .peer_addr(peer("127.0.0.1:12345"))
        .to_request();
    let response = test::call_service(&app, req).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(read_body(response).await.is_empty());
    assert_eq!(counter.hits(), 0);
}

#[actix_web::test]
async fn test_zero_limit() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(counter, RateLimiter::new(backend(0, HOUR), ClientPolicy::Ip));
    for i in 0..20 {
        let req = TestRequest::get()
            .uri("/")
            .peer_addr(peer(&format!("127.0.0.{}:12345", i % 3 + 1)))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        tokio::time::advance(HOUR).await;
    }
    assert_eq!(counter.hits(), 0);
}

#[actix_web::test]
async fn test_rate_limit_reset() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let window = Duration::from_secs(2);
    let app = limited_app!(counter, RateLimiter::new(backend(10, window), ClientPolicy::Ip));
    for _ in 0..2 {
        let mut statuses = Vec::new();
        for _ in 0..20 {
            let req = TestRequest::get()
                .uri("/")
                .peer_addr(peer("127.0.0.1:12345"))
                .to_request();
            statuses.push(test::call_service(&app, req).await.status());
        }
        assert_first_allowed(&statuses, 10);
        tokio::time::advance(window + Duration::from_millis(1)).await;
    }
    assert_eq!(counter.hits(), 20);
}

#[actix_web::test]
async fn test_two_clients() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(counter, RateLimiter::new(backend(10, HOUR), ClientPolicy::Ip));
    for i in 0..20 {
        let addr = if i % 2 == 0 {
            "127.0.0.2:12345"
        } else {
            "127.0.0.1:12345"
        };
        let req = TestRequest::get().uri("/").peer_addr(peer(addr)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
    assert_eq!(counter.hits(), 20);
}

#[actix_web::test]
async fn test_missing_peer_addr_denied() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(counter, RateLimiter::new(backend(10, HOUR), ClientPolicy::Ip));
    let req = TestRequest::get().uri("/").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(counter.hits(), 0);
}

#[actix_web::test]
async fn test_header_rate_limit() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let policy = ClientPolicy::Header("X-Real-Ip".to_owned());
    let app = limited_app!(counter, RateLimiter::new(backend(10, HOUR), policy));
    let mut statuses = Vec::new();
    for i in 0..21 {
        let mut req = TestRequest::get().uri("/");
        // The last request carries no header at all
        if i < 20 {
            req = req.insert_header(("X-Real-Ip", "127.0.0.1"));
        }
        statuses.push(test::call_service(&app, req.to_request()).await.status());
    }
    assert_first_allowed(&statuses, 10);
    assert_eq!(counter.hits(), 10);
}

#[actix_web::test]
async fn test_cookie_rate_limit() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let policy = ClientPolicy::Cookie("My-Cookie".to_owned());
    let app = limited_app!(counter, RateLimiter::new(backend(10, HOUR), policy));
    let mut statuses = Vec::new();
    for i in 0..21 {
        let mut req = TestRequest::get().uri("/");
        if i < 20 {
            req = req.cookie(Cookie::new("My-Cookie", "gabbagabbahey"));
        }
        statuses.push(test::call_service(&app, req.to_request()).await.status());
    }
    assert_first_allowed(&statuses, 10);
    assert_eq!(counter.hits(), 10);
}

#[actix_web::test]
async fn test_token_rate_limit() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(
        counter,
        RateLimiter::new(backend(10, HOUR), ClientPolicy::Token)
    );
    let mut statuses = Vec::new();
    for i in 0..22 {
        let mut req = TestRequest::get().uri("/");
        if i < 20 {
            req = req.insert_header((AUTHORIZATION, "Bearer gabbagabbahey"));
        } else if i < 21 {
            req = req.insert_header((AUTHORIZATION, "gabbagabbahey"));
        }
        statuses.push(test::call_service(&app, req.to_request()).await.status());
    }
    assert_first_allowed(&statuses, 10);
    assert_eq!(counter.hits(), 10);
}

#[actix_web::test]
async fn test_policy_failure_ignores_counter_state() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let app = limited_app!(
        counter,
        RateLimiter::new(backend(u64::MAX, HOUR), ClientPolicy::Token)
    );
    let req = TestRequest::get().uri("/").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(counter.hits(), 0);
}

#[actix_web::test]
async fn test_resource_limit_leaves_other_routes_alone() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let limiter = RateLimiter::new(backend(1, HOUR), ClientPolicy::Ip);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(counter.clone()))
            .service(
                web::resource("/limited")
                    .wrap(limiter)
                    .route(web::get().to(route_hit)),
            )
            .route("/open", web::get().to(route_hit)),
    )
    .await;
    for (uri, expected) in [
        ("/limited", StatusCode::OK),
        ("/limited", StatusCode::TOO_MANY_REQUESTS),
        ("/open", StatusCode::OK),
        ("/open", StatusCode::OK),
    ] {
        let req = TestRequest::get()
            .uri(uri)
            .peer_addr(peer("127.0.0.1:12345"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }
    assert_eq!(counter.hits(), 3);
}

#[actix_web::test]
async fn test_shared_backend_across_apps() {
    tokio::time::pause();
    let counter = HitCounter::default();
    let backend = backend(3, HOUR);
    // Mimic two workers, each with their own app instance
    let app_a = limited_app!(counter, RateLimiter::new(backend.clone(), ClientPolicy::Ip));
    let app_b = limited_app!(counter, RateLimiter::new(backend.clone(), ClientPolicy::Ip));
    let mut statuses = Vec::new();
    for i in 0..6 {
        let req = TestRequest::get()
            .uri("/")
            .peer_addr(peer("127.0.0.1:12345"))
            .to_request();
        let status = if i % 2 == 0 {
            test::call_service(&app_a, req).await.status()
        } else {
            test::call_service(&app_b, req).await.status()
        };
        statuses.push(status);
    }
    assert_first_allowed(&statuses, 3);
    assert_eq!(backend.remaining("127.0.0.1"), 0);
}

/// Keeps every formatted log message. Installed once for the whole test binary.
struct CapturingLogger {
    messages: parking_lot::Mutex<Vec<String>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.messages.lock().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    messages: parking_lot::const_mutex(Vec::new()),
};

#[actix_web::test]
async fn test_token_never_logged() {
    tokio::time::pause();
    // Another test may already have installed it
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Trace);

    let token = "s3cr3t-api-token";
    let counter = HitCounter::default();
    let app = limited_app!(
        counter,
        RateLimiter::new(backend(1, HOUR), ClientPolicy::Token)
    );
    let mut statuses = Vec::new();
    for _ in 0..2 {
        let req = TestRequest::get()
            .uri("/")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert_first_allowed(&statuses, 1);

    let messages = LOGGER.messages.lock();
    assert!(
        messages.iter().any(|m| m.contains("Rate limit exceeded for token client")),
        "rejection should still be logged"
    );
    assert!(
        messages.iter().all(|m| !m.contains(token)),
        "token written to log: {messages:?}"
    );
}
