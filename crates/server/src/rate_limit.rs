//! Rate limiting middleware for HTTP requests.

use std::{
    fmt::Display,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    Json,
    body::Body,
    extract::ConnectInfo,
    response::{IntoResponse, Response},
};
use http::{Request, StatusCode};
use jiff::Timestamp;
use rate_limit::{RateLimitManager, RateLimitRequest};
use serde::Serialize;
use tower::Layer;

#[derive(Clone)]
pub struct RateLimitLayer {
    manager: Arc<RateLimitManager>,
    trust_forwarded_headers: bool,
}

impl RateLimitLayer {
    pub fn new(manager: Arc<RateLimitManager>, trust_forwarded_headers: bool) -> Self {
        Self {
            manager,
            trust_forwarded_headers,
        }
    }
}

impl<Service> Layer<Service> for RateLimitLayer
where
    Service: Send + Clone,
{
    type Service = RateLimitService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        RateLimitService {
            next,
            manager: self.manager.clone(),
            trust_forwarded_headers: self.trust_forwarded_headers,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<Service> {
    next: Service,
    manager: Arc<RateLimitManager>,
    trust_forwarded_headers: bool,
}

/// Body of a rejected request.
#[derive(Debug, Serialize)]
struct TooManyRequests {
    error: &'static str,
    timestamp: Timestamp,
}

impl IntoResponse for TooManyRequests {
    fn into_response(self) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, Json(self)).into_response()
    }
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for RateLimitService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut builder = RateLimitRequest::builder();

        if let Some(ip) = extract_client_ip(&req, self.trust_forwarded_headers) {
            builder = builder.ip(ip);
        }

        let rate_limit_request = builder.build();

        // The bucket is charged before the handler runs, so a rejected request never reaches it.
        let err = match self.manager.check_request(&rate_limit_request) {
            Ok(()) => {
                // Call the service that was polled ready, keep a fresh clone for the next request.
                let clone = self.next.clone();
                let mut next = std::mem::replace(&mut self.next, clone);

                return Box::pin(async move { next.call(req).await });
            }
            Err(err) => err,
        };

        log::debug!("Request to {} rejected: {err}", req.uri().path());

        let response = TooManyRequests {
            error: "Too Many Requests",
            timestamp: Timestamp::now(),
        }
        .into_response();

        // No Retry-After header, clients only see the JSON body.
        Box::pin(async move { Ok(response) })
    }
}

/// Extract client IP address from request.
///
/// Forwarding headers are only honored when the server runs behind a trusted proxy,
/// otherwise any caller could pick its own bucket.
fn extract_client_ip<B>(req: &Request<B>, trust_forwarded_headers: bool) -> Option<IpAddr> {
    if trust_forwarded_headers && let Some(ip) = forwarded_ip(req) {
        return Some(ip);
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    // Take the first IP in the chain, which is the original client.
    if let Some(forwarded_for) = req.headers().get("x-forwarded-for") {
        let ip = forwarded_for
            .to_str()
            .ok()
            .and_then(|value| value.split(',').next())
            .and_then(|ip_str| ip_str.trim().parse::<IpAddr>().ok());

        if ip.is_some() {
            return ip;
        }
    }

    let ip_str = req.headers().get("x-real-ip")?.to_str().ok()?;

    ip_str.trim().parse::<IpAddr>().ok()
}
