//! HTTP transport module
//!
//! Every outbound call goes through the [`Transport`] trait. The production
//! implementation, [`HttpClient`], wraps reqwest with optional retries and a
//! token bucket rate limiter; tests can substitute any other implementation.
//!
//! # Features
//!
//! - **Explicit cookies**: requests carry the session cookies, responses
//!   expose `Set-Cookie` values; reqwest's own cookie store stays off
//! - **No redirects**: 3xx responses are returned as-is so that a redirect to
//!   the login page can be recognized as an expired session
//! - **Opt-in retries**: transport failures are retried only when
//!   `max_retries` is raised above zero
//! - **Rate limiting**: token bucket limiter using governor

mod client;
mod rate_limit;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, HttpRequest, HttpResponse, SetCookie,
    Transport,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
