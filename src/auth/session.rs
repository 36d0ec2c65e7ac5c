//! Session state
//!
//! A [`Session`] is created by [`super::Authenticator::login`] and owned by
//! the client. It never refreshes itself: once the service stops accepting
//! it, the caller logs in again.

use crate::http::HttpResponse;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the cookie holding the session nonce
pub const NONCE_COOKIE: &str = "sesnonce";

// ============================================================================
// Cookie Jar
// ============================================================================

/// Cookies collected across the login handshake
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Value of a cookie
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Take every `Set-Cookie` of a response, dropping expired ones
    pub fn merge(&mut self, response: &HttpResponse) {
        for cookie in response.set_cookies() {
            if cookie.expired {
                self.cookies.remove(&cookie.name);
            } else {
                self.cookies.insert(cookie.name, cookie.value);
            }
        }
    }

    /// Cookies as name/value pairs, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Drop all cookies
    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}

// Only names are printed, values are session secrets
impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.cookies.keys()).finish()
    }
}

// ============================================================================
// Session
// ============================================================================

/// An authenticated Cronometer session
#[derive(Clone)]
pub struct Session {
    cookies: CookieJar,
    csrf_token: String,
    user_id: i64,
    nonce: String,
    authenticated: bool,
}

impl Session {
    pub(crate) fn new(cookies: CookieJar, csrf_token: String, user_id: i64, nonce: String) -> Self {
        Self {
            cookies,
            csrf_token,
            user_id,
            nonce,
            authenticated: true,
        }
    }

    /// Whether the session may still be used for requests
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Mark the session as unusable and forget its secrets
    pub fn invalidate(&mut self) {
        self.authenticated = false;
        self.cookies.clear();
        self.csrf_token.clear();
        self.nonce.clear();
    }

    /// Cookies sent with every request
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// CSRF token issued by the login page
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// GWT user id returned by `authenticate`
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Session nonce, the value of the `sesnonce` cookie
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("authenticated", &self.authenticated)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}
