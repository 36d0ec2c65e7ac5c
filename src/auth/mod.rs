//! Authentication module
//!
//! Cronometer has no API keys. A session is established the way the browser
//! does it:
//!
//! 1. GET the login page and pick up the `anticsrf` token
//! 2. POST the credentials as a form, which sets the `sesnonce` cookie
//! 3. Call `authenticate` over GWT-RPC to learn the user id
//!
//! Exports then need a short-lived token from `generateAuthorizationToken`.

mod authenticator;
mod session;

pub(crate) use authenticator::login_redirect;
pub use authenticator::{extract_csrf_token, Authenticator};
pub use session::{CookieJar, Session, NONCE_COOKIE};

#[cfg(test)]
mod tests;
