//! Authenticator implementation
//!
//! Runs the browser login handshake and the GWT-RPC calls that hang off an
//! established session.

use super::session::{CookieJar, Session, NONCE_COOKIE};
use crate::config::{Endpoints, GwtConfig};
use crate::error::{snippet, Error, Result};
use crate::gwt::{self, calls, RpcCall, RpcPayload, RpcResponse};
use crate::http::{HttpRequest, HttpResponse, Transport};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

/// `<input ...>` tags of an HTML page
static INPUT_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").unwrap());

/// `name="anticsrf"` in any quote style
static CSRF_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sname\s*=\s*(?:"anticsrf"|'anticsrf'|anticsrf(?:[\s/>]|$))"#).unwrap()
});

/// `value=...` in any quote style
static VALUE_ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\svalue\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Body of the `/login` response
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Where an RPC call happens, which decides how refusals are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpcStage {
    /// Part of the login handshake
    Login,
    /// On an established session
    Session,
}

impl RpcStage {
    /// The service refused the call or sent us back to the login page
    fn denied(self, message: String) -> Error {
        match self {
            RpcStage::Login => Error::auth(message),
            RpcStage::Session => Error::session_expired(message),
        }
    }

    /// The service answered with an error status and no GWT payload
    fn failed(self, message: String) -> Error {
        match self {
            RpcStage::Login => Error::auth(message),
            RpcStage::Session => Error::protocol(message),
        }
    }
}

/// Runs the login handshake and session-scoped RPC calls
pub struct Authenticator {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    gwt: GwtConfig,
}

impl Authenticator {
    /// Create an authenticator
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints, gwt: GwtConfig) -> Self {
        Self {
            transport,
            endpoints,
            gwt,
        }
    }

    /// GWT settings in use
    pub fn gwt(&self) -> &GwtConfig {
        &self.gwt
    }

    /// Log in and establish a new session
    ///
    /// 1. Fetch the login page for the CSRF token and initial cookies
    /// 2. Submit the credentials, which sets the session nonce cookie
    /// 3. Call `authenticate` over GWT-RPC for the user id
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        info!("Logging in to Cronometer");
        let mut cookies = CookieJar::new();

        let csrf_token = self.fetch_csrf_token(&mut cookies).await?;
        self.submit_credentials(&mut cookies, email, password, &csrf_token)
            .await?;

        let nonce = cookies
            .get(NONCE_COOKIE)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::auth("Login did not return a session nonce"))?;

        let (payload, response) = self
            .rpc(&calls::authenticate(), &cookies, RpcStage::Login)
            .await?;
        cookies.merge(&response);

        let user_id = payload.leading_int().ok_or_else(|| {
            Error::gwt_version(format!(
                "authenticate returned no user id: {}",
                snippet(payload.raw())
            ))
        })?;

        info!(user_id, "Logged in");
        Ok(Session::new(cookies, csrf_token, user_id, nonce))
    }

    /// Request a short-lived export token for a session
    pub async fn export_token(&self, session: &Session) -> Result<String> {
        if !session.is_authenticated() {
            return Err(Error::auth("Not logged in"));
        }

        let call = calls::generate_authorization_token(session.nonce(), session.user_id());
        let (payload, _) = self
            .rpc(&call, session.cookies(), RpcStage::Session)
            .await?;

        payload.first_string().ok_or_else(|| {
            Error::gwt_version(format!(
                "generateAuthorizationToken returned no token: {}",
                snippet(payload.raw())
            ))
        })
    }

    /// End the server-side session
    ///
    /// Logging out of a session that is no longer authenticated does nothing.
    pub async fn logout(&self, session: &Session) -> Result<()> {
        if !session.is_authenticated() {
            return Ok(());
        }

        self.rpc(
            &calls::logout(session.nonce()),
            session.cookies(),
            RpcStage::Session,
        )
        .await?;
        info!(user_id = session.user_id(), "Logged out");
        Ok(())
    }

    /// GET the login page and extract the CSRF token
    async fn fetch_csrf_token(&self, cookies: &mut CookieJar) -> Result<String> {
        let response = self
            .transport
            .send(HttpRequest::get(self.endpoints.login_page()))
            .await?;

        if !response.is_success() {
            return Err(Error::auth(format!(
                "Login page returned status {}",
                response.status
            )));
        }
        cookies.merge(&response);

        extract_csrf_token(&response.body)
            .ok_or_else(|| Error::protocol("Could not find anticsrf token on login page"))
    }

    /// POST the login form
    async fn submit_credentials(
        &self,
        cookies: &mut CookieJar,
        email: &str,
        password: &str,
        csrf_token: &str,
    ) -> Result<()> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", email)
            .append_pair("password", password)
            .append_pair("anticsrf", csrf_token)
            .finish();

        let request = HttpRequest::post(self.endpoints.login_api())
            .header("content-type", "application/x-www-form-urlencoded")
            .cookies(cookies.iter())
            .body(form);
        let response = self.transport.send(request).await?;

        if matches!(response.status, 401 | 403) {
            return Err(Error::auth(format!(
                "Login rejected with status {}",
                response.status
            )));
        }
        if !response.is_success() {
            return Err(Error::auth(format!(
                "Login request failed with status {}: {}",
                response.status,
                snippet(&response.body)
            )));
        }
        cookies.merge(&response);

        let login: LoginResponse = serde_json::from_str(&response.body).map_err(|e| {
            Error::auth(format!(
                "Login response is not JSON ({e}): {}",
                snippet(&response.body)
            ))
        })?;

        if !login.success {
            let reason = login
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(Error::auth(format!("Login failed: {reason}")));
        }

        debug!("Credentials accepted");
        Ok(())
    }

    /// POST an RPC call and return the `//OK` payload with the raw response
    async fn rpc(
        &self,
        call: &RpcCall,
        cookies: &CookieJar,
        stage: RpcStage,
    ) -> Result<(RpcPayload, HttpResponse)> {
        let mut request = HttpRequest::post(self.endpoints.gwt_app())
            .cookies(cookies.iter())
            .body(gwt::encode(call, &self.gwt));
        for (key, value) in gwt::rpc_headers(&self.gwt) {
            request = request.header(key, value);
        }

        debug!(method = %call.method, "GWT-RPC call");
        let response = self.transport.send(request).await?;

        if matches!(response.status, 401 | 403) {
            return Err(stage.denied(format!(
                "{} rejected with status {}",
                call.method, response.status
            )));
        }
        if let Some(location) = login_redirect(&response) {
            return Err(stage.denied(format!(
                "{} redirected to {location}",
                call.method
            )));
        }

        let decoded = match gwt::decode(&response.body) {
            Ok(decoded) => decoded,
            Err(_) if !response.is_success() => {
                return Err(stage.failed(format!(
                    "{} failed with status {}: {}",
                    call.method,
                    response.status,
                    snippet(&response.body)
                )));
            }
            Err(e) if stage == RpcStage::Login => {
                return Err(Error::auth(format!("{} returned {e}", call.method)));
            }
            Err(e) => return Err(e),
        };

        match decoded {
            RpcResponse::Ok(payload) => Ok((payload, response)),
            RpcResponse::Fault(fault) if fault.is_version_mismatch(&self.gwt.version_fault_markers) => {
                Err(Error::gwt_version(format!(
                    "{} failed, update the GWT permutation/header: {}",
                    call.method,
                    fault.summary()
                )))
            }
            RpcResponse::Fault(fault) => Err(Error::protocol(format!(
                "{} failed: {}",
                call.method,
                fault.summary()
            ))),
        }
    }
}

/// Location of a redirect back to the login page
pub(crate) fn login_redirect(response: &HttpResponse) -> Option<&str> {
    if !response.is_redirect() {
        return None;
    }
    response
        .location()
        .filter(|location| location.to_ascii_lowercase().contains("login"))
}

/// Extract the `anticsrf` hidden input value from the login page
pub fn extract_csrf_token(html: &str) -> Option<String> {
    INPUT_TAG_REGEX
        .find_iter(html)
        .map(|tag| tag.as_str())
        .filter(|tag| CSRF_NAME_REGEX.is_match(tag))
        .find_map(|tag| {
            let caps = VALUE_ATTR_REGEX.captures(tag)?;
            let value = caps.get(1).or(caps.get(2)).or(caps.get(3))?.as_str();
            (!value.is_empty()).then(|| value.to_string())
        })
}
