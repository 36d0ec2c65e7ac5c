//! Cronometer service methods invoked over GWT-RPC
//!
//! Type signatures carry a CRC suffix generated at frontend build time. They
//! are as stable as the header hash and change with it.

use super::codec::{RpcArg, RpcCall};

/// Service interface implemented by the `/cronometer/app` servlet
pub const CRONOMETER_SERVICE: &str = "com.cronometer.shared.rpc.CronometerService";

/// Type signature of the `AuthScope` enum
pub const AUTH_SCOPE_TYPE: &str = "com.cronometer.shared.user.AuthScope/2065601159";

/// Ordinal of the `AuthScope` constant granting export access
pub const EXPORT_AUTH_SCOPE: u32 = 2;

/// Lifetime requested for export tokens, in seconds
pub const EXPORT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Argument of `authenticate` sent by the web app
pub const AUTHENTICATE_ARG: i64 = -300;

/// `authenticate(Integer)`: binds the logged-in session to the RPC layer and
/// answers with the user id
pub fn authenticate() -> RpcCall {
    RpcCall::new(CRONOMETER_SERVICE, "authenticate").arg(RpcArg::BoxedInt(AUTHENTICATE_ARG))
}

/// `generateAuthorizationToken(String, int, int, AuthScope)`: issues the
/// short-lived token accepted by the export endpoint
pub fn generate_authorization_token(nonce: &str, user_id: i64) -> RpcCall {
    RpcCall::new(CRONOMETER_SERVICE, "generateAuthorizationToken")
        .arg(RpcArg::Str(nonce.to_string()))
        .arg(RpcArg::Int(user_id))
        .arg(RpcArg::Int(EXPORT_TOKEN_TTL_SECONDS))
        .arg(RpcArg::Enum {
            type_signature: AUTH_SCOPE_TYPE.to_string(),
            ordinal: EXPORT_AUTH_SCOPE,
        })
}

/// `logout(String)`: ends the server-side session
pub fn logout(nonce: &str) -> RpcCall {
    RpcCall::new(CRONOMETER_SERVICE, "logout").arg(RpcArg::Str(nonce.to_string()))
}
