//! GWT-RPC codec
//!
//! Cronometer's web frontend is a GWT application. Its RPC servlet expects a
//! pipe-delimited body built around a string table, and answers with `//OK`
//! or `//EX` prefixed payloads.
//!
//! # Overview
//!
//! - [`encode`] serializes an [`RpcCall`] using the permutation/header values
//!   from [`GwtConfig`](crate::config::GwtConfig)
//! - [`decode`] classifies a response body into an [`RpcResponse`]
//! - [`calls`] holds the Cronometer service methods this crate invokes
//!
//! The magic values live only in configuration. When Cronometer ships a new
//! frontend build, this module and the config defaults are the only places
//! that need updating.

pub mod calls;
mod codec;

pub use codec::{decode, encode, rpc_headers, RpcArg, RpcCall, RpcFault, RpcPayload, RpcResponse};

/// GWT-RPC protocol version written by [`encode`]
pub const PROTOCOL_VERSION: u32 = 7;
