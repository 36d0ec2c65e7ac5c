//! GWT-RPC request encoding and response decoding

use crate::config::GwtConfig;
use crate::error::{snippet, Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::PROTOCOL_VERSION;

/// Type signature of `java.lang.String`
pub const STRING_TYPE: &str = "java.lang.String/2004016611";

/// Type signature of `java.lang.Integer`
pub const INTEGER_TYPE: &str = "java.lang.Integer/3438268394";

/// Type signature of the primitive `int`
pub const INT_TYPE: &str = "I";

/// Leading integer of an `//OK` payload, e.g. `//OK[12345,2,...`
static LEADING_INT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\s*(-?\d+)\s*,").unwrap());

/// First double-quoted string literal in a payload
static STRING_LITERAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap());

// ============================================================================
// Request
// ============================================================================

/// A single RPC argument together with its declared parameter type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcArg {
    /// Primitive `int`, written inline
    Int(i64),
    /// `java.lang.String`, written as a string-table reference
    Str(String),
    /// `java.lang.Integer`, written as type reference followed by the value
    BoxedInt(i64),
    /// Java enum, written as type reference followed by the ordinal
    Enum {
        /// Type signature, e.g. `com.example.Scope/123456`
        type_signature: String,
        /// Constant ordinal
        ordinal: u32,
    },
}

impl RpcArg {
    /// Declared parameter type signature
    pub fn type_signature(&self) -> &str {
        match self {
            RpcArg::Int(_) => INT_TYPE,
            RpcArg::Str(_) => STRING_TYPE,
            RpcArg::BoxedInt(_) => INTEGER_TYPE,
            RpcArg::Enum { type_signature, .. } => type_signature,
        }
    }
}

/// A remote method invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    /// Fully qualified service interface
    pub service: String,
    /// Method name
    pub method: String,
    /// Arguments in declaration order
    pub args: Vec<RpcArg>,
}

impl RpcCall {
    /// Create a call without arguments
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: RpcArg) -> Self {
        self.args.push(arg);
        self
    }
}

/// String table with 1-based, deduplicated indices
#[derive(Debug, Default)]
struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, usize>,
}

impl StringTable {
    fn intern(&mut self, value: &str) -> usize {
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        self.strings.push(value.to_string());
        let idx = self.strings.len();
        self.index.insert(value.to_string(), idx);
        idx
    }
}

/// Escape a string-table entry
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\!"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// Serialize a call into a GWT-RPC request body
///
/// Layout: `version|flags|count|strings...|module|header|service|method|
/// argc|types...|values...|`, where every reference is a 1-based index into
/// the string table.
pub fn encode(call: &RpcCall, config: &GwtConfig) -> String {
    let mut table = StringTable::default();
    let mut payload: Vec<String> = Vec::new();

    payload.push(table.intern(&config.module_base).to_string());
    payload.push(table.intern(&config.header).to_string());
    payload.push(table.intern(&call.service).to_string());
    payload.push(table.intern(&call.method).to_string());
    payload.push(call.args.len().to_string());

    for arg in &call.args {
        payload.push(table.intern(arg.type_signature()).to_string());
    }

    for arg in &call.args {
        match arg {
            RpcArg::Int(value) => payload.push(value.to_string()),
            RpcArg::Str(value) => payload.push(table.intern(value).to_string()),
            RpcArg::BoxedInt(value) => {
                payload.push(table.intern(INTEGER_TYPE).to_string());
                payload.push(value.to_string());
            }
            RpcArg::Enum {
                type_signature,
                ordinal,
            } => {
                payload.push(table.intern(type_signature).to_string());
                payload.push(ordinal.to_string());
            }
        }
    }

    let mut body = format!("{PROTOCOL_VERSION}|0|{}|", table.strings.len());
    for entry in &table.strings {
        body.push_str(&escape(entry));
        body.push('|');
    }
    for token in &payload {
        body.push_str(token);
        body.push('|');
    }
    body
}

/// Headers every RPC request carries
pub fn rpc_headers(config: &GwtConfig) -> Vec<(String, String)> {
    vec![
        ("content-type".to_string(), config.content_type.clone()),
        ("x-gwt-module-base".to_string(), config.module_base.clone()),
        ("x-gwt-permutation".to_string(), config.permutation.clone()),
    ]
}

// ============================================================================
// Response
// ============================================================================

/// Successful response payload (the text after `//OK`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcPayload {
    raw: String,
}

impl RpcPayload {
    /// Raw payload text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Leading integer of the payload array
    pub fn leading_int(&self) -> Option<i64> {
        LEADING_INT_REGEX
            .captures(&self.raw)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// First string literal in the payload
    pub fn first_string(&self) -> Option<String> {
        first_literal(&self.raw)
    }
}

/// Server-side exception payload (the text after `//EX`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFault {
    raw: String,
}

impl RpcFault {
    /// Raw payload text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Exception type signature, the first string literal of the payload
    pub fn exception_type(&self) -> Option<String> {
        first_literal(&self.raw)
    }

    /// Whether the fault reports a permutation/header mismatch
    pub fn is_version_mismatch(&self, markers: &[String]) -> bool {
        markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| self.raw.contains(m.as_str()))
    }

    /// Short description for error messages
    pub fn summary(&self) -> String {
        snippet(&self.raw)
    }
}

/// Decoded RPC response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcResponse {
    /// `//OK` response
    Ok(RpcPayload),
    /// `//EX` response
    Fault(RpcFault),
}

/// Classify a response body
///
/// Bodies that are neither `//OK` nor `//EX` fail with [`Error::Protocol`].
pub fn decode(body: &str) -> Result<RpcResponse> {
    let trimmed = body.trim_start();
    if let Some(rest) = trimmed.strip_prefix("//OK") {
        return Ok(RpcResponse::Ok(RpcPayload {
            raw: rest.to_string(),
        }));
    }
    if let Some(rest) = trimmed.strip_prefix("//EX") {
        return Ok(RpcResponse::Fault(RpcFault {
            raw: rest.to_string(),
        }));
    }
    Err(Error::protocol(format!(
        "not a GWT-RPC response: {}",
        snippet(body)
    )))
}

fn first_literal(raw: &str) -> Option<String> {
    STRING_LITERAL_REGEX
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
