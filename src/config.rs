//! Client configuration
//!
//! The GWT permutation and header hashes come from the service's compiled
//! frontend and change whenever Cronometer ships a new build. They are plain
//! configuration: an explicit argument wins over the environment, which wins
//! over the built-in default.

use crate::http::HttpClientConfig;

// ============================================================================
// GWT Defaults
// ============================================================================

/// Content type of GWT-RPC requests
pub const DEFAULT_GWT_CONTENT_TYPE: &str = "text/x-gwt-rpc; charset=UTF-8";

/// GWT module base of the Cronometer web app
pub const DEFAULT_GWT_MODULE_BASE: &str = "https://cronometer.com/cronometer/";

/// Permutation hash of the last known frontend build
pub const DEFAULT_GWT_PERMUTATION: &str = "7B121DC5483BF272B1BC1916DA9FA963";

/// Serialization policy (header) hash of the last known frontend build
pub const DEFAULT_GWT_HEADER: &str = "2D6A926E3729946302DC68073CB0D550";

/// Environment variable overriding the permutation hash
pub const ENV_GWT_PERMUTATION: &str = "CRONOMETER_GWT_PERMUTATION";

/// Environment variable overriding the header hash
pub const ENV_GWT_HEADER: &str = "CRONOMETER_GWT_HEADER";

/// Fault fragments the GWT servlet emits when the client build is stale
pub const DEFAULT_VERSION_FAULT_MARKERS: [&str; 3] = [
    "IncompatibleRemoteServiceException",
    "This application is out of date",
    "SerializationException",
];

// ============================================================================
// Service Defaults
// ============================================================================

/// Base URL of the Cronometer service
pub const DEFAULT_BASE_URL: &str = "https://cronometer.com";

/// Longest window requested from the export endpoint in one call
pub const DEFAULT_MAX_SPAN_DAYS: u32 = 365;

// ============================================================================
// GWT Config
// ============================================================================

/// GWT-RPC settings shared by every RPC call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GwtConfig {
    /// `content-type` header of RPC requests
    pub content_type: String,
    /// `x-gwt-module-base` header and first string of every payload
    pub module_base: String,
    /// `x-gwt-permutation` header
    pub permutation: String,
    /// Serialization policy hash, second string of every payload
    pub header: String,
    /// Fault fragments identifying a permutation/header mismatch
    pub version_fault_markers: Vec<String>,
}

impl Default for GwtConfig {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_GWT_CONTENT_TYPE.to_string(),
            module_base: DEFAULT_GWT_MODULE_BASE.to_string(),
            permutation: DEFAULT_GWT_PERMUTATION.to_string(),
            header: DEFAULT_GWT_HEADER.to_string(),
            version_fault_markers: DEFAULT_VERSION_FAULT_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

impl GwtConfig {
    /// Resolve permutation and header from arguments, then the process
    /// environment, then the built-in defaults
    pub fn resolve(permutation: Option<&str>, header: Option<&str>) -> Self {
        Self::resolve_with(permutation, header, |name| std::env::var(name).ok())
    }

    /// Resolve with a custom environment lookup
    ///
    /// Empty values are skipped at every level so the resolved fields are
    /// never empty.
    pub fn resolve_with<F>(permutation: Option<&str>, header: Option<&str>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |arg: Option<&str>, var: &str, default: &str| -> String {
            arg.filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            permutation: pick(permutation, ENV_GWT_PERMUTATION, DEFAULT_GWT_PERMUTATION),
            header: pick(header, ENV_GWT_HEADER, DEFAULT_GWT_HEADER),
            ..Self::default()
        }
    }

    /// Replace the version fault markers
    #[must_use]
    pub fn with_version_fault_markers(mut self, markers: Vec<String>) -> Self {
        self.version_fault_markers = markers;
        self
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// URLs of the service endpoints, derived from a base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Endpoints {
    /// Create endpoints rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// HTML login page carrying the CSRF token
    pub fn login_page(&self) -> String {
        format!("{}/login/", self.base_url)
    }

    /// Credential submission endpoint
    pub fn login_api(&self) -> String {
        format!("{}/login", self.base_url)
    }

    /// GWT-RPC servlet
    pub fn gwt_app(&self) -> String {
        format!("{}/cronometer/app", self.base_url)
    }

    /// CSV export endpoint
    pub fn export(&self) -> String {
        format!("{}/export", self.base_url)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

// ============================================================================
// Client Config
// ============================================================================

/// Complete configuration of a [`crate::CronometerClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL
    pub base_url: String,
    /// GWT-RPC settings
    pub gwt: GwtConfig,
    /// Longest window per export request, `None` disables splitting
    pub max_span_days: Option<u32>,
    /// Transport settings
    pub http: HttpClientConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            gwt: GwtConfig::resolve(None, None),
            max_span_days: Some(DEFAULT_MAX_SPAN_DAYS),
            http: HttpClientConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Endpoints derived from the base URL
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.base_url)
    }
}

/// Builder for client config
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Override permutation and header, falling back to env and defaults
    pub fn gwt_overrides(mut self, permutation: Option<&str>, header: Option<&str>) -> Self {
        let markers = self.config.gwt.version_fault_markers.clone();
        self.config.gwt = GwtConfig::resolve(permutation, header).with_version_fault_markers(markers);
        self
    }

    /// Set the complete GWT config
    pub fn gwt(mut self, gwt: GwtConfig) -> Self {
        self.config.gwt = gwt;
        self
    }

    /// Set the longest window per export request
    pub fn max_span_days(mut self, days: Option<u32>) -> Self {
        self.config.max_span_days = days;
        self
    }

    /// Set transport settings
    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.config.http = http;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
