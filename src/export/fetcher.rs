//! Export fetcher implementation

use super::merge::WindowMerger;
use crate::auth::{login_redirect, Authenticator, Session};
use crate::config::Endpoints;
use crate::error::{snippet, Error, Result, ResultExt};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::partition::DateRangeRouter;
use crate::types::{DateRange, ExportKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Headers the browser sends when it navigates to a download
const NAVIGATION_HEADERS: [(&str, &str); 3] = [
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
];

/// Retrieves raw CSV exports for an authenticated session
pub struct ExportFetcher {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    authenticator: Arc<Authenticator>,
    router: DateRangeRouter,
}

impl ExportFetcher {
    /// Create a fetcher
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        authenticator: Arc<Authenticator>,
        router: DateRangeRouter,
    ) -> Self {
        Self {
            transport,
            endpoints,
            authenticator,
            router,
        }
    }

    /// Router used to split long ranges
    pub fn router(&self) -> &DateRangeRouter {
        &self.router
    }

    /// Fetch the export of `kind` for `range` as one CSV document
    ///
    /// The range is split into windows that are fetched in order and joined
    /// under the first window's header. Any failing window fails the call.
    pub async fn fetch(
        &self,
        session: &Session,
        kind: ExportKind,
        range: DateRange,
    ) -> Result<String> {
        if !session.is_authenticated() {
            return Err(Error::auth("Not logged in"));
        }

        let token = self.authenticator.export_token(session).await?;
        let windows = self.router.partitions(&range);
        let total = windows.len();
        let mut merger = WindowMerger::new(kind);

        for (idx, window) in windows.iter().enumerate() {
            let result = self
                .fetch_window(session, &token, kind, window)
                .await
                .and_then(|body| merger.push(window, body));

            if result.is_err() {
                warn!(
                    kind = %kind,
                    window = %window,
                    discarded = idx,
                    "Export window failed"
                );
            }
            result.export_context(kind, range, || window_position(window, idx, total))?;
        }

        let csv = merger.finish()?;
        info!(kind = %kind, range = %range, windows = total, "Fetched export");
        Ok(csv)
    }

    /// GET one window and validate the body
    async fn fetch_window(
        &self,
        session: &Session,
        token: &str,
        kind: ExportKind,
        window: &DateRange,
    ) -> Result<String> {
        let mut request = HttpRequest::get(self.endpoints.export())
            .query("nonce", token)
            .query("generate", kind.generate_param())
            .query("start", window.start().format(DATE_FORMAT).to_string())
            .query("end", window.end().format(DATE_FORMAT).to_string())
            .cookies(session.cookies().iter());
        for (key, value) in NAVIGATION_HEADERS {
            request = request.header(key, value);
        }

        debug!(kind = %kind, window = %window, "Fetching export window");
        let response = self.transport.send(request).await?;
        check_response(response, kind, window)
    }
}

/// Classify an export response, returning the CSV body
fn check_response(response: HttpResponse, kind: ExportKind, window: &DateRange) -> Result<String> {
    if matches!(response.status, 401 | 403) {
        return Err(Error::session_expired(format!(
            "export returned status {}",
            response.status
        )));
    }

    if response.status == 429 {
        let retry_after_seconds = response
            .header("retry-after")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(60);
        return Err(Error::RateLimited {
            retry_after_seconds,
        });
    }

    if let Some(location) = login_redirect(&response) {
        return Err(Error::session_expired(format!(
            "export redirected to {location}"
        )));
    }
    if response.is_redirect() {
        let location = response.location().unwrap_or_default();
        return Err(Error::export(
            kind,
            Some(*window),
            format!("unexpected redirect to {location}"),
        ));
    }

    if !response.is_success() {
        return Err(Error::export(
            kind,
            Some(*window),
            format!("status {}: {}", response.status, snippet(&response.body)),
        ));
    }

    let trimmed = response.body.trim_start();
    if trimmed.is_empty() {
        return Err(Error::export(kind, Some(*window), "empty response body"));
    }
    if looks_like_html(trimmed) {
        return Err(Error::export(
            kind,
            Some(*window),
            format!("received HTML instead of CSV: {}", snippet(trimmed)),
        ));
    }

    Ok(response.body)
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(15).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Where a failing window sits in a split range, empty for a single window
fn window_position(window: &DateRange, idx: usize, total: usize) -> String {
    if total <= 1 {
        return String::new();
    }
    format!(
        "window {}/{total} ({window}), {idx} earlier window(s) discarded",
        idx + 1
    )
}
