//! Export retrieval
//!
//! # Overview
//!
//! [`ExportFetcher::fetch`] turns an authenticated session, an export kind
//! and a date range into one CSV document:
//!
//! 1. One export token is requested per call
//! 2. The range is split into windows by the configured router
//! 3. Windows are fetched sequentially and joined under a single header
//!
//! Expired sessions surface as [`Error::SessionExpired`](crate::Error),
//! everything else that stops an export as [`Error::Export`](crate::Error).

mod fetcher;
mod merge;

pub use fetcher::ExportFetcher;
pub use merge::WindowMerger;
