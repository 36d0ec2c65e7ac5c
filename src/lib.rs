// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Cronometer Export
//!
//! A client for the personal data exports of the Cronometer nutrition
//! tracker. Cronometer has no public API: this crate logs in the way the web
//! app does, speaks just enough GWT-RPC to obtain export tokens, and maps the
//! CSV exports onto typed records.
//!
//! ## Features
//!
//! - **Browser login handshake**: CSRF token, form login, GWT `authenticate`
//! - **Configurable GWT values**: permutation and header hashes from
//!   arguments, environment or built-in defaults
//! - **Windowed exports**: long date ranges are split and re-joined
//! - **Tolerant parsing**: column aliases, lenient numbers, raw rows kept
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chrono::NaiveDate;
//! use cronometer_export::{CronometerClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = CronometerClient::new()?;
//!     client.login("email@example.com", "password").await?;
//!
//!     let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//!
//!     for serving in client.get_servings(start, end).await? {
//!         println!("{} {} kcal", serving.food_name, serving.calories);
//!     }
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      CronometerClient                         │
//! │  login() / logout()    get_*() → Vec<T>    get_*_raw() → CSV  │
//! └───────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬────────────┐
//! │   Auth   │    GWT    │    Export     │ Partition │   Decode   │
//! ├──────────┼───────────┼───────────────┼───────────┼────────────┤
//! │ CSRF     │ Encode    │ Token         │ Windows   │ CSV reader │
//! │ Login    │ Decode    │ Fetch         │           │ Aliases    │
//! │ Session  │ Calls     │ Merge         │           │ Records    │
//! └──────────┴───────────┴───────────────┴───────────┴────────────┘
//!                                │
//!                    HTTP transport (reqwest)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types
pub mod types;

/// Client configuration and GWT values
pub mod config;

/// HTTP transport with retry and rate limiting
pub mod http;

/// GWT-RPC codec and service calls
pub mod gwt;

/// Login handshake and sessions
pub mod auth;

/// Date range windowing
pub mod partition;

/// Export retrieval
pub mod export;

/// Typed export records
pub mod models;

/// CSV-to-record mapping
pub mod decode;

/// Client facade
pub mod client;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::CronometerClient;
pub use config::{ClientConfig, GwtConfig};
pub use decode::{parse, parse_records, ExportRecord};
pub use error::{Error, Result};
pub use models::{BiometricEntry, DailyNutrition, Exercise, Note, RawRow, Record, Serving};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
