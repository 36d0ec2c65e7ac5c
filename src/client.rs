//! Cronometer client
//!
//! [`CronometerClient`] owns the session and wires the authenticator, the
//! export fetcher and the CSV mapper together.
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use cronometer_export::CronometerClient;
//!
//! # async fn run() -> cronometer_export::Result<()> {
//! let mut client = CronometerClient::new()?;
//! client.login("email@example.com", "password").await?;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! let servings = client.get_servings(start, end).await?;
//! println!("{} servings", servings.len());
//! # Ok(())
//! # }
//! ```

use crate::auth::{Authenticator, Session};
use crate::config::ClientConfig;
use crate::decode::{self, ExportRecord};
use crate::error::{Error, Result};
use crate::export::ExportFetcher;
use crate::http::{HttpClient, Transport};
use crate::models::{BiometricEntry, DailyNutrition, Exercise, Note, Serving};
use crate::partition::DateRangeRouter;
use crate::types::{DateRange, ExportKind};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::warn;

/// Client for Cronometer's personal data exports
pub struct CronometerClient {
    config: ClientConfig,
    authenticator: Arc<Authenticator>,
    fetcher: ExportFetcher,
    session: Option<Session>,
}

impl CronometerClient {
    /// Create a client with default configuration
    ///
    /// GWT values come from the environment when set, otherwise from the
    /// built-in defaults.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client overriding the GWT permutation and header hashes
    pub fn with_gwt(permutation: Option<&str>, header: Option<&str>) -> Result<Self> {
        Self::with_config(
            ClientConfig::builder()
                .gwt_overrides(permutation, header)
                .build(),
        )
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpClient::with_config(config.http.clone())?);
        Self::with_transport(config, transport)
    }

    /// Create a client on top of any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let endpoints = config.endpoints();
        let router = DateRangeRouter::new(config.max_span_days)?;
        let authenticator = Arc::new(Authenticator::new(
            transport.clone(),
            endpoints.clone(),
            config.gwt.clone(),
        ));
        let fetcher = ExportFetcher::new(transport, endpoints, authenticator.clone(), router);

        Ok(Self {
            config,
            authenticator,
            fetcher,
            session: None,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Log in, replacing any previous session
    ///
    /// The previous session is dropped before the attempt, so a failed login
    /// leaves the client logged out.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        self.session = None;
        self.session = Some(self.authenticator.login(email, password).await?);
        Ok(())
    }

    /// Log out
    ///
    /// The local session is always dropped. The result reports whether the
    /// service acknowledged the logout.
    pub async fn logout(&mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => self.authenticator.logout(&session).await,
            None => Ok(()),
        }
    }

    /// Whether a usable session exists
    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_authenticated)
    }

    /// Current session
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    // ========================================================================
    // Exports
    // ========================================================================

    /// Raw CSV of any export kind, `start` and `end` inclusive
    pub async fn export_raw(
        &mut self,
        kind: ExportKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String> {
        let range = DateRange::new(start, end)?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| Error::auth("Not authenticated. Call login() first."))?;

        let result = self.fetcher.fetch(session, kind, range).await;

        if let Err(Error::SessionExpired { .. }) = &result {
            warn!(kind = %kind, "Session expired, log in again");
            if let Some(session) = self.session.as_mut() {
                session.invalidate();
            }
        }
        result
    }

    /// Typed records of any export kind
    pub async fn export<T: ExportRecord>(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<T>> {
        let csv = self.export_raw(T::KIND, start, end).await?;
        decode::parse_records(&csv)
    }

    /// Food servings
    pub async fn get_servings(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Serving>> {
        self.export(start, end).await
    }

    /// Daily nutrition totals
    pub async fn get_daily_nutrition(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyNutrition>> {
        self.export(start, end).await
    }

    /// Biometric measurements
    pub async fn get_biometrics(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BiometricEntry>> {
        self.export(start, end).await
    }

    /// Notes
    pub async fn get_notes(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Note>> {
        self.export(start, end).await
    }

    /// Exercises
    pub async fn get_exercises(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Exercise>> {
        self.export(start, end).await
    }

    /// Raw CSV of food servings
    pub async fn get_servings_raw(&mut self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        self.export_raw(ExportKind::Servings, start, end).await
    }

    /// Raw CSV of daily nutrition totals
    pub async fn get_daily_nutrition_raw(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String> {
        self.export_raw(ExportKind::DailyNutrition, start, end)
            .await
    }

    /// Raw CSV of biometric measurements
    pub async fn get_biometrics_raw(&mut self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        self.export_raw(ExportKind::Biometrics, start, end).await
    }

    /// Raw CSV of notes
    pub async fn get_notes_raw(&mut self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        self.export_raw(ExportKind::Notes, start, end).await
    }

    /// Raw CSV of exercises
    pub async fn get_exercises_raw(&mut self, start: NaiveDate, end: NaiveDate) -> Result<String> {
        self.export_raw(ExportKind::Exercises, start, end).await
    }
}

impl std::fmt::Debug for CronometerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronometerClient")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
