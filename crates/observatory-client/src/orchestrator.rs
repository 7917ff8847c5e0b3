//! Scan orchestrator: submit a scan, poll until it settles, cache the result.
//!
//! This module provides the [`ScanOrchestrator`] which drives one remote
//! scan job through its lifecycle:
//!
//! ```text
//! NotStarted -> Submitting -> Polling -> Finished
//!                                    \-> Failed | RetriesExhausted | Error
//! ```
//!
//! Only a `Finished` scan is ever returned as a result; every other ending
//! is reported through [`ObservatoryError`]. Polls run strictly one after
//! the other with a fixed delay between them.

use crate::error::{ObservatoryError, Result};
use crate::invoker::ApiInvoker;
use crate::record::{has_error_payload, ScanRecord, ScanState};
use crate::request::{RequestSpec, RESCAN_BODY};
use chrono::{DateTime, Utc};
use observatory_core::{ClientConfig, Site};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Command used both to submit and to poll a scan.
pub const ANALYZE_COMMAND: &str = "analyze";

/// Fixed-interval polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two polls
    pub interval: Duration,
    /// Number of polls before giving up
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Create a policy; at least one poll is always made.
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 5)
    }
}

impl From<&ClientConfig> for PollPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.poll_interval(), config.retries)
    }
}

/// Where the last resolution got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    /// Nothing attempted yet
    #[default]
    NotStarted,
    /// Posting a rescan request
    Submitting,
    /// Waiting for the scan to leave PENDING
    Polling,
    /// Scan finished; result returned (possibly from cache)
    Finished,
    /// Service reported the scan as failed
    Failed,
    /// Scan still pending after the whole retry budget
    RetriesExhausted,
    /// Input, transport, HTTP or API error
    Error,
}

/// What a single poll tells us to do next.
#[derive(Debug)]
enum PollStep {
    Done(ScanRecord),
    Failed(ScanRecord),
    Wait,
}

impl PollStep {
    fn classify(record: ScanRecord) -> Self {
        match record.state {
            ScanState::Finished => Self::Done(record),
            ScanState::Failed => Self::Failed(record),
            ScanState::Pending => Self::Wait,
            ScanState::Other(_) | ScanState::Unknown => {
                // Unknown states are transient, same as PENDING
                tracing::warn!("unrecognised scan state '{}', still polling", record.state);
                Self::Wait
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CachedScan {
    site: Site,
    record: ScanRecord,
}

/// Drives scans of single sites and keeps the last finished one.
///
/// Resolution takes `&mut self`: share an orchestrator across tasks only
/// behind a mutex held for the whole [`resolve`](Self::resolve) call, so
/// that at most one submission is outstanding per cache window.
#[derive(Debug)]
pub struct ScanOrchestrator {
    invoker: ApiInvoker,
    policy: PollPolicy,
    cache_ttl: Duration,
    cache: Option<CachedScan>,
    phase: ScanPhase,
    cancel: Option<CancellationToken>,
}

impl ScanOrchestrator {
    /// Create a new orchestrator with an empty cache.
    #[must_use]
    pub fn new(invoker: ApiInvoker, policy: PollPolicy, cache_ttl: Duration) -> Self {
        Self {
            invoker,
            policy,
            cache_ttl,
            cache: None,
            phase: ScanPhase::NotStarted,
            cancel: None,
        }
    }

    /// Stop polling once `token` is cancelled.
    ///
    /// The token is checked before every poll, never while a request is
    /// in flight.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Invoker used for every request.
    #[must_use]
    pub fn invoker(&self) -> &ApiInvoker {
        &self.invoker
    }

    /// Polling policy in use.
    #[must_use]
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Phase reached by the last resolution.
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Last finished record, whether or not it is still fresh.
    #[must_use]
    pub fn cached(&self) -> Option<&ScanRecord> {
        self.cache.as_ref().map(|c| &c.record)
    }

    /// Forget the cached record.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// Resolve `site` to a finished scan record.
    ///
    /// A fresh cached record for the same site is returned without any
    /// network call. Otherwise, when `force_rescan` is set, a rescan is
    /// submitted first; then `analyze` is polled until the scan finishes,
    /// fails, or the retry budget runs out.
    pub async fn resolve(&mut self, site: &str, force_rescan: bool) -> Result<ScanRecord> {
        let site = match Site::new(site) {
            Ok(site) => site,
            Err(e) => {
                self.phase = ScanPhase::Error;
                return Err(e.into());
            }
        };

        if let Some(record) = self.fresh_cached(&site, Utc::now()) {
            tracing::debug!("cache hit for {} (scan {})", site, record.scan_id);
            self.phase = ScanPhase::Finished;
            return Ok(record);
        }

        let result = self.run(&site, force_rescan).await;
        self.phase = match &result {
            Ok(_) => ScanPhase::Finished,
            Err(ObservatoryError::ScanFailed { .. }) => ScanPhase::Failed,
            Err(ObservatoryError::RetriesExhausted { .. }) => ScanPhase::RetriesExhausted,
            Err(_) => ScanPhase::Error,
        };
        tracing::info!("scan of {} ended in {:?}", site, self.phase);
        result
    }

    /// Cached record for `site` if it is still valid at `now`; a stale entry is dropped.
    fn fresh_cached(&mut self, site: &Site, now: DateTime<Utc>) -> Option<ScanRecord> {
        let cached = self.cache.as_ref()?;
        if cached.site != *site {
            return None;
        }
        if cached.record.is_fresh_at(self.cache_ttl, now) {
            return Some(cached.record.clone());
        }
        tracing::debug!("cached scan for {} is stale, dropping it", site);
        self.cache = None;
        None
    }

    async fn run(&mut self, site: &Site, force_rescan: bool) -> Result<ScanRecord> {
        if force_rescan {
            self.phase = ScanPhase::Submitting;
            self.submit(site).await?;
        }

        self.phase = ScanPhase::Polling;
        let record = self.poll(site).await?;

        self.cache = Some(CachedScan {
            site: site.clone(),
            record: record.clone(),
        });
        Ok(record)
    }

    async fn submit(&self, site: &Site) -> Result<()> {
        tracing::info!("submitting rescan of {}", site);
        let spec = RequestSpec::post(ANALYZE_COMMAND)
            .with_option("host", site.as_str())
            .with_body(RESCAN_BODY);

        let body = self.invoker.call(&spec).await?;

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) if has_error_payload(&value) => {
                tracing::debug!("submission of {} rejected: {}", site, body);
                Err(ObservatoryError::Api { body })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!("submission answer for {} is not JSON ({}), continuing", site, e);
                Ok(())
            }
        }
    }

    async fn poll(&self, site: &Site) -> Result<ScanRecord> {
        let spec = RequestSpec::get(ANALYZE_COMMAND).with_option("host", site.as_str());
        let mut attempts = 0;

        loop {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(ObservatoryError::Cancelled);
            }

            let body = self.invoker.call(&spec).await?;
            attempts += 1;

            match PollStep::classify(ScanRecord::from_body(&body)?) {
                PollStep::Done(record) => {
                    tracing::debug!("{} finished after {} poll(s)", site, attempts);
                    return Ok(record);
                }
                PollStep::Failed(record) => {
                    return Err(ObservatoryError::ScanFailed {
                        site: site.to_string(),
                        record: Box::new(record),
                    });
                }
                PollStep::Wait => {}
            }

            if attempts >= self.policy.max_attempts {
                tracing::debug!("too many retries for {}", site);
                return Err(ObservatoryError::RetriesExhausted {
                    attempts,
                    last_payload: body,
                });
            }

            tracing::warn!(
                "scan of {} pending (poll {}/{}), retrying in {:?}",
                site,
                attempts,
                self.policy.max_attempts,
                self.policy.interval
            );
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}
