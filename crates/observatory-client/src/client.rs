//! High-level client: one session against the Observatory API.

use crate::error::{ObservatoryError, Result};
use crate::invoker::ApiInvoker;
use crate::orchestrator::{PollPolicy, ScanOrchestrator, ScanPhase};
use crate::record::{decode_host_history, HostHistoryEntry, ScanRecord, ScanReport};
use crate::request::RequestSpec;
use crate::transport::{HttpTransport, TransportProvider};
use observatory_core::{AppConfig, ClientConfig, Site};
use tokio_util::sync::CancellationToken;

/// Grade shown for a site whose scan could not be resolved.
pub const INVALID_GRADE: &str = "Z";

/// Score shown for a site whose scan could not be resolved.
pub const INVALID_SCORE: i32 = -1;

const SCAN_RESULTS_COMMAND: &str = "getScanResults";
const HOST_HISTORY_COMMAND: &str = "getHostHistory";

/// What to fetch a full report for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    /// A known scan id
    ScanId(u64),
    /// The most recent scan of a site
    Site(String),
}

impl From<u64> for ReportTarget {
    fn from(id: u64) -> Self {
        Self::ScanId(id)
    }
}

impl From<&str> for ReportTarget {
    fn from(site: &str) -> Self {
        Self::Site(site.to_string())
    }
}

impl From<String> for ReportTarget {
    fn from(site: String) -> Self {
        Self::Site(site)
    }
}

/// A session against the Observatory API.
///
/// Holds the HTTP transport, the polling policy and the cache of the last
/// finished scan. Methods that may poll take `&mut self`.
#[derive(Debug)]
pub struct ObservatoryClient {
    orchestrator: ScanOrchestrator,
    config: ClientConfig,
}

impl ObservatoryClient {
    /// Create a client using the proxy settings from `config`.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_transport(config, &HttpTransport::from(&config.proxy))
    }

    /// Create a client with a caller-supplied transport.
    pub fn with_transport(config: &AppConfig, transport: &dyn TransportProvider) -> Result<Self> {
        let config = config.clone().normalized();
        config.validate()?;

        let http = transport.http_client(config.client.timeout())?;
        let invoker = ApiInvoker::new(http, config.client.base_url.clone());
        let orchestrator = ScanOrchestrator::new(
            invoker,
            PollPolicy::from(&config.client),
            config.client.cache_ttl(),
        );

        tracing::debug!(
            "observatory client for {} (timeout {}s, {} retries)",
            config.client.base_url,
            config.client.timeout_secs,
            config.client.retries
        );

        Ok(Self {
            orchestrator,
            config: config.client,
        })
    }

    /// Stop polling once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.orchestrator = self.orchestrator.with_cancellation(token);
        self
    }

    /// Effective (normalised) client settings.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Configured verbosity level.
    #[must_use]
    pub fn verbosity(&self) -> u8 {
        self.config.log_level
    }

    /// Phase reached by the last scan resolution.
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        self.orchestrator.phase()
    }

    /// Last finished scan held by this session.
    #[must_use]
    pub fn cached_record(&self) -> Option<&ScanRecord> {
        self.orchestrator.cached()
    }

    /// Drop the cached scan so the next call goes to the network.
    pub fn clear_cache(&mut self) {
        self.orchestrator.clear_cache();
    }

    /// Full finished record for `site`.
    pub async fn analyze(&mut self, site: &str, force_rescan: bool) -> Result<ScanRecord> {
        self.orchestrator.resolve(site, force_rescan).await
    }

    /// Numeric score of a fresh scan of `site`.
    ///
    /// Negative scores are passed through untouched.
    pub async fn score(&mut self, site: &str) -> Result<i32> {
        tracing::debug!("score");
        Ok(self.orchestrator.resolve(site, true).await?.score)
    }

    /// Letter grade of a fresh scan of `site`.
    pub async fn grade(&mut self, site: &str) -> Result<String> {
        tracing::debug!("grade");
        Ok(self.orchestrator.resolve(site, true).await?.grade)
    }

    /// Id of the most recent scan of `site`, without forcing a rescan.
    ///
    /// A zero id is reported as [`ObservatoryError::MissingScanId`].
    pub async fn scan_id(&mut self, site: &str) -> Result<u64> {
        tracing::debug!("scan_id");
        let record = self.orchestrator.resolve(site, false).await?;
        if record.scan_id == 0 {
            return Err(ObservatoryError::MissingScanId {
                site: site.to_string(),
            });
        }
        Ok(record.scan_id)
    }

    /// Test-by-test report of scan `scan_id`. Single GET, no polling.
    pub async fn scan_results(&self, scan_id: u64) -> Result<ScanReport> {
        if scan_id == 0 {
            return Err(ObservatoryError::InvalidInput(
                "scan id 0 is not valid".to_string(),
            ));
        }

        let spec =
            RequestSpec::get(SCAN_RESULTS_COMMAND).with_option("scan", scan_id.to_string());
        let body = self.orchestrator.invoker().call(&spec).await?;
        ScanReport::from_body(&body)
    }

    /// Report for a scan id, or for the most recent scan of a site.
    pub async fn scan_report(&mut self, target: impl Into<ReportTarget>) -> Result<ScanReport> {
        let scan_id = match target.into() {
            ReportTarget::ScanId(id) => id,
            ReportTarget::Site(site) => self.scan_id(&site).await?,
        };
        self.scan_results(scan_id).await
    }

    /// Past scans of `site`, most recent first as sent by the service.
    pub async fn host_history(&self, site: &str) -> Result<Vec<HostHistoryEntry>> {
        let site = Site::new(site)?;
        let spec = RequestSpec::get(HOST_HISTORY_COMMAND).with_option("host", site.as_str());
        let body = self.orchestrator.invoker().call(&spec).await?;
        decode_host_history(&body)
    }
}
