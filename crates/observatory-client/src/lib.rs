//! Observatory Client - scan websites through the Mozilla HTTP Observatory API.
//!
//! This crate submits a scan of a site, polls the remote job until it
//! settles and exposes the grade, score, scan id and full report of the
//! result. The last finished scan is cached per session.
//!
//! # Features
//!
//! - Fixed-interval polling with a configurable retry budget
//! - Session cache of the last finished scan, valid for a fixed window
//!   after the scan's end time
//! - Typed errors for every failure class (transport, HTTP status,
//!   in-band API error, failed scan, exhausted retries)
//! - Optional proxy credentials and cancellation between polls
//!
//! # Example
//!
//! ```rust,ignore
//! use observatory_client::ObservatoryClient;
//! use observatory_core::AppConfig;
//!
//! let config = AppConfig::load_with_env()?;
//! let mut client = ObservatoryClient::new(&config)?;
//!
//! let grade = client.grade("www.mozilla.org").await?;
//! let report = client.scan_report("www.mozilla.org").await?;
//! println!("{grade}: {} tests", report.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod invoker;
pub mod orchestrator;
pub mod record;
pub mod request;
pub mod transport;

/// Version of this client library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types
pub use client::{ObservatoryClient, ReportTarget, INVALID_GRADE, INVALID_SCORE};
pub use error::{ObservatoryError, Result};
pub use invoker::{ApiInvoker, IN_BAND_ERROR_MARKER};
pub use orchestrator::{PollPolicy, ScanOrchestrator, ScanPhase, ANALYZE_COMMAND};
pub use record::{HostHistoryEntry, ScanRecord, ScanReport, ScanState, TestOutcome};
pub use request::{build_request, RequestSpec, RESCAN_BODY};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpTransport, ProxyMode, TransportProvider};
