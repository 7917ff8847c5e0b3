//! Wire types returned by the scanning service.
//!
//! Field names follow the service's snake_case JSON contract exactly. While
//! a scan is still pending most fields come back as `null`; those decode to
//! their default value rather than failing the whole record.

use crate::error::{ObservatoryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a remote scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScanState {
    /// Queued or running on the service
    Pending,
    /// Completed; grade and score are authoritative
    Finished,
    /// The service gave up on the scan
    Failed,
    /// Any other server-defined state string
    Other(String),
    /// State missing from the response
    #[default]
    Unknown,
}

impl ScanState {
    /// Whether this state ends polling.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl From<String> for ScanState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            "" => Self::Unknown,
            _ => Self::Other(value),
        }
    }
}

impl From<ScanState> for String {
    fn from(state: ScanState) -> Self {
        match state {
            ScanState::Pending => "PENDING".to_string(),
            ScanState::Finished => "FINISHED".to_string(),
            ScanState::Failed => "FAILED".to_string(),
            ScanState::Other(other) => other,
            ScanState::Unknown => String::new(),
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Finished => f.write_str("FINISHED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Other(other) => f.write_str(other),
            Self::Unknown => f.write_str("<unknown>"),
        }
    }
}

/// One scan run as reported by the `analyze` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Version of the grading algorithm
    #[serde(default, deserialize_with = "null_default")]
    pub algorithm_version: u32,
    /// Letter grade, e.g. `A+`
    #[serde(default, deserialize_with = "null_default")]
    pub grade: String,
    /// Numeric score; negative values are error sentinels
    #[serde(default, deserialize_with = "null_default")]
    pub score: i32,
    /// Scan identifier; zero means none was assigned
    #[serde(default, deserialize_with = "null_default")]
    pub scan_id: u64,
    /// Start timestamp in the service's format
    #[serde(default)]
    pub start_time: Option<String>,
    /// End timestamp in the service's format
    #[serde(default)]
    pub end_time: Option<String>,
    /// Lifecycle state
    #[serde(default, deserialize_with = "null_default")]
    pub state: ScanState,
    /// HTTP status the scanned site answered with
    #[serde(default, deserialize_with = "null_default")]
    pub status_code: u16,
    /// Whether the scan is hidden from public listings
    #[serde(default, deserialize_with = "null_default")]
    pub hidden: bool,
    /// Risk summary (`LOW`, `MEDIUM`, ...)
    #[serde(default)]
    pub likelihood_indicator: Option<String>,
    /// Number of failed tests
    #[serde(default, deserialize_with = "null_default")]
    pub tests_failed: u32,
    /// Number of passed tests
    #[serde(default, deserialize_with = "null_default")]
    pub tests_passed: u32,
    /// Total number of tests
    #[serde(default, deserialize_with = "null_default")]
    pub tests_quantity: u32,
    /// Response headers of the scanned site
    #[serde(default, deserialize_with = "null_default")]
    pub response_headers: BTreeMap<String, String>,
}

impl ScanRecord {
    /// Decode an `analyze` response body.
    ///
    /// A JSON object carrying an `error` key is the service's in-band error
    /// signal and becomes [`ObservatoryError::Api`].
    pub fn from_body(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        if has_error_payload(&value) {
            return Err(ObservatoryError::Api {
                body: body.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Parse `end_time` into a UTC timestamp.
    ///
    /// The service sends RFC 2822 dates (`Tue, 22 Mar 2016 21:51:41 GMT`);
    /// RFC 3339 is accepted as well.
    #[must_use]
    pub fn end_time_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.end_time.as_deref()?;
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether the record may still be served from cache at `now`.
    ///
    /// Valid strictly before `end_time + ttl`; at the edge itself the record
    /// is stale. Records without a parseable end time are never fresh.
    #[must_use]
    pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Some(end) = self.end_time_utc() else {
            return false;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        end.checked_add_signed(ttl).is_some_and(|expiry| now < expiry)
    }
}

/// Outcome of a single test in a full scan report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Expected result for a well-configured site
    #[serde(default, deserialize_with = "null_default")]
    pub expectation: String,
    /// Test name
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    /// Test-specific details, kept as-is
    #[serde(default)]
    pub output: serde_json::Value,
    /// Whether the test passed
    #[serde(default, deserialize_with = "null_default")]
    pub pass: bool,
    /// Actual result
    #[serde(default, deserialize_with = "null_default")]
    pub result: String,
    /// Human readable explanation of the score modifier
    #[serde(default, deserialize_with = "null_default")]
    pub score_description: String,
    /// Points added to or removed from the score
    #[serde(default, deserialize_with = "null_default")]
    pub score_modifier: i32,
}

/// Full test-by-test report of a scan, keyed by test name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanReport(pub BTreeMap<String, TestOutcome>);

impl ScanReport {
    /// Decode a `getScanResults` response body.
    pub fn from_body(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        if has_error_payload(&value) {
            return Err(ObservatoryError::Api {
                body: body.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Look up a single test.
    #[must_use]
    pub fn get(&self, test: &str) -> Option<&TestOutcome> {
        self.0.get(test)
    }

    /// Tests that did not pass.
    pub fn failed(&self) -> impl Iterator<Item = &TestOutcome> {
        self.0.values().filter(|t| !t.pass)
    }

    /// Number of tests in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the report holds no tests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One past scan of a host, as listed by `getHostHistory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostHistoryEntry {
    /// End timestamp in the service's format
    #[serde(default, deserialize_with = "null_default")]
    pub end_time: String,
    /// End timestamp as seconds since the epoch
    #[serde(default, deserialize_with = "null_default")]
    pub end_time_unix_timestamp: i64,
    /// Letter grade
    #[serde(default, deserialize_with = "null_default")]
    pub grade: String,
    /// Scan identifier
    #[serde(default, deserialize_with = "null_default")]
    pub scan_id: u64,
    /// Numeric score
    #[serde(default, deserialize_with = "null_default")]
    pub score: i32,
}

/// Decode a `getHostHistory` response body, keeping server order.
pub fn decode_host_history(body: &str) -> Result<Vec<HostHistoryEntry>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if has_error_payload(&value) {
        return Err(ObservatoryError::Api {
            body: body.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// Whether a decoded body is an `{"error": ...}` object.
pub(crate) fn has_error_payload(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("error"))
        .is_some_and(|err| !err.is_null())
}

fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
