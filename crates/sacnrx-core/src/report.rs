use serde::Serialize;

use crate::listener::ListenerStats;
use crate::receiver::ReceiverSnapshot;

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no wall-clock time is supplied.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Final state of a listen or replay run.
///
/// # Examples
/// ```
/// use sacnrx_core::{Report, REPORT_VERSION};
///
/// let report = Report::new(None, Default::default(), Vec::new());
/// assert_eq!(report.report_version, REPORT_VERSION);
/// assert!(report.receivers.is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp; overwritten by the CLI.
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputInfo>,
    pub stats: ListenerStats,
    /// Receivers in universe order, then creation order.
    pub receivers: Vec<ReceiverSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Capture replayed to produce the report.
#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub path: String,
    pub bytes: u64,
    /// Frames that were not sACN-port UDP.
    pub skipped_frames: u64,
}

impl Report {
    pub fn new(
        input: Option<InputInfo>,
        stats: ListenerStats,
        receivers: Vec<ReceiverSnapshot>,
    ) -> Self {
        Self {
            report_version: REPORT_VERSION,
            tool: ToolInfo {
                name: "sacnrx".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            generated_at: DEFAULT_GENERATED_AT.to_string(),
            input,
            stats,
            receivers,
        }
    }
}
