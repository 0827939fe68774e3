use chrono::{DateTime, SecondsFormat, Utc};
use pn2gw_types::SkippedHandInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Successful output of one `parseCSV` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Converted hand-history document.
    pub hand_history: String,
    pub skipped_count: u32,
    /// Per-hand detail, `None` when the guest sent none or it failed to
    /// decode.
    pub skipped_hands: Option<Vec<SkippedHandInfo>>,
}

impl Conversion {
    pub fn has_skipped(&self) -> bool {
        self.skipped_count > 0
    }
}

/// Everything captured when the guest module fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticBundle {
    pub message: String,
    /// Full error chain, plus a backtrace when one was captured.
    pub stack: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticBundle {
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::from_error_at(err, Utc::now())
    }

    pub fn from_error_at(err: &anyhow::Error, timestamp: DateTime<Utc>) -> Self {
        let stack = format!("{:?}", err);
        Self {
            message: format!("{:#}", err),
            stack: if stack.trim().is_empty() {
                "N/A".to_string()
            } else {
                stack
            },
            user_agent: user_agent(),
            timestamp,
        }
    }
}

impl fmt::Display for DiagnosticBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.message)?;
        writeln!(f, "Stack: {}", self.stack)?;
        writeln!(f, "User Agent: {}", self.user_agent)?;
        write!(
            f,
            "Time: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Host identification string reported in diagnostics.
pub fn user_agent() -> String {
    format!(
        "pn2gw/{} ({}; {}) wasmtime",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
