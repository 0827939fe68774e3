//! User-facing presentation of conversion results.
//!
//! Pure formatting: nothing here touches the guest. Callers pass `now` so the
//! output is reproducible in tests.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use pn2gw_types::{SkipReason, SkippedHandInfo};

use crate::{BridgeError, Conversion, DiagnosticBundle};

const RAW_INPUT_RULE: &str = "----------------------------------------";

/// What the front end should show after a conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Success {
        message: String,
        hand_history: String,
        skipped_report: Option<String>,
    },
    Error {
        message: String,
        detail: Option<String>,
    },
}

impl Presentation {
    pub fn is_success(&self) -> bool {
        matches!(self, Presentation::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Presentation::Error { .. })
    }
}

/// Human-readable label for a skip reason. Unknown reasons are shown as-is.
pub fn reason_label(reason: &SkipReason) -> &str {
    match reason {
        SkipReason::IncompleteHand => "Incomplete hand (not properly closed)",
        SkipReason::TooManyPlayers => "Too many players (> 10)",
        SkipReason::FilteredOut => "Filtered out by player count filter",
        SkipReason::Other(raw) => raw,
    }
}

/// Count skipped hands per reason, in order of first appearance.
pub fn summarize_by_reason(infos: &[SkippedHandInfo]) -> Vec<(&SkipReason, usize)> {
    let mut counts: Vec<(&SkipReason, usize)> = Vec::new();
    for info in infos {
        match counts.iter_mut().find(|(reason, _)| *reason == &info.reason) {
            Some((_, count)) => *count += 1,
            None => counts.push((&info.reason, 1)),
        }
    }
    counts
}

/// Render the skipped-hands report: totals, a per-reason summary, then every
/// hand in the order the guest reported it.
pub fn format_skipped_report(infos: &[SkippedHandInfo], now: DateTime<Utc>) -> String {
    let mut text = format!(
        "=== Skipped Hands Report ===\nTotal skipped: {} hands\nTime: {}\n\n=== Summary by Reason ===\n",
        infos.len(),
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    for (reason, count) in summarize_by_reason(infos) {
        text.push_str(&format!("{}: {} hands\n", reason_label(reason), count));
    }

    text.push_str("\n=== Details ===\n");

    for (index, info) in infos.iter().enumerate() {
        text.push_str(&format!(
            "--- Hand #{} ---\nHand Number: #{}\nHand ID: {}\nReason: {}\nDetail: {}",
            index + 1,
            info.hand_number,
            info.hand_id,
            reason_label(&info.reason),
            info.detail
        ));

        if let Some(count) = info.player_count.filter(|c| *c > 0) {
            text.push_str(&format!("\nPlayer Count: {}", count));
        }

        if !info.raw_input.is_empty() {
            text.push_str(&format!(
                "\n\nRaw Input ({} lines):\n{}\n{}\n{}",
                info.raw_input.len(),
                RAW_INPUT_RULE,
                info.raw_input.join("\n"),
                RAW_INPUT_RULE
            ));
        }

        text.push_str("\n\n");
    }

    text.trim().to_string()
}

/// Choose success or error presentation for a finished conversion call.
pub fn present_conversion(
    result: &Result<Conversion, BridgeError>,
    now: DateTime<Utc>,
) -> Presentation {
    match result {
        Ok(conversion) => {
            let mut message = "Conversion successful!".to_string();
            if conversion.has_skipped() {
                message.push_str(&format!(
                    " ({} hands were skipped)",
                    conversion.skipped_count
                ));
            }

            let skipped_report = conversion
                .skipped_hands
                .as_deref()
                .filter(|infos| !infos.is_empty())
                .map(|infos| format_skipped_report(infos, now));

            Presentation::Success {
                message,
                hand_history: conversion.hand_history.clone(),
                skipped_report,
            }
        }
        Err(BridgeError::Conversion { message }) => Presentation::Error {
            message: "Conversion failed.".to_string(),
            detail: Some(message.clone()),
        },
        Err(err) => Presentation::Error {
            message: "Conversion failed.".to_string(),
            detail: Some(err.to_string()),
        },
    }
}

/// Presentation for a guest module that never became ready.
pub fn present_load_failure(bundle: &DiagnosticBundle) -> Presentation {
    Presentation::Error {
        message: "Failed to load WASM module.".to_string(),
        detail: Some(bundle.to_string()),
    }
}

/// `YYYY-MM-DD_HH-MM-SS` of the first `YYYY/MM/DD HH:MM:SS` timestamp in the
/// converted output, or of `now` when there is none.
pub fn day_played(hand_history: &str, now: DateTime<Utc>) -> String {
    const STAMP_LEN: usize = "2006/01/02 15:04:05".len();
    const OUT_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

    let bytes = hand_history.as_bytes();
    for start in 0..bytes.len().saturating_sub(STAMP_LEN - 1) {
        let candidate = &bytes[start..start + STAMP_LEN];
        if !candidate[0].is_ascii_digit() || candidate[4] != b'/' || candidate[7] != b'/' {
            continue;
        }
        let Ok(candidate) = std::str::from_utf8(candidate) else {
            continue;
        };
        if let Ok(stamp) = NaiveDateTime::parse_from_str(candidate, "%Y/%m/%d %H:%M:%S") {
            return stamp.format(OUT_FORMAT).to_string();
        }
    }

    now.format(OUT_FORMAT).to_string()
}

/// Default file name for saving converted output.
pub fn output_file_name(hand_history: &str, now: DateTime<Utc>) -> String {
    format!("{}.txt", day_played(hand_history, now))
}
