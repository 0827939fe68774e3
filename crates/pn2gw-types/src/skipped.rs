use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Why the guest dropped a hand.
///
/// Reasons the host does not know are kept verbatim so a newer guest never
/// breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SkipReason {
    IncompleteHand,
    TooManyPlayers,
    FilteredOut,
    Other(String),
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            SkipReason::IncompleteHand => "incomplete_hand",
            SkipReason::TooManyPlayers => "too_many_players",
            SkipReason::FilteredOut => "filtered_out",
            SkipReason::Other(raw) => raw,
        }
    }
}

impl From<String> for SkipReason {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "incomplete_hand" => SkipReason::IncompleteHand,
            "too_many_players" => SkipReason::TooManyPlayers,
            "filtered_out" => SkipReason::FilteredOut,
            _ => SkipReason::Other(raw),
        }
    }
}

impl From<SkipReason> for String {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the skipped-detail JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedHandInfo {
    /// Sequential hand number. The guest may emit it as a number or a string.
    #[serde(deserialize_with = "number_or_string")]
    pub hand_number: String,
    pub hand_id: String,
    pub reason: SkipReason,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_count: Option<u32>,
    /// Original CSV lines of the hand.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_input: Vec<String>,
}

impl SkippedHandInfo {
    /// Decode the guest's skipped-detail payload.
    pub fn parse_list(json: &str) -> serde_json::Result<Vec<SkippedHandInfo>> {
        serde_json::from_str(json)
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
