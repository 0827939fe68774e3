use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Player-count filter bitmask passed to the guest as `filter_flags`.
///
/// `0` keeps every hand; otherwise only hands matching one of the set bits
/// survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterFlags(u32);

impl FilterFlags {
    pub const ALL: FilterFlags = FilterFlags(0);
    /// Heads-up, 2 players.
    pub const HEADS_UP: FilterFlags = FilterFlags(1 << 0);
    /// Spin & Go, 3 players.
    pub const SPIN_AND_GO: FilterFlags = FilterFlags(1 << 1);
    /// MTT, 4-9 players.
    pub const MTT: FilterFlags = FilterFlags(1 << 2);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_all(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: FilterFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for FilterFlags {
    type Output = FilterFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        FilterFlags(self.0 | rhs.0)
    }
}

impl FromIterator<FilterFlags> for FilterFlags {
    fn from_iter<I: IntoIterator<Item = FilterFlags>>(iter: I) -> Self {
        iter.into_iter().fold(FilterFlags::ALL, |acc, f| acc | f)
    }
}

impl FromStr for FilterFlags {
    type Err = String;

    /// Parse a single filter name as used in configuration files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterFlags::ALL),
            "hu" | "heads-up" | "headsup" => Ok(FilterFlags::HEADS_UP),
            "spinandgo" | "spin-and-go" | "spin" => Ok(FilterFlags::SPIN_AND_GO),
            "mtt" => Ok(FilterFlags::MTT),
            other => Err(format!("unknown player count filter: {}", other)),
        }
    }
}

/// Game mode passed to the guest as `game_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    #[default]
    Tournament,
    Cash,
}

impl GameType {
    pub const fn as_u32(&self) -> u32 {
        match self {
            GameType::Tournament => 0,
            GameType::Cash => 1,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Tournament => write!(f, "tournament"),
            GameType::Cash => write!(f, "cash"),
        }
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tournament" | "mtt" => Ok(GameType::Tournament),
            "cash" => Ok(GameType::Cash),
            other => Err(format!("unknown game type: {}", other)),
        }
    }
}

/// Cash-game rake parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RakeSettings {
    /// Percentage of the pot, e.g. `5.0` for 5%.
    pub percent: f64,
    /// Cap in big blinds.
    pub cap_bb: f64,
}

impl RakeSettings {
    pub const fn new(percent: f64, cap_bb: f64) -> Self {
        Self { percent, cap_bb }
    }
}

/// Everything one `parseCSV` call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub csv_text: String,
    pub hero_name: String,
    pub filters: FilterFlags,
    pub game_type: GameType,
    pub rake: Option<RakeSettings>,
}

impl ConvertRequest {
    pub fn new(csv_text: impl Into<String>, hero_name: impl Into<String>) -> Self {
        Self {
            csv_text: csv_text.into(),
            hero_name: hero_name.into(),
            filters: FilterFlags::ALL,
            game_type: GameType::Tournament,
            rake: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterFlags) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_game_type(mut self, game_type: GameType) -> Self {
        self.game_type = game_type;
        self
    }

    pub fn with_rake(mut self, rake: RakeSettings) -> Self {
        self.rake = Some(rake);
        self
    }

    /// `(rake_percent, rake_cap_bb)` as sent over the ABI.
    ///
    /// Rake only applies to cash games. Every other case sends `0.0` for both
    /// words; the guest tells "no rake" apart from "zero rake" by `game_type`.
    pub fn rake_words(&self) -> (f64, f64) {
        match (self.game_type, self.rake) {
            (GameType::Cash, Some(rake)) => (rake.percent, rake.cap_bb),
            _ => (0.0, 0.0),
        }
    }
}
