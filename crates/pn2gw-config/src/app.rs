use anyhow::{anyhow, Result};
use pn2gw_types::{FilterFlags, GameType, RakeSettings};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Guest 模块配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModuleConfig {
    #[serde(default = "default_module_path")]
    pub path: PathBuf,
    /// 64 KiB pages
    #[serde(default = "default_max_memory_pages")]
    pub max_memory_pages: u32,
}

/// 转换默认参数
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub hero_name: Option<String>,
    #[serde(default)]
    pub game_type: GameType,
    /// Filter names: `hu`, `spinandgo`, `mtt`. Empty keeps every hand.
    /// Accepts a list or a comma-separated string (`PN2GW__CONVERSION__FILTERS=hu,mtt`).
    #[serde(default, deserialize_with = "list_or_joined")]
    pub filters: Vec<String>,
    #[serde(default)]
    pub rake_percent: f64,
    #[serde(default)]
    pub rake_cap_bb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

// 默认值函数
fn default_module_path() -> PathBuf {
    PathBuf::from("pn2gw.wasm")
}

fn default_max_memory_pages() -> u32 {
    16 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn list_or_joined<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Filters {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Filters::deserialize(deserializer)? {
        Filters::List(names) => names,
        Filters::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            path: default_module_path(),
            max_memory_pages: default_max_memory_pages(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ConversionConfig {
    pub fn filter_flags(&self) -> Result<FilterFlags> {
        self.filters
            .iter()
            .map(|name| name.parse::<FilterFlags>().map_err(|e| anyhow!(e)))
            .collect()
    }

    /// Rake for cash games; `None` for tournaments.
    pub fn rake(&self) -> Option<RakeSettings> {
        match self.game_type {
            GameType::Cash => Some(RakeSettings::new(self.rake_percent, self.rake_cap_bb)),
            GameType::Tournament => None,
        }
    }
}

impl AppConfig {
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
