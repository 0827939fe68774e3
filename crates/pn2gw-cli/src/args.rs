use anyhow::{anyhow, Result};
use clap::Parser;
use pn2gw_config::AppConfig;
use pn2gw_types::{ConvertRequest, FilterFlags, GameType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pn2gw",
    author,
    version,
    about = "Convert PokerNow CSV logs into GTO Wizard hand histories",
    long_about = None
)]
pub struct Args {
    /// Config file path
    #[arg(short, long, default_value = "pn2gw.toml")]
    pub config: PathBuf,

    /// Guest converter module (overrides config)
    #[arg(long)]
    pub module: Option<PathBuf>,

    /// Input CSV file (stdin if not specified)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long, conflicts_with = "auto_name")]
    pub output: Option<PathBuf>,

    /// Name the output file after the first hand's timestamp
    #[arg(long)]
    pub auto_name: bool,

    /// Directory for --auto-name output
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Hero display name
    #[arg(long)]
    pub hero_name: Option<String>,

    /// Include heads-up hands (2 players)
    #[arg(long)]
    pub filter_hu: bool,

    /// Include Spin-and-Go hands (3 players)
    #[arg(long)]
    pub filter_spinandgo: bool,

    /// Include MTT hands (4-9 players)
    #[arg(long)]
    pub filter_mtt: bool,

    /// cash or tournament
    #[arg(long)]
    pub game_type: Option<GameType>,

    /// Rake percentage for cash games (e.g. 5.0 for 5%)
    #[arg(long)]
    pub rake_percent: Option<f64>,

    /// Rake cap in big blinds (e.g. 4.0 for 4BB)
    #[arg(long)]
    pub rake_cap_bb: Option<f64>,

    /// Write the skipped hands report to this file
    #[arg(long)]
    pub skipped_report: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(module) = &self.module {
            config.module.path = module.clone();
        }
        if let Some(hero) = &self.hero_name {
            config.conversion.hero_name = Some(hero.clone());
        }

        let flags = self.filter_flags();
        if !flags.is_all() {
            config.conversion.filters = [
                (FilterFlags::HEADS_UP, "hu"),
                (FilterFlags::SPIN_AND_GO, "spinandgo"),
                (FilterFlags::MTT, "mtt"),
            ]
            .iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .map(|(_, name)| name.to_string())
            .collect();
        }

        if let Some(game_type) = self.game_type {
            config.conversion.game_type = game_type;
        } else if self.rake_percent.is_some() || self.rake_cap_bb.is_some() {
            // 指定了 rake 就是现金局
            config.conversion.game_type = GameType::Cash;
        }
        if let Some(percent) = self.rake_percent {
            config.conversion.rake_percent = percent;
        }
        if let Some(cap) = self.rake_cap_bb {
            config.conversion.rake_cap_bb = cap;
        }

        config
    }

    pub fn filter_flags(&self) -> FilterFlags {
        [
            (self.filter_hu, FilterFlags::HEADS_UP),
            (self.filter_spinandgo, FilterFlags::SPIN_AND_GO),
            (self.filter_mtt, FilterFlags::MTT),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, flag)| flag)
        .collect()
    }
}

/// Build the guest request from CSV text and the effective configuration.
pub fn build_request(csv_text: String, config: &AppConfig) -> Result<ConvertRequest> {
    let hero = config
        .conversion
        .hero_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| anyhow!("--hero-name is required"))?;

    let mut request = ConvertRequest::new(csv_text, hero)
        .with_filters(config.conversion.filter_flags()?)
        .with_game_type(config.conversion.game_type);
    if let Some(rake) = config.conversion.rake() {
        request = request.with_rake(rake);
    }

    Ok(request)
}
