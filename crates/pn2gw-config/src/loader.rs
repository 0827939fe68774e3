use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::AppConfig;

/// Prefix for environment overrides, e.g. `PN2GW__MODULE__PATH`.
pub const ENV_PREFIX: &str = "PN2GW";

/// 配置加载器
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// 创建配置加载器。文件不存在时使用默认配置。
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            env: None,
        }
    }

    /// Defaults plus environment, no file.
    pub fn without_file() -> Self {
        Self {
            path: None,
            env: None,
        }
    }

    /// Read overrides from `vars` instead of the process environment.
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// 加载配置
    pub fn load(&self) -> Result<AppConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.path {
            builder = builder.add_source(
                File::new(
                    path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                    FileFormat::Toml,
                )
                .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(self.env.clone()),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 验证配置。命令行覆盖之后需要再次调用。
    pub fn validate(config: &AppConfig) -> Result<()> {
        let conversion = &config.conversion;

        if !(0.0..=100.0).contains(&conversion.rake_percent) {
            return Err(anyhow!(
                "rake_percent ({}) must be between 0 and 100",
                conversion.rake_percent
            ));
        }

        if !conversion.rake_cap_bb.is_finite() || conversion.rake_cap_bb < 0.0 {
            return Err(anyhow!(
                "rake_cap_bb ({}) must be a non-negative number",
                conversion.rake_cap_bb
            ));
        }

        if config.module.max_memory_pages == 0 {
            return Err(anyhow!("max_memory_pages must be greater than 0"));
        }

        conversion.filter_flags()?;

        Ok(())
    }
}
