// src/settings.rs

use std::{path::Path, time::Duration};

use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_QUIET_PERIOD_MS: i64 = 300;
const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Serialize, Deserialize)]
pub struct Backend {
    pub base_url: String,
    /// Per-request timeout. The transport waits indefinitely when unset.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Filter {
    pub quiet_period_ms: u64,
}

impl Filter {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Search {
    pub page_size: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub backend: Backend,
    pub filter: Filter,
    pub search: Search,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Settings made of defaults only.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .set_default("backend.base_url", DEFAULT_BASE_URL)?
            .set_default("filter.quiet_period_ms", DEFAULT_QUIET_PERIOD_MS)?
            .set_default("search.page_size", DEFAULT_PAGE_SIZE)
    }
}
