//! # Configuration
//!
//! Settings for the `otr` binary, loaded with [`confique`] in priority order:
//!
//! 1. **Environment variables**: `OTR_PRETTY`, `OTR_LOG_LEVEL`.
//! 2. **Project Config**: `otr.toml` in the working directory, if present.
//! 3. **Compiled Defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `pretty` | `true` | Pretty-print JSON output |
//! | `log_level` | `warn` | Log filter used when `OTR_LOG` is unset |

use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{OtrError, Result};

pub const CONFIG_FILE: &str = "otr.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OtrConfig {
    /// Pretty-print JSON output.
    #[config(env = "OTR_PRETTY", default = true)]
    pub pretty: bool,

    /// Default tracing filter directive (e.g. "warn", "off_the_record=debug").
    #[config(env = "OTR_LOG_LEVEL", default = "warn")]
    pub log_level: String,
}

impl Default for OtrConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            log_level: "warn".to_string(),
        }
    }
}

impl OtrConfig {
    /// Loads from the environment and `otr.toml` in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        Self::builder()
            .env()
            .file(dir.join(CONFIG_FILE))
            .load()
            .map_err(|e| OtrError::Config(e.to_string()))
    }

    /// Renders `value` as JSON according to `pretty`.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(rendered)
    }
}
