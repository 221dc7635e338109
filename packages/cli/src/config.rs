use anyhow::Context;
use redline_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "redline.config.json";

/// Redline configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Author recorded on every tracked change
    #[serde(default = "default_author")]
    pub author: String,

    /// Locator thresholds and recorder options
    #[serde(flatten)]
    pub editor: EditorConfig,
}

fn default_author() -> String {
    "Redline".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("cannot read {}", config_path.display()))?;
            serde_json::from_str::<Config>(&content)
                .with_context(|| format!("invalid {}", config_path.display()))?
        } else {
            // Return default config if none exists
            Config::default()
        };

        config.editor.validate()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author: default_author(),
            editor: EditorConfig::default(),
        }
    }
}
