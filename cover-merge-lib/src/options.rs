use crate::borders::{BorderSpec, BorderStyle};
use crate::error::MergeError;
use crate::placeholder::DEFAULT_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_size() -> u8 {
    BorderSpec::default().size
}

fn default_color() -> String {
    BorderSpec::default().color
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Everything that controls one merge.
#[serde(deny_unknown_fields)]
pub struct MergeOptions {
    #[serde(default)]
    /// Replaces the placeholder in the prefix. `None` or empty leaves the prefix as is.
    pub title: Option<String>,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default)]
    pub borders: BorderOptions,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            title: None,
            placeholder: default_placeholder(),
            borders: BorderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Border normalization for the body's tables.
#[serde(deny_unknown_fields)]
pub struct BorderOptions {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(default = "default_size")]
    /// Line width in eighths of a point.
    pub size: u8,
    #[serde(default)]
    pub space: u8,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for BorderOptions {
    fn default() -> Self {
        let spec = BorderSpec::default();
        Self {
            enabled: default_enabled(),
            style: spec.style,
            size: spec.size,
            space: spec.space,
            color: spec.color,
        }
    }
}

impl BorderOptions {
    pub fn spec(&self) -> BorderSpec {
        BorderSpec {
            style: self.style,
            size: self.size,
            space: self.space,
            color: self.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsFormat {
    Json,
    Yaml,
    Toml,
}

impl OptionsFormat {
    /// Picks the format from a file extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self, MergeError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(OptionsFormat::Json),
            Some("yaml") | Some("yml") => Ok(OptionsFormat::Yaml),
            Some("toml") => Ok(OptionsFormat::Toml),
            _ => Err(MergeError::InvalidOptions(format!(
                "unsupported config file extension: {} (expected .json, .yaml, .yml or .toml)",
                path.display()
            ))),
        }
    }
}

impl MergeOptions {
    /// Reads options from a config file. The file is not validated here, so
    /// command-line overrides can still fix it up.
    pub fn from_path(path: &Path) -> Result<Self, MergeError> {
        let format = OptionsFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|err| {
            MergeError::InvalidOptions(format!(
                "failed to read config file {}: {err}",
                path.display()
            ))
        })?;
        Self::parse(&content, format).map_err(|err| match err {
            MergeError::InvalidOptions(reason) => {
                MergeError::InvalidOptions(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(content: &str, format: OptionsFormat) -> Result<Self, MergeError> {
        let parsed: Result<Self, String> = match format {
            OptionsFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            OptionsFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            OptionsFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| MergeError::InvalidOptions(format!("failed to parse options: {reason}")))
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.placeholder.is_empty() {
            return Err(MergeError::InvalidOptions(
                "placeholder must not be empty".to_string(),
            ));
        }
        self.borders.spec().validate()
    }

    /// The title to substitute, if there is a non-empty one.
    pub fn effective_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }
}
