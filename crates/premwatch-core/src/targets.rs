use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Optional hints describing how to drive a council's search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormHints {
    /// CSS selector for the search form when the page holds several.
    #[serde(default)]
    pub form_selector: Option<String>,
    /// Name of the free-text query input.
    #[serde(default)]
    pub query_field: Option<String>,
    /// Value submitted in `query_field`; an empty search by default.
    #[serde(default)]
    pub query_value: Option<String>,
    /// The register only renders with JavaScript.
    #[serde(default)]
    pub requires_rendering: bool,
    /// Additional fixed fields submitted with the form.
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

/// One council licensing site to attempt. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTarget {
    pub council_id: String,
    pub url: String,
    #[serde(default)]
    pub form_hints: Option<FormHints>,
}

impl ExtractionTarget {
    #[must_use]
    pub fn new(council_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            council_id: council_id.into(),
            url: url.into(),
            form_hints: None,
        }
    }

    #[must_use]
    pub fn with_form_hints(mut self, hints: FormHints) -> Self {
        self.form_hints = Some(hints);
        self
    }

    #[must_use]
    pub fn requires_rendering(&self) -> bool {
        self.form_hints
            .as_ref()
            .is_some_and(|h| h.requires_rendering)
    }
}

/// Entry in the targets file produced by council discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub council_id: String,
    /// Human-readable council name, for logs only.
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub form_hints: Option<FormHints>,
    /// Disabled entries stay in the file but are never dispatched.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TargetConfig {
    #[must_use]
    pub fn to_target(&self) -> ExtractionTarget {
        ExtractionTarget {
            council_id: self.council_id.clone(),
            url: self.url.clone(),
            form_hints: self.form_hints.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TargetsFile {
    pub targets: Vec<TargetConfig>,
}

impl TargetsFile {
    /// Enabled targets in file order.
    #[must_use]
    pub fn extraction_targets(&self) -> Vec<ExtractionTarget> {
        self.targets
            .iter()
            .filter(|t| t.enabled)
            .map(TargetConfig::to_target)
            .collect()
    }
}

/// Load and validate the targets list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_targets(path: &Path) -> Result<TargetsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TargetsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_targets(&content)
}

/// Parse and validate targets YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_targets(content: &str) -> Result<TargetsFile, ConfigError> {
    let targets_file: TargetsFile =
        serde_yaml::from_str(content).map_err(ConfigError::TargetsFileParse)?;

    validate_targets(&targets_file)?;

    Ok(targets_file)
}

fn validate_targets(targets_file: &TargetsFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for target in &targets_file.targets {
        let id = target.council_id.trim();
        if id.is_empty() {
            return Err(ConfigError::Validation(
                "council_id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate council_id: '{id}'"
            )));
        }

        let parsed = url::Url::parse(&target.url).map_err(|e| {
            ConfigError::Validation(format!(
                "council '{id}' has invalid url '{}': {e}",
                target.url
            ))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "council '{id}' url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
    }

    Ok(())
}
