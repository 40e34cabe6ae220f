//! Configuration system for the organizer

use crate::record::{CellRange, CellRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Main organizer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub folders: FolderConfig,
    #[serde(default)]
    pub translations: TranslationConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check that every cell reference parses and the layout is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layout.fields.is_empty() {
            return Err(ConfigError::Invalid(
                "layout needs at least one [[layout.fields]] entry".into(),
            ));
        }
        if self.layout.separator.is_empty() {
            return Err(ConfigError::Invalid("layout.separator must not be empty".into()));
        }

        for field in &self.layout.fields {
            if field.cells.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "field '{}' has no candidate cells",
                    field.label
                )));
            }
            field.candidates()?;
        }
        for variant in &self.layout.variants {
            parse_cell(&variant.when_blank)?;
            for field in &variant.fields {
                if !self.layout.fields.iter().any(|f| f.label == field.label) {
                    return Err(ConfigError::Invalid(format!(
                        "variant for blank {} overrides unknown field '{}'",
                        variant.when_blank, field.label
                    )));
                }
                if field.cells.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "field '{}' has no candidate cells",
                        field.label
                    )));
                }
                field.candidates()?;
            }
        }
        self.layout.pii_ranges()?;
        if let Some(marker) = &self.layout.template_marker {
            parse_cell(&marker.cell)?;
        }

        match (&self.translations.csv, &self.translations.spreadsheet) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "translations: set either 'csv' or 'spreadsheet', not both".into(),
            )),
            (None, None) => Err(ConfigError::Invalid(
                "translations: one of 'csv' or 'spreadsheet' is required".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Source and destination folders. Missing values are asked for at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderConfig {
    pub source: Option<String>,
    pub destination: Option<String>,
}

/// Where the translation table lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Local CSV file
    pub csv: Option<PathBuf>,
    /// Spreadsheet file id in the cloud service
    pub spreadsheet: Option<String>,
}

/// Layout convention of the source workout sheets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Descriptive fields composing the content signature, in order
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    /// Older sheet layouts, tried in order before `fields`
    #[serde(default)]
    pub variants: Vec<LayoutVariant>,
    /// Joins the field values into the signature key
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Cells and ranges holding client-identifying data
    #[serde(default)]
    pub pii: Vec<String>,
    /// Signatures containing any of these are left alone
    #[serde(default)]
    pub excluded_signatures: Vec<String>,
    /// Marks an unfilled template sheet
    #[serde(default)]
    pub template_marker: Option<TemplateMarker>,
}

impl LayoutConfig {
    pub fn pii_ranges(&self) -> Result<Vec<CellRange>, ConfigError> {
        self.pii
            .iter()
            .map(|s| {
                s.parse::<CellRange>()
                    .map_err(|e| ConfigError::Invalid(format!("pii: {e}")))
            })
            .collect()
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            variants: Vec::new(),
            separator: default_separator(),
            pii: Vec::new(),
            excluded_signatures: Vec::new(),
            template_marker: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub label: String,
    /// Candidate cells; the first non-blank one supplies the value
    pub cells: Vec<String>,
}

impl FieldConfig {
    pub fn new(label: impl Into<String>, cells: &[&str]) -> Self {
        Self {
            label: label.into(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn candidates(&self) -> Result<Vec<CellRef>, ConfigError> {
        self.cells.iter().map(|c| parse_cell(c)).collect()
    }
}

/// A layout recognized by a cell that is blank in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutVariant {
    pub when_blank: String,
    /// Replace the entries of `layout.fields` with the same label
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl LayoutVariant {
    /// `base` with this variant's overrides applied, order kept
    pub fn merged(&self, base: &[FieldConfig]) -> Vec<FieldConfig> {
        base.iter()
            .map(|field| {
                self.fields
                    .iter()
                    .find(|f| f.label == field.label)
                    .unwrap_or(field)
                    .clone()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMarker {
    pub cell: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Append the client token looked up by source file name
    #[serde(default)]
    pub append_client_token: bool,
    #[serde(default = "default_token_separator")]
    pub token_separator: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            append_client_token: false,
            token_separator: default_token_separator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Ask before copying each record
    #[serde(default)]
    pub confirm_each_record: bool,
    /// Only process source files that have a row in the translation table
    #[serde(default)]
    pub only_listed_files: bool,
    /// Source files whose names contain any of these are never processed
    #[serde(default = "default_exclusions")]
    pub exclude_file_names: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            confirm_each_record: false,
            only_listed_files: false,
            exclude_file_names: default_exclusions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Environment variable holding the OAuth access token
    #[serde(default = "default_token_env")]
    pub access_token_env: String,
    /// Grant this address write access to every created copy
    #[serde(default)]
    pub share_with: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            access_token_env: default_token_env(),
            share_with: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn parse_cell(s: &str) -> Result<CellRef, ConfigError> {
    s.parse::<CellRef>()
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}

fn default_separator() -> String {
    "|".to_string()
}

fn default_token_separator() -> String {
    " - ".to_string()
}

fn default_exclusions() -> Vec<String> {
    vec!["Workout Translations".to_string()]
}

fn default_token_env() -> String {
    "GOOGLE_ACCESS_TOKEN".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[folders]
source = "src-folder"

[translations]
csv = "translations.csv"

[layout]
pii = ["B1", "D1:E2"]
excluded_signatures = ["Foundation 1"]
template_marker = { cell = "A1", text = "Name: " }

[[layout.fields]]
label = "type"
cells = ["B2", "B4"]

[[layout.fields]]
label = "level"
cells = ["B3"]

[[layout.variants]]
when_blank = "A1"

[[layout.variants.fields]]
label = "type"
cells = ["B4"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.folders.source.as_deref(), Some("src-folder"));
        assert_eq!(config.folders.destination, None);
        assert_eq!(config.layout.separator, "|");
        assert_eq!(config.layout.fields.len(), 2);
        assert_eq!(config.layout.variants[0].when_blank, "A1");
        assert!(!config.workflow.only_listed_files);
        assert_eq!(config.layout.pii_ranges().unwrap().len(), 2);
        assert_eq!(config.workflow.exclude_file_names, vec!["Workout Translations"]);
        assert_eq!(config.service.access_token_env, "GOOGLE_ACCESS_TOKEN");
        assert!(!config.naming.append_client_token);
    }

    #[test]
    fn test_example_file_is_valid() {
        let config = Config::from_toml(include_str!("../../sheetscrub.toml.example")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.layout.fields[0].cells, vec!["B2"]);
        assert_eq!(config.layout.variants[0].fields[0].cells, vec!["B4"]);
    }

    #[test]
    fn test_variant_overrides_by_label() {
        let config = Config::from_toml(SAMPLE).unwrap();
        let merged = config.layout.variants[0].merged(&config.layout.fields);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].label, "type");
        assert_eq!(merged[0].cells, vec!["B4"]);
        assert_eq!(merged[1].cells, vec!["B3"]);
    }

    #[test]
    fn test_validation() {
        let config = Config::from_toml(SAMPLE).unwrap();

        // No fields
        let mut bad = config.clone();
        bad.layout.fields.clear();
        assert!(bad.validate().is_err());

        // Bad PII range
        let mut bad = config.clone();
        bad.layout.pii.push("B0".into());
        assert!(bad.validate().is_err());

        // Bad candidate cell
        let mut bad = config.clone();
        bad.layout.fields.push(FieldConfig::new("extra", &["??"]));
        assert!(bad.validate().is_err());

        // Variant overriding a field that does not exist
        let mut bad = config.clone();
        bad.layout.variants[0].fields.push(FieldConfig::new("tempo", &["C4"]));
        assert!(bad.validate().is_err());

        // Bad variant marker cell
        let mut bad = config.clone();
        bad.layout.variants[0].when_blank = "A".into();
        assert!(bad.validate().is_err());

        // Both backends
        let mut bad = config.clone();
        bad.translations.spreadsheet = Some("sheet".into());
        assert!(bad.validate().is_err());

        // No backend
        let mut bad = config.clone();
        bad.translations.csv = None;
        assert!(bad.validate().is_err());
    }
}
