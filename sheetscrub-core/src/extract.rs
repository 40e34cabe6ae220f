//! Content signature and PII location extraction

use crate::config::{ConfigError, FieldConfig, LayoutConfig};
use crate::error::ExtractError;
use crate::record::{CellRef, WorkoutRecord};
use std::collections::BTreeSet;
use std::fmt;

/// Descriptive, non-identifying attributes of a workout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSignature {
    /// (field label, value) in configured order
    pub parts: Vec<(String, String)>,
    /// Values joined with the layout separator; the translation table key
    pub key: String,
}

impl ContentSignature {
    pub fn new(parts: Vec<(String, String)>, separator: &str) -> Self {
        let key = parts
            .iter()
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join(separator);
        Self { parts, key }
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Derives a content signature from a record
pub trait SignatureRule {
    fn derive(&self, record: &WorkoutRecord) -> Result<ContentSignature, ExtractError>;
}

/// Signature built from labeled fields, each read from the first non-blank
/// of its candidate cells
#[derive(Debug, Clone)]
pub struct FieldSignature {
    fields: Vec<(String, Vec<CellRef>)>,
    separator: String,
}

impl FieldSignature {
    pub fn new(fields: Vec<(String, Vec<CellRef>)>, separator: impl Into<String>) -> Self {
        Self {
            fields,
            separator: separator.into(),
        }
    }

    pub fn from_layout(layout: &LayoutConfig) -> Result<Self, ConfigError> {
        Self::from_fields(&layout.fields, &layout.separator)
    }

    fn from_fields(fields: &[FieldConfig], separator: &str) -> Result<Self, ConfigError> {
        let fields = fields
            .iter()
            .map(|field| Ok::<_, ConfigError>((field.label.clone(), field.candidates()?)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(fields, separator))
    }
}

impl SignatureRule for FieldSignature {
    fn derive(&self, record: &WorkoutRecord) -> Result<ContentSignature, ExtractError> {
        let mut parts = Vec::with_capacity(self.fields.len());
        let mut missing = Vec::new();

        for (label, candidates) in &self.fields {
            let value = candidates
                .iter()
                .filter_map(|cell| record.get(cell))
                .find(|value| !value.is_blank())
                .map(|value| value.display_text());

            match value {
                Some(value) => parts.push((label.clone(), value)),
                None => missing.push(label.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(ExtractError::LayoutMismatch {
                record: record.id.clone(),
                missing,
            });
        }
        Ok(ContentSignature::new(parts, &self.separator))
    }
}

/// Field layouts selected by a marker cell. The first variant whose marker
/// cell is blank in the record applies; otherwise the base layout does.
#[derive(Debug, Clone)]
pub struct VariantSignature {
    variants: Vec<(CellRef, FieldSignature)>,
    base: FieldSignature,
}

impl VariantSignature {
    pub fn new(base: FieldSignature) -> Self {
        Self {
            variants: Vec::new(),
            base,
        }
    }

    pub fn with_variant(mut self, when_blank: CellRef, fields: FieldSignature) -> Self {
        self.variants.push((when_blank, fields));
        self
    }

    pub fn from_layout(layout: &LayoutConfig) -> Result<Self, ConfigError> {
        let mut rule = Self::new(FieldSignature::from_layout(layout)?);
        for variant in &layout.variants {
            let cell = variant
                .when_blank
                .parse::<CellRef>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let fields =
                FieldSignature::from_fields(&variant.merged(&layout.fields), &layout.separator)?;
            rule = rule.with_variant(cell, fields);
        }
        Ok(rule)
    }

    fn select(&self, record: &WorkoutRecord) -> &FieldSignature {
        self.variants
            .iter()
            .find(|(cell, _)| record.get(cell).is_none_or(|value| value.is_blank()))
            .map(|(_, fields)| fields)
            .unwrap_or(&self.base)
    }
}

impl SignatureRule for VariantSignature {
    fn derive(&self, record: &WorkoutRecord) -> Result<ContentSignature, ExtractError> {
        self.select(record).derive(record)
    }
}

/// A record that is not a filled-in workout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screened {
    /// No visible content at all
    Blank,
    /// The unfilled template, still showing its marker text
    UnfilledTemplate,
}

/// Result of a successful extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub signature: ContentSignature,
    /// Configured PII coordinates
    pub pii: BTreeSet<CellRef>,
}

/// Applies the layout convention to records
pub struct Extractor {
    rule: Box<dyn SignatureRule>,
    pii: BTreeSet<CellRef>,
    template_marker: Option<(CellRef, String)>,
    excluded: Vec<String>,
}

impl Extractor {
    pub fn new(rule: Box<dyn SignatureRule>, pii: BTreeSet<CellRef>) -> Self {
        Self {
            rule,
            pii,
            template_marker: None,
            excluded: Vec::new(),
        }
    }

    /// Field signature, PII and screening rules from the layout section
    pub fn from_layout(layout: &LayoutConfig) -> Result<Self, ConfigError> {
        let pii = layout
            .pii_ranges()?
            .iter()
            .flat_map(|range| range.cells())
            .collect();
        let rule: Box<dyn SignatureRule> = if layout.variants.is_empty() {
            Box::new(FieldSignature::from_layout(layout)?)
        } else {
            Box::new(VariantSignature::from_layout(layout)?)
        };
        let mut extractor = Self::new(rule, pii);

        if let Some(marker) = &layout.template_marker {
            let cell = marker
                .cell
                .parse::<CellRef>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            extractor.template_marker = Some((cell, marker.text.clone()));
        }
        extractor.excluded = layout.excluded_signatures.clone();
        Ok(extractor)
    }

    /// Decide whether a record should be left alone before extracting
    pub fn screen(&self, record: &WorkoutRecord) -> Option<Screened> {
        if record.is_blank() {
            return Some(Screened::Blank);
        }

        if let Some((cell, text)) = &self.template_marker {
            let marked = record
                .get(cell)
                .is_some_and(|value| value.display_text() == text.trim());
            if marked {
                return Some(Screened::UnfilledTemplate);
            }
        }

        None
    }

    pub fn extract(&self, record: &WorkoutRecord) -> Result<Extraction, ExtractError> {
        let signature = self.rule.derive(record)?;
        Ok(Extraction {
            signature,
            pii: self.pii.clone(),
        })
    }

    /// Exclusion pattern matched by the signature, if any
    pub fn excluded_by(&self, signature: &ContentSignature) -> Option<&str> {
        self.excluded
            .iter()
            .find(|pattern| signature.key.contains(pattern.as_str()))
            .map(String::as_str)
    }
}
