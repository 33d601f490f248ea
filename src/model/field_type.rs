//! Field type specifications.
//!
//! Each supported label (invoice number, total, charge lines, ...) is
//! described by a [`FieldTypeSpec`]: multiplicity limits, size minimums,
//! expected content patterns, and optional sub-types. The specs are loaded
//! once at startup into a [`FieldTypeRegistry`]; the rest of the engine is
//! parameterized by the looked-up spec rather than branching per field.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while loading a field type table.
#[derive(Error, Debug)]
pub enum FieldTypeError {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two specs share the same id
    #[error("Duplicate field type id: {id}")]
    DuplicateId {
        /// The repeated id
        id: String,
    },

    /// An expected-content pattern failed to compile
    #[error("Invalid pattern for field type '{field}': {source}")]
    InvalidPattern {
        /// Field type carrying the pattern
        field: String,
        /// The underlying regex error
        source: regex::Error,
    },

    /// A structural value is out of range
    #[error("Invalid spec for field type '{field}': {message}")]
    InvalidSpec {
        /// Field type with the bad value
        field: String,
        /// Description of the problem
        message: String,
    },
}

impl FieldTypeError {
    fn invalid_spec(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Minimum size a committed annotation must have for a field type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeConstraints {
    /// Minimum width in document units
    pub min_width: f32,
    /// Minimum height in document units
    pub min_height: f32,
}

impl SizeConstraints {
    pub fn new(min_width: f32, min_height: f32) -> Self {
        Self {
            min_width,
            min_height,
        }
    }
}

/// Static description of one supported field type.
///
/// Immutable after startup. `expected_patterns` are compiled once here so
/// validation never re-parses them.
#[derive(Debug, Clone)]
pub struct FieldTypeSpec {
    /// Unique identifier (e.g. "invoice_number").
    pub id: String,
    /// Human-readable label for the step list.
    pub display_label: String,
    /// Whether more than one annotation may be stored for this type.
    pub allow_multiple: bool,
    /// Whether this field must be completed before training.
    pub required: bool,
    /// Confidence floor expected from the extraction model.
    pub min_confidence: f32,
    /// Minimum committed size.
    pub size_constraints: SizeConstraints,
    /// Hard ceiling on stored annotations (1 for scalar fields).
    pub max_annotations: usize,
    /// Patterns the extracted text is expected to match (any-of).
    pub expected_patterns: Vec<Regex>,
    /// Sub-types a multi-valued field decomposes into (e.g. charge columns).
    pub sub_types: Vec<String>,
}

impl FieldTypeSpec {
    /// Check whether a sub-type name belongs to this spec.
    pub fn has_sub_type(&self, sub_type: &str) -> bool {
        self.sub_types.iter().any(|s| s == sub_type)
    }
}

/// Serialized form of a [`FieldTypeSpec`].
///
/// Patterns are kept as strings here because `Regex` has no serde support;
/// they are compiled when the registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTypeConfig {
    pub id: String,
    pub display_label: String,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    pub size_constraints: SizeConstraints,
    #[serde(default = "default_max_annotations")]
    pub max_annotations: usize,
    #[serde(default)]
    pub expected_patterns: Vec<String>,
    #[serde(default)]
    pub sub_types: Vec<String>,
}

fn default_min_confidence() -> f32 {
    0.5
}

fn default_max_annotations() -> usize {
    1
}

/// Ordered table of field type specs.
///
/// Registry order defines annotation step order: `active_step_index` on the
/// session indexes into this table.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    specs: Vec<FieldTypeSpec>,
    by_id: HashMap<String, usize>,
}

impl FieldTypeRegistry {
    /// Build a registry from configs, compiling patterns and checking
    /// structural sanity.
    pub fn from_configs(configs: Vec<FieldTypeConfig>) -> Result<Self, FieldTypeError> {
        let mut registry = Self::default();
        for config in configs {
            registry.insert(config)?;
        }
        Ok(registry)
    }

    /// Parse a registry from a JSON array of field type configs.
    pub fn from_json(json: &str) -> Result<Self, FieldTypeError> {
        let configs: Vec<FieldTypeConfig> = serde_json::from_str(json)?;
        Self::from_configs(configs)
    }

    fn insert(&mut self, config: FieldTypeConfig) -> Result<(), FieldTypeError> {
        if self.by_id.contains_key(&config.id) {
            return Err(FieldTypeError::DuplicateId { id: config.id });
        }
        if config.max_annotations == 0 {
            return Err(FieldTypeError::invalid_spec(
                &config.id,
                "max_annotations must be at least 1",
            ));
        }
        if !config.allow_multiple && config.max_annotations > 1 {
            return Err(FieldTypeError::invalid_spec(
                &config.id,
                "max_annotations > 1 requires allow_multiple",
            ));
        }
        if !config.allow_multiple && !config.sub_types.is_empty() {
            return Err(FieldTypeError::invalid_spec(
                &config.id,
                "sub_types require allow_multiple",
            ));
        }
        if config.size_constraints.min_width <= 0.0 || config.size_constraints.min_height <= 0.0 {
            return Err(FieldTypeError::invalid_spec(
                &config.id,
                "size constraints must be positive",
            ));
        }

        let mut patterns = Vec::with_capacity(config.expected_patterns.len());
        for pattern in &config.expected_patterns {
            let compiled = Regex::new(pattern).map_err(|source| FieldTypeError::InvalidPattern {
                field: config.id.clone(),
                source,
            })?;
            patterns.push(compiled);
        }

        self.by_id.insert(config.id.clone(), self.specs.len());
        self.specs.push(FieldTypeSpec {
            id: config.id,
            display_label: config.display_label,
            allow_multiple: config.allow_multiple,
            required: config.required,
            min_confidence: config.min_confidence,
            size_constraints: config.size_constraints,
            max_annotations: config.max_annotations,
            expected_patterns: patterns,
            sub_types: config.sub_types,
        });
        Ok(())
    }

    /// Look up a spec by id.
    pub fn get(&self, id: &str) -> Option<&FieldTypeSpec> {
        self.by_id.get(id).map(|&i| &self.specs[i])
    }

    /// Step index of a field type, if registered.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Spec at a step index.
    pub fn at(&self, index: usize) -> Option<&FieldTypeSpec> {
        self.specs.get(index)
    }

    /// Iterate specs in step order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldTypeSpec> {
        self.specs.iter()
    }

    /// Number of registered field types.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// The built-in invoice field set.
///
/// Grouping boxes go through the same multiplicity/validation engine as the
/// other types; they differ only in their larger size minimums.
pub fn default_invoice_fields() -> FieldTypeRegistry {
    let configs = vec![
        FieldTypeConfig {
            id: "invoice_number".into(),
            display_label: "Invoice Number".into(),
            allow_multiple: false,
            required: true,
            min_confidence: 0.8,
            size_constraints: SizeConstraints::new(20.0, 8.0),
            max_annotations: 1,
            expected_patterns: vec![r"(?i)(inv|#)?\s*[-A-Z0-9]{4,}".into()],
            sub_types: vec![],
        },
        FieldTypeConfig {
            id: "invoice_date".into(),
            display_label: "Invoice Date".into(),
            allow_multiple: false,
            required: true,
            min_confidence: 0.7,
            size_constraints: SizeConstraints::new(20.0, 8.0),
            max_annotations: 1,
            expected_patterns: vec![
                r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}".into(),
                r"(?i)[a-z]{3,9}\.?\s+\d{1,2},?\s+\d{4}".into(),
            ],
            sub_types: vec![],
        },
        FieldTypeConfig {
            id: "due_date".into(),
            display_label: "Due Date".into(),
            allow_multiple: false,
            required: false,
            min_confidence: 0.7,
            size_constraints: SizeConstraints::new(20.0, 8.0),
            max_annotations: 1,
            expected_patterns: vec![r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}".into()],
            sub_types: vec![],
        },
        FieldTypeConfig {
            id: "vendor_name".into(),
            display_label: "Vendor Name".into(),
            allow_multiple: false,
            required: true,
            min_confidence: 0.6,
            size_constraints: SizeConstraints::new(30.0, 8.0),
            max_annotations: 1,
            expected_patterns: vec![],
            sub_types: vec![],
        },
        FieldTypeConfig {
            id: "total".into(),
            display_label: "Total Amount".into(),
            allow_multiple: true,
            required: true,
            min_confidence: 0.8,
            size_constraints: SizeConstraints::new(15.0, 8.0),
            max_annotations: 3,
            expected_patterns: vec![r"\$[\d,]+\.?\d*".into()],
            sub_types: vec![],
        },
        FieldTypeConfig {
            id: "charges".into(),
            display_label: "Charge Lines".into(),
            allow_multiple: true,
            required: false,
            min_confidence: 0.6,
            size_constraints: SizeConstraints::new(15.0, 6.0),
            max_annotations: 40,
            expected_patterns: vec![],
            sub_types: vec![
                "name".into(),
                "quantity".into(),
                "rate".into(),
                "amount".into(),
            ],
        },
        FieldTypeConfig {
            id: "grouping".into(),
            display_label: "Grouping Box".into(),
            allow_multiple: true,
            required: false,
            min_confidence: 0.5,
            size_constraints: SizeConstraints::new(60.0, 40.0),
            max_annotations: 10,
            expected_patterns: vec![],
            sub_types: vec![],
        },
    ];
    FieldTypeRegistry::from_configs(configs).expect("built-in field table is valid")
}
