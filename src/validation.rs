//! Per-field-type annotation validation.
//!
//! Validation is diagnostic, never blocking: an annotation that fails these
//! rules is still stored, with the messages attached, so tentative or
//! low-confidence regions can be saved and corrected later. The structural
//! `max_annotations` ceiling is enforced at the store layer instead - it is
//! a capacity constraint, not a content constraint.

use crate::model::{Annotation, FieldTypeSpec};

/// Result of validating one annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Diagnostic messages; empty means the annotation passed.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Whether all rules passed.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate an annotation against its field type's rules.
///
/// Rules run in order: size minimums first (the message names the violated
/// minimum), then expected-content patterns when the viewer supplied
/// extracted text.
pub fn validate(spec: &FieldTypeSpec, annotation: &Annotation) -> ValidationReport {
    let mut errors = Vec::new();

    let min = spec.size_constraints;
    if annotation.rect.width < min.min_width {
        errors.push(format!(
            "{} region is too narrow: width {:.0} is below the minimum {:.0}",
            spec.display_label, annotation.rect.width, min.min_width
        ));
    }
    if annotation.rect.height < min.min_height {
        errors.push(format!(
            "{} region is too short: height {:.0} is below the minimum {:.0}",
            spec.display_label, annotation.rect.height, min.min_height
        ));
    }

    if !spec.expected_patterns.is_empty() {
        if let Some(text) = &annotation.extracted_text {
            let matched = spec.expected_patterns.iter().any(|p| p.is_match(text));
            if !matched {
                errors.push(format!(
                    "{} content doesn't match expected format",
                    spec.display_label
                ));
            }
        }
    }

    ValidationReport { errors }
}
