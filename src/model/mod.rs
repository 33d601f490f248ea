//! Core data model: annotations, geometry, and field type specifications.

mod annotation;
mod field_type;

pub use annotation::{Annotation, AnnotationId, DocPoint, DocRect};
pub use field_type::{
    FieldTypeConfig, FieldTypeError, FieldTypeRegistry, FieldTypeSpec, SizeConstraints,
    default_invoice_fields,
};
