//! Annotation storage for the active document.
//!
//! The store maps field type ids to either a single annotation or a list,
//! depending on the type's multiplicity. It enforces the structural
//! invariants: at most one annotation for scalar types, never more than
//! `max_annotations` for list types, and no empty lists (removing the last
//! element deletes the key, which keeps step-completion checks trivial).
//!
//! Content rules live in [`crate::validation`]; the store only rejects
//! structural violations, and those rejections are non-fatal warnings for
//! the caller to surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::{Annotation, AnnotationId, DocPoint, FieldTypeSpec};

/// Completion status of a field type step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// No annotation stored yet.
    Pending,
    /// At least one annotation stored.
    Completed,
}

/// One field type's stored value: a single annotation or a list.
///
/// Serialized untagged - an object for scalar fields, an array for
/// multi-valued fields - which is the shape the downstream trainer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    /// Scalar field value.
    Single(Annotation),
    /// Multi-valued field; never empty.
    Multiple(Vec<Annotation>),
}

impl FieldEntry {
    /// View the entry as a slice regardless of arity.
    pub fn as_slice(&self) -> &[Annotation] {
        match self {
            FieldEntry::Single(ann) => std::slice::from_ref(ann),
            FieldEntry::Multiple(list) => list,
        }
    }

    /// Number of annotations in the entry.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// An entry is never retained empty, but the check keeps callers honest.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Outcome of a successful store write, carrying the position the
/// annotation landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new annotation was added.
    Inserted {
        /// Position within the field entry.
        index: usize,
    },
    /// An existing annotation was replaced (scalar, sub-type, or index).
    Replaced {
        /// Position within the field entry.
        index: usize,
    },
}

impl WriteOutcome {
    /// Position the written annotation ended up at.
    pub fn index(&self) -> usize {
        match self {
            WriteOutcome::Inserted { index } | WriteOutcome::Replaced { index } => *index,
        }
    }
}

/// Structural rejection of a store write. Non-fatal: the caller surfaces it
/// as a warning and the store is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreRejection {
    /// The field type already holds its maximum number of annotations
    #[error("'{field}' already has the maximum of {max} annotations")]
    AtCapacity {
        /// Field type that is full
        field: String,
        /// Its configured ceiling
        max: usize,
    },

    /// An index-addressed write pointed outside the stored list
    #[error("no annotation at index {index} for '{field}'")]
    NoSuchIndex {
        /// Field type addressed
        field: String,
        /// The out-of-range index
        index: usize,
    },
}

/// In-memory annotation storage for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStore {
    /// Stored annotations keyed by field type id.
    entries: BTreeMap<String, FieldEntry>,
    /// Counter for generating unique annotation ids.
    next_id: AnnotationId,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Hand out the next annotation id.
    pub fn allocate_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert or replace an annotation for a field type.
    ///
    /// Scalar types replace their existing entry. Multi-valued types replace
    /// the entry sharing the annotation's sub-type when one is set, and
    /// append otherwise. A write that would exceed `max_annotations` is
    /// rejected and the store is left unchanged.
    pub fn upsert(
        &mut self,
        spec: &FieldTypeSpec,
        annotation: Annotation,
    ) -> Result<WriteOutcome, StoreRejection> {
        debug_assert_eq!(annotation.field_type_id, spec.id);

        if !spec.allow_multiple {
            let replaced = self
                .entries
                .insert(spec.id.clone(), FieldEntry::Single(annotation))
                .is_some();
            return Ok(if replaced {
                WriteOutcome::Replaced { index: 0 }
            } else {
                WriteOutcome::Inserted { index: 0 }
            });
        }

        let entry = self
            .entries
            .entry(spec.id.clone())
            .or_insert_with(|| FieldEntry::Multiple(Vec::new()));
        // A scalar entry under a multi-valued spec can only come from a
        // hand-edited cache record; promote it to a list.
        if let FieldEntry::Single(existing) = entry.clone() {
            *entry = FieldEntry::Multiple(vec![existing]);
        }
        let FieldEntry::Multiple(list) = entry else {
            unreachable!()
        };

        if let Some(sub_type) = &annotation.sub_type {
            if let Some((index, slot)) = list
                .iter_mut()
                .enumerate()
                .find(|(_, a)| a.sub_type.as_deref() == Some(sub_type.as_str()))
            {
                *slot = annotation;
                return Ok(WriteOutcome::Replaced { index });
            }
        }

        if list.len() >= spec.max_annotations {
            return Err(StoreRejection::AtCapacity {
                field: spec.id.clone(),
                max: spec.max_annotations,
            });
        }
        list.push(annotation);
        Ok(WriteOutcome::Inserted {
            index: list.len() - 1,
        })
    }

    /// Replace the annotation at a position (used when a move commits).
    pub fn replace_at(
        &mut self,
        field_type_id: &str,
        index: usize,
        annotation: Annotation,
    ) -> Result<WriteOutcome, StoreRejection> {
        match self.entries.get_mut(field_type_id) {
            Some(FieldEntry::Single(slot)) if index == 0 => {
                *slot = annotation;
                Ok(WriteOutcome::Replaced { index })
            }
            Some(FieldEntry::Multiple(list)) if index < list.len() => {
                list[index] = annotation;
                Ok(WriteOutcome::Replaced { index })
            }
            _ => Err(StoreRejection::NoSuchIndex {
                field: field_type_id.to_string(),
                index,
            }),
        }
    }

    /// Remove one annotation.
    ///
    /// For a scalar field the index is ignored and the value is cleared. For
    /// a multi-valued field an index is required; removing the last element
    /// deletes the key entirely.
    pub fn remove(&mut self, field_type_id: &str, index: Option<usize>) -> Option<Annotation> {
        if matches!(self.entries.get(field_type_id), Some(FieldEntry::Single(_))) {
            return match self.entries.remove(field_type_id) {
                Some(FieldEntry::Single(ann)) => Some(ann),
                _ => None,
            };
        }

        let FieldEntry::Multiple(list) = self.entries.get_mut(field_type_id)? else {
            return None;
        };
        let index = index?;
        if index >= list.len() {
            return None;
        }
        let removed = list.remove(index);
        if list.is_empty() {
            self.entries.remove(field_type_id);
        }
        Some(removed)
    }

    /// Clear the whole store (new document, abandoned session).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Completion status of a field type: completed iff a non-empty value
    /// exists.
    pub fn status_of(&self, field_type_id: &str) -> StepStatus {
        if self.entries.contains_key(field_type_id) {
            StepStatus::Completed
        } else {
            StepStatus::Pending
        }
    }

    /// Annotations stored for a field type, scalar or not.
    pub fn annotations_for(&self, field_type_id: &str) -> &[Annotation] {
        self.entries
            .get(field_type_id)
            .map(FieldEntry::as_slice)
            .unwrap_or(&[])
    }

    /// One annotation by field type and position.
    pub fn get(&self, field_type_id: &str, index: usize) -> Option<&Annotation> {
        self.annotations_for(field_type_id).get(index)
    }

    /// Iterate all entries keyed by field type.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of stored annotations across all field types.
    pub fn len(&self) -> usize {
        self.entries.values().map(FieldEntry::len).sum()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of field types with a stored value.
    pub fn completed_count(&self) -> usize {
        self.entries.len()
    }

    /// Find the annotation under a document-space point.
    ///
    /// The last match wins so that later annotations sit "on top" of earlier
    /// ones, matching the draw order of the host's overlay.
    pub fn hit_test(&self, point: DocPoint) -> Option<(&str, usize)> {
        let mut hit = None;
        for (field, entry) in &self.entries {
            for (index, ann) in entry.as_slice().iter().enumerate() {
                if ann.rect.contains(point) {
                    hit = Some((field.as_str(), index));
                }
            }
        }
        hit
    }

    /// Deep copy for the history manager.
    pub fn snapshot(&self) -> AnnotationStore {
        self.clone()
    }

    /// Restore from a snapshot, replacing all current state.
    pub fn restore(&mut self, snapshot: AnnotationStore) {
        *self = snapshot;
    }
}
