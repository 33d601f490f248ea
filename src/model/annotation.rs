//! Annotation data model.
//!
//! All geometry here lives in *document space*: the coordinate system
//! intrinsic to the rendered page, independent of zoom and scroll. Conversion
//! to and from viewport pixels is the job of [`crate::transform`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an annotation within a session.
pub type AnnotationId = u32;

/// A 2D point in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in document coordinates.
///
/// Always normalized: `width` and `height` are non-negative, `x`/`y` is the
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocRect {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl DocRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a normalized rectangle from two corner points.
    ///
    /// Negative drag deltas flip the anchor so width/height stay
    /// non-negative.
    pub fn from_corners(p1: DocPoint, p2: DocPoint) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            width: (p1.x - p2.x).abs(),
            height: (p1.y - p2.y).abs(),
        }
    }

    /// Check if a point is inside the rectangle.
    pub fn contains(&self, point: DocPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Return the rectangle moved so its top-left corner is at (x, y).
    pub fn at(&self, x: f32, y: f32) -> Self {
        Self { x, y, ..*self }
    }

    /// Check that both dimensions exceed the given threshold.
    ///
    /// Used to discard degenerate drags before they reach the store.
    pub fn exceeds(&self, min_size: f32) -> bool {
        self.width > min_size && self.height > min_size
    }
}

/// A labeled rectangle over one page of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier within the session.
    pub id: AnnotationId,
    /// The field type this annotation labels.
    pub field_type_id: String,
    /// Sub-type for decomposed field types (e.g. a charge line's "amount").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// Page of the document this rectangle lies on.
    pub page: u32,
    /// The labeled region, in document space.
    pub rect: DocRect,
    /// When the annotation was first committed.
    pub created_at: DateTime<Utc>,
    /// Text extracted from the region by the viewer, if available.
    /// Used by content validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

impl Annotation {
    /// Create a new annotation for a field type.
    pub fn new(id: AnnotationId, field_type_id: impl Into<String>, page: u32, rect: DocRect) -> Self {
        Self {
            id,
            field_type_id: field_type_id.into(),
            sub_type: None,
            page,
            rect,
            created_at: Utc::now(),
            extracted_text: None,
        }
    }

    /// Set the sub-type.
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    /// Set the extracted text.
    pub fn with_extracted_text(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = Some(text.into());
        self
    }
}
