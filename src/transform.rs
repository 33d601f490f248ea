//! Document-space / viewport-space conversion.
//!
//! The math is extracted into a pure value type for testability. A
//! [`ViewTransform`] captures the viewport geometry at one instant: the
//! viewport-space origin of the document *content* (not the scrollable
//! container - the document may be centered or padded inside it), the current
//! scroll offset, and the zoom scale.
//!
//! Pointer handlers must construct a fresh transform per event rather than
//! caching one: the document may be mid-scroll during a drag, and overlays
//! only stay aligned if scroll and scale are read at event time.

use crate::model::DocPoint;

/// Viewport geometry at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Viewport-space X of the document content's origin.
    pub content_x: f32,
    /// Viewport-space Y of the document content's origin.
    pub content_y: f32,
    /// Horizontal scroll offset in viewport pixels.
    pub scroll_x: f32,
    /// Vertical scroll offset in viewport pixels.
    pub scroll_y: f32,
    /// Zoom scale (1.0 = 100%).
    pub scale: f32,
}

impl ViewTransform {
    /// Create a transform from content origin, scroll offset, and scale.
    pub fn new(content_origin: (f32, f32), scroll: (f32, f32), scale: f32) -> Self {
        Self {
            content_x: content_origin.0,
            content_y: content_origin.1,
            scroll_x: scroll.0,
            scroll_y: scroll.1,
            scale,
        }
    }

    /// Identity transform (scale 1, no scroll, content at viewport origin).
    pub fn identity() -> Self {
        Self::new((0.0, 0.0), (0.0, 0.0), 1.0)
    }

    /// Convert a viewport-space pointer position to document space.
    pub fn to_document(&self, viewport_x: f32, viewport_y: f32) -> DocPoint {
        DocPoint::new(
            (viewport_x - self.content_x + self.scroll_x) / self.scale,
            (viewport_y - self.content_y + self.scroll_y) / self.scale,
        )
    }

    /// Convert a document-space point to viewport space.
    pub fn to_viewport(&self, point: DocPoint) -> (f32, f32) {
        (
            point.x * self.scale + self.content_x - self.scroll_x,
            point.y * self.scale + self.content_y - self.scroll_y,
        )
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_is_passthrough() {
        let t = ViewTransform::identity();
        let p = t.to_document(42.0, 17.0);
        assert_eq!(p, DocPoint::new(42.0, 17.0));
        assert_eq!(t.to_viewport(p), (42.0, 17.0));
    }

    #[test]
    fn test_scroll_shifts_document_point() {
        let t = ViewTransform::new((0.0, 0.0), (100.0, 50.0), 1.0);
        let p = t.to_document(10.0, 10.0);
        assert!(approx_eq(p.x, 110.0));
        assert!(approx_eq(p.y, 60.0));
    }

    #[test]
    fn test_content_origin_offsets_viewport() {
        // Content centered with 40px of padding: pointer at the content
        // origin is document (0, 0).
        let t = ViewTransform::new((40.0, 40.0), (0.0, 0.0), 2.0);
        let p = t.to_document(40.0, 40.0);
        assert!(approx_eq(p.x, 0.0));
        assert!(approx_eq(p.y, 0.0));
    }

    #[test]
    fn test_scale_divides_into_document_units() {
        let t = ViewTransform::new((0.0, 0.0), (0.0, 0.0), 2.0);
        let p = t.to_document(100.0, 200.0);
        assert!(approx_eq(p.x, 50.0));
        assert!(approx_eq(p.y, 100.0));
    }

    #[test]
    fn test_round_trip_across_scales() {
        let point = DocPoint::new(123.25, 456.75);
        let mut scale = 0.5;
        while scale <= 3.0 {
            for scroll in [(0.0, 0.0), (250.0, -40.0), (-13.5, 999.0)] {
                let t = ViewTransform::new((24.0, 16.0), scroll, scale);
                let (vx, vy) = t.to_viewport(point);
                let back = t.to_document(vx, vy);
                assert!(approx_eq(back.x, point.x), "x at scale {scale}");
                assert!(approx_eq(back.y, point.y), "y at scale {scale}");
            }
            scale += 0.25;
        }
    }
}
