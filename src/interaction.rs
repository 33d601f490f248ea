//! Pointer interaction state machine.
//!
//! Exactly one of Idle / Drawing / Moving is active at any time; drawing and
//! moving are mutually exclusive by construction. The state is an explicit
//! value object threaded through the engine's event handlers - there is no
//! ambient drag state to fall out of sync.
//!
//! While Moving, the host must track pointer events document-wide (not just
//! inside the viewport element) and route them here: the annotated document
//! is commonly larger than the viewport and drags routinely cross its edge.
//! [`InteractionState::is_tracking_pointer`] tells the host when those
//! global listeners need to be installed; they must come down again on
//! commit, on cancel, and on teardown.

use crate::model::{Annotation, DocPoint, DocRect};

/// The live pointer interaction, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    /// No interaction in progress.
    #[default]
    Idle,
    /// A new rectangle is being dragged out.
    Drawing {
        /// Field type the rectangle will label.
        field_type_id: String,
        /// Sub-type, for decomposed field types.
        sub_type: Option<String>,
        /// Anchor captured at pointer-down, in document space.
        start: DocPoint,
        /// Live normalized rectangle between anchor and pointer.
        current: DocRect,
    },
    /// An existing annotation is being dragged to a new position.
    Moving {
        /// Field type of the annotation being moved.
        field_type_id: String,
        /// Position of the annotation within its field entry.
        index: usize,
        /// The annotation as it was before the drag, for cancel.
        original: Annotation,
        /// Document-space offset from the annotation origin to the grab
        /// point, so the rectangle doesn't jump under the cursor.
        grab_offset: (f32, f32),
        /// Live position of the annotation's origin.
        position: DocPoint,
    },
}

impl InteractionState {
    /// Begin dragging out a new rectangle.
    pub fn begin_drawing(field_type_id: String, sub_type: Option<String>, start: DocPoint) -> Self {
        InteractionState::Drawing {
            field_type_id,
            sub_type,
            start,
            current: DocRect::from_corners(start, start),
        }
    }

    /// Begin dragging an existing annotation.
    pub fn begin_moving(
        field_type_id: String,
        index: usize,
        original: Annotation,
        grab: DocPoint,
    ) -> Self {
        let grab_offset = (grab.x - original.rect.x, grab.y - original.rect.y);
        let position = DocPoint::new(original.rect.x, original.rect.y);
        InteractionState::Moving {
            field_type_id,
            index,
            original,
            grab_offset,
            position,
        }
    }

    /// Feed a pointer position (document space) into the live interaction.
    pub fn pointer_moved(&mut self, point: DocPoint) {
        match self {
            InteractionState::Idle => {}
            InteractionState::Drawing { start, current, .. } => {
                *current = DocRect::from_corners(*start, point);
            }
            InteractionState::Moving {
                grab_offset,
                position,
                ..
            } => {
                *position = DocPoint::new(point.x - grab_offset.0, point.y - grab_offset.1);
            }
        }
    }

    /// Discard the interaction without committing.
    pub fn cancel(&mut self) -> InteractionState {
        std::mem::take(self)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self, InteractionState::Drawing { .. })
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, InteractionState::Moving { .. })
    }

    /// Whether the host needs document-wide pointer tracking right now.
    pub fn is_tracking_pointer(&self) -> bool {
        !self.is_idle()
    }

    /// The in-progress rectangle, for the host's preview overlay.
    pub fn preview(&self) -> Option<DocRect> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Drawing { current, .. } => Some(*current),
            InteractionState::Moving {
                original, position, ..
            } => Some(original.rect.at(position.x, position.y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawing_normalizes_reverse_drag() {
        let mut state =
            InteractionState::begin_drawing("total".into(), None, DocPoint::new(100.0, 100.0));
        state.pointer_moved(DocPoint::new(40.0, 60.0));

        let Some(rect) = state.preview() else {
            panic!("expected a preview rect")
        };
        assert_eq!(rect.x, 40.0);
        assert_eq!(rect.y, 60.0);
        assert_eq!(rect.width, 60.0);
        assert_eq!(rect.height, 40.0);
    }

    #[test]
    fn test_moving_keeps_grab_offset() {
        let ann = Annotation::new(1, "total", 0, DocRect::new(10.0, 10.0, 40.0, 20.0));
        // Grab 5 units into the rectangle.
        let mut state =
            InteractionState::begin_moving("total".into(), 0, ann, DocPoint::new(15.0, 15.0));
        state.pointer_moved(DocPoint::new(115.0, 215.0));

        let rect = state.preview().unwrap();
        assert_eq!(rect.x, 110.0);
        assert_eq!(rect.y, 210.0);
        assert_eq!(rect.width, 40.0);
        assert_eq!(rect.height, 20.0);
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut state =
            InteractionState::begin_drawing("total".into(), None, DocPoint::new(0.0, 0.0));
        assert!(state.is_tracking_pointer());
        let taken = state.cancel();
        assert!(state.is_idle());
        assert!(taken.is_drawing());
    }

    #[test]
    fn test_states_are_mutually_exclusive() {
        let state = InteractionState::begin_drawing("total".into(), None, DocPoint::new(0.0, 0.0));
        assert!(state.is_drawing());
        assert!(!state.is_moving());
        assert!(!state.is_idle());
    }
}
