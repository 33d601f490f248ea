//! The annotation engine façade.
//!
//! Ties the store, history, validation, interaction machine, and autosave
//! channel together behind the surface the host UI drives: pointer events in
//! viewport space, discrete commands, and status queries. All mutation flows
//! through here so that every committed action - and nothing else - produces
//! exactly one history entry and one autosave arm.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::autosave::{AutosaveChannel, AutosaveStatus};
use crate::cache::{CachedSession, SessionCache};
use crate::config::EngineConfig;
use crate::constants::CACHE_FORMAT_VERSION;
use crate::history::History;
use crate::interaction::InteractionState;
use crate::model::{Annotation, AnnotationId, DocPoint, DocRect, FieldTypeRegistry, FieldTypeSpec};
use crate::store::{AnnotationStore, StepStatus, StoreRejection};
use crate::transform::ViewTransform;
use crate::validation::{ValidationReport, validate};

/// Errors raised by engine entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The field type id is not in the registry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),

    /// The sub-type does not belong to the field type
    #[error("Unknown sub-type '{sub_type}' for field type '{field}'")]
    UnknownSubType {
        /// Field type addressed
        field: String,
        /// The unrecognized sub-type
        sub_type: String,
    },
}

/// What happened when a pointer-up tried to commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitResult {
    /// The annotation was written, with its validation report attached.
    /// Diagnostics never block the write.
    Committed {
        /// Field type written to.
        field_type_id: String,
        /// Position within the field entry.
        index: usize,
        /// Content diagnostics for the host to surface.
        report: ValidationReport,
    },
    /// The drag was too small and was silently dropped.
    Discarded,
    /// The store refused the write (capacity); surfaced as a warning.
    Rejected(StoreRejection),
    /// There was no interaction in progress.
    Idle,
}

/// Per-field and overall completion, for the host's step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Field types with at least one annotation.
    pub completed: usize,
    /// All registered field types.
    pub total: usize,
    /// Required field types completed.
    pub required_completed: usize,
    /// Required field types overall.
    pub required_total: usize,
}

/// Session identity recovered from the autosave cache.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredSession {
    /// Carrier the document belonged to.
    pub carrier_ref: Option<String>,
    /// Display name of the document; the host re-associates the file.
    pub document_name: Option<String>,
    /// When the recovered state was saved.
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

/// The field a newly drawn rectangle will label.
#[derive(Debug, Clone)]
struct PendingField {
    field_type_id: String,
    sub_type: Option<String>,
}

/// Central coordinator for one annotation session.
pub struct AnnotationEngine {
    registry: FieldTypeRegistry,
    config: EngineConfig,
    store: AnnotationStore,
    history: History,
    interaction: InteractionState,
    pending: Option<PendingField>,
    active_step: usize,
    current_page: u32,
    /// Content diagnostics per stored annotation; absent means clean.
    diagnostics: BTreeMap<AnnotationId, Vec<String>>,
    autosave: AutosaveChannel,
    carrier_ref: Option<String>,
    document_name: Option<String>,
}

impl AnnotationEngine {
    /// Create an engine over a field type table and a durable cache.
    pub fn new(
        registry: FieldTypeRegistry,
        config: EngineConfig,
        cache: Box<dyn SessionCache>,
    ) -> Self {
        let store = AnnotationStore::new();
        let history = History::with_depth(store.snapshot(), config.history_depth);
        let autosave = AutosaveChannel::new(
            cache,
            config.session_cache_key.clone(),
            config.debounce(),
        );
        Self {
            registry,
            config,
            store,
            history,
            interaction: InteractionState::Idle,
            pending: None,
            active_step: 0,
            current_page: 0,
            diagnostics: BTreeMap::new(),
            autosave,
            carrier_ref: None,
            document_name: None,
        }
    }

    // ========================================================================
    // Session identity
    // ========================================================================

    /// Record which carrier/document this session annotates; persisted with
    /// every autosave.
    pub fn set_session_meta(
        &mut self,
        carrier_ref: Option<String>,
        document_name: Option<String>,
    ) {
        self.carrier_ref = carrier_ref;
        self.document_name = document_name;
    }

    /// Page the user is currently annotating; new rectangles land here.
    pub fn set_page(&mut self, page: u32) {
        self.current_page = page;
    }

    // ========================================================================
    // Pointer lifecycle
    // ========================================================================

    /// Arm the engine to draw a rectangle for a field type. The next
    /// pointer-down inside the document area starts the drag. Cancels any
    /// interaction already in progress.
    pub fn start_annotation(
        &mut self,
        field_type_id: &str,
        sub_type: Option<&str>,
    ) -> Result<(), EngineError> {
        let spec = self
            .registry
            .get(field_type_id)
            .ok_or_else(|| EngineError::UnknownFieldType(field_type_id.to_string()))?;
        if let Some(sub) = sub_type {
            if !spec.has_sub_type(sub) {
                return Err(EngineError::UnknownSubType {
                    field: field_type_id.to_string(),
                    sub_type: sub.to_string(),
                });
            }
        }
        self.interaction.cancel();
        if let Some(step) = self.registry.index_of(field_type_id) {
            self.active_step = step;
        }
        self.pending = Some(PendingField {
            field_type_id: field_type_id.to_string(),
            sub_type: sub_type.map(str::to_string),
        });
        log::debug!("Armed annotation for '{field_type_id}' (sub-type {sub_type:?})");
        Ok(())
    }

    /// Pointer pressed inside the document area.
    ///
    /// Starts a draw when a field type is armed, otherwise starts a move if
    /// the point hits an existing annotation. The transform must be built
    /// fresh from the viewport's current scroll and scale.
    pub fn pointer_down(&mut self, viewport: (f32, f32), view: &ViewTransform) {
        if !self.interaction.is_idle() {
            // A missed pointer-up left a stale drag; drop it rather than
            // compounding.
            log::warn!("Pointer-down during an active interaction; cancelling the old one");
            self.interaction.cancel();
        }
        let point = view.to_document(viewport.0, viewport.1);

        if let Some(pending) = &self.pending {
            self.interaction = InteractionState::begin_drawing(
                pending.field_type_id.clone(),
                pending.sub_type.clone(),
                point,
            );
            log::debug!(
                "Drawing started for '{}' at ({:.1}, {:.1})",
                pending.field_type_id,
                point.x,
                point.y
            );
            return;
        }

        let hit = self
            .store
            .hit_test(point)
            .map(|(field, index)| (field.to_string(), index));
        if let Some((field, index)) = hit {
            if let Some(original) = self.store.get(&field, index).cloned() {
                log::debug!("Move started on '{field}'[{index}]");
                self.interaction = InteractionState::begin_moving(field, index, original, point);
            }
        }
    }

    /// Pointer moved. While moving an annotation this must be fed from
    /// document-wide tracking, not just events inside the viewport.
    pub fn pointer_move(&mut self, viewport: (f32, f32), view: &ViewTransform) {
        if self.interaction.is_idle() {
            return;
        }
        let point = view.to_document(viewport.0, viewport.1);
        self.interaction.pointer_moved(point);
    }

    /// Pointer released: commit the interaction.
    ///
    /// `extracted_text` is whatever the viewer read from the final region,
    /// if anything; it feeds content validation.
    pub fn pointer_up(
        &mut self,
        viewport: (f32, f32),
        view: &ViewTransform,
        extracted_text: Option<String>,
    ) -> CommitResult {
        let point = view.to_document(viewport.0, viewport.1);
        match self.interaction.cancel() {
            InteractionState::Idle => CommitResult::Idle,
            InteractionState::Drawing {
                field_type_id,
                sub_type,
                start,
                ..
            } => self.commit_drawing(field_type_id, sub_type, start, point, extracted_text),
            InteractionState::Moving {
                field_type_id,
                index,
                original,
                grab_offset,
                ..
            } => self.commit_move(field_type_id, index, original, grab_offset, point, extracted_text),
        }
    }

    /// Escape: discard the in-progress rectangle or move without touching
    /// the store. The armed field type stays armed.
    pub fn cancel(&mut self) {
        if !self.interaction.is_idle() {
            self.interaction.cancel();
            log::debug!("Interaction cancelled");
        }
    }

    /// Disarm drawing; pointer-downs go back to hit-testing for moves.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    fn commit_drawing(
        &mut self,
        field_type_id: String,
        sub_type: Option<String>,
        start: DocPoint,
        end: DocPoint,
        extracted_text: Option<String>,
    ) -> CommitResult {
        let rect = DocRect::from_corners(start, end);
        if !rect.exceeds(self.config.min_commit_size) {
            log::debug!(
                "Discarded degenerate drag for '{field_type_id}' ({:.1} x {:.1})",
                rect.width,
                rect.height
            );
            return CommitResult::Discarded;
        }
        let Some(spec) = self.registry.get(&field_type_id).cloned() else {
            log::warn!("Field type '{field_type_id}' vanished mid-drag");
            return CommitResult::Discarded;
        };

        let id = self.store.allocate_id();
        let mut annotation = Annotation::new(id, &field_type_id, self.current_page, rect);
        annotation.sub_type = sub_type;
        annotation.extracted_text = extracted_text;

        let report = validate(&spec, &annotation);
        match self.store.upsert(&spec, annotation) {
            Ok(outcome) => {
                let index = outcome.index();
                log::info!(
                    "Committed '{field_type_id}'[{index}] ({:.0} x {:.0}), {} diagnostics",
                    rect.width,
                    rect.height,
                    report.errors.len()
                );
                self.record_commit(id, &report);
                if !spec.allow_multiple {
                    self.pending = None;
                    self.advance_step();
                }
                CommitResult::Committed {
                    field_type_id,
                    index,
                    report,
                }
            }
            Err(rejection) => {
                log::warn!("Write rejected: {rejection}");
                CommitResult::Rejected(rejection)
            }
        }
    }

    fn commit_move(
        &mut self,
        field_type_id: String,
        index: usize,
        original: Annotation,
        grab_offset: (f32, f32),
        end: DocPoint,
        extracted_text: Option<String>,
    ) -> CommitResult {
        let Some(spec) = self.registry.get(&field_type_id).cloned() else {
            log::warn!("Field type '{field_type_id}' vanished mid-drag");
            return CommitResult::Discarded;
        };

        let mut moved = original;
        moved.rect = moved
            .rect
            .at(end.x - grab_offset.0, end.y - grab_offset.1);
        if extracted_text.is_some() {
            moved.extracted_text = extracted_text;
        }
        let id = moved.id;

        let report = validate(&spec, &moved);
        match self.store.replace_at(&field_type_id, index, moved) {
            Ok(_) => {
                log::info!("Moved '{field_type_id}'[{index}]");
                self.record_commit(id, &report);
                CommitResult::Committed {
                    field_type_id,
                    index,
                    report,
                }
            }
            Err(rejection) => {
                log::warn!("Move commit rejected: {rejection}");
                CommitResult::Rejected(rejection)
            }
        }
    }

    /// Shared tail of every committed mutation: diagnostics, one history
    /// entry, one autosave arm.
    fn record_commit(&mut self, id: AnnotationId, report: &ValidationReport) {
        if report.valid() {
            self.diagnostics.remove(&id);
        } else {
            self.diagnostics.insert(id, report.errors.clone());
        }
        self.history.push(self.store.snapshot());
        self.autosave.mark_dirty();
    }

    /// Advance the active step to the next incomplete field type, wrapping
    /// past the end. Stays put when everything is complete.
    fn advance_step(&mut self) {
        let total = self.registry.len();
        for offset in 1..=total {
            let step = (self.active_step + offset) % total;
            let Some(spec) = self.registry.at(step) else {
                continue;
            };
            if self.store.status_of(&spec.id) == StepStatus::Pending {
                self.active_step = step;
                log::debug!("Advanced to step {} ('{}')", step, spec.id);
                return;
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Remove one annotation (scalar fields ignore the index). Pushes
    /// history like any other committed mutation.
    pub fn remove_annotation(
        &mut self,
        field_type_id: &str,
        index: Option<usize>,
    ) -> Option<Annotation> {
        let removed = self.store.remove(field_type_id, index)?;
        log::info!("Removed annotation {} from '{field_type_id}'", removed.id);
        self.diagnostics.remove(&removed.id);
        self.history.push(self.store.snapshot());
        self.autosave.mark_dirty();
        Some(removed)
    }

    /// Step back one committed action. Returns false at the boundary.
    pub fn undo(&mut self) -> bool {
        self.interaction.cancel();
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.store.restore(snapshot);
        self.autosave.mark_dirty();
        self.revalidate_all();
        true
    }

    /// Step forward one undone action. Returns false at the boundary.
    pub fn redo(&mut self) -> bool {
        self.interaction.cancel();
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.store.restore(snapshot);
        self.autosave.mark_dirty();
        self.revalidate_all();
        true
    }

    /// Re-run validation over everything stored; returns the total number
    /// of diagnostics.
    pub fn validate_all(&mut self) -> usize {
        self.revalidate_all();
        self.diagnostics.values().map(Vec::len).sum()
    }

    fn revalidate_all(&mut self) {
        self.diagnostics.clear();
        for spec in self.registry.iter() {
            for annotation in self.store.annotations_for(&spec.id) {
                let report = validate(spec, annotation);
                if !report.valid() {
                    self.diagnostics.insert(annotation.id, report.errors);
                }
            }
        }
    }

    // ========================================================================
    // Autosave
    // ========================================================================

    /// Drive the debounce from the host's event-loop tick. Returns true if
    /// a write was attempted.
    pub fn poll_autosave(&mut self) -> bool {
        let (store, step, ttl) = (&self.store, self.active_step, self.config.session_ttl());
        let (carrier, document) = (&self.carrier_ref, &self.document_name);
        self.autosave
            .poll(|| build_record(store, step, carrier, document, ttl))
    }

    /// Save immediately, bypassing the debounce.
    pub fn save_now(&mut self) -> bool {
        let (store, step, ttl) = (&self.store, self.active_step, self.config.session_ttl());
        let (carrier, document) = (&self.carrier_ref, &self.document_name);
        self.autosave
            .flush(|| build_record(store, step, carrier, document, ttl))
    }

    /// Current autosave status for UI feedback.
    pub fn autosave_status(&self) -> AutosaveStatus {
        self.autosave.status()
    }

    /// Restore a cached session, if one exists and is unexpired. Replaces
    /// all current state and reseeds history.
    pub fn restore_cached_session(&mut self) -> Option<RecoveredSession> {
        let record = self.autosave.load()?;
        log::info!(
            "Recovered session saved at {} ({} annotations)",
            record.saved_at,
            record.annotations.len()
        );
        self.store.restore(record.annotations);
        self.active_step = record.active_step_index.min(self.registry.len().saturating_sub(1));
        self.carrier_ref = record.carrier_ref.clone();
        self.document_name = record.document_name.clone();
        self.history.reset(self.store.snapshot());
        self.interaction = InteractionState::Idle;
        self.pending = None;
        self.revalidate_all();
        Some(RecoveredSession {
            carrier_ref: record.carrier_ref,
            document_name: record.document_name,
            saved_at: record.saved_at,
        })
    }

    /// Replace the store with annotations fetched from elsewhere (a
    /// re-opened document). Reseeds history so the adoption is the new
    /// undo floor.
    pub fn adopt_annotations(&mut self, store: AnnotationStore) {
        self.store = store;
        self.history.reset(self.store.snapshot());
        self.interaction = InteractionState::Idle;
        self.revalidate_all();
        self.autosave.mark_dirty();
    }

    /// Drop the cached session record without touching in-memory state.
    /// Used once a submission succeeds and recovery is moot.
    pub fn clear_cached_session(&mut self) {
        self.autosave.clear();
    }

    /// Discard everything: annotations, history, diagnostics, cached
    /// session. Used when a session is submitted or abandoned.
    pub fn reset(&mut self) {
        self.store = AnnotationStore::new();
        self.history.reset(self.store.snapshot());
        self.diagnostics.clear();
        self.interaction = InteractionState::Idle;
        self.pending = None;
        self.active_step = 0;
        self.current_page = 0;
        self.carrier_ref = None;
        self.document_name = None;
        self.autosave.clear();
        log::debug!("Engine reset");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The field type table.
    pub fn registry(&self) -> &FieldTypeRegistry {
        &self.registry
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live store (read-only; mutation goes through the engine).
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// The live interaction state.
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// The in-progress rectangle for the host's preview overlay.
    pub fn preview(&self) -> Option<DocRect> {
        self.interaction.preview()
    }

    /// Completion status of one field type step.
    pub fn step_status(&self, field_type_id: &str) -> StepStatus {
        self.store.status_of(field_type_id)
    }

    /// Annotations stored for one field type.
    pub fn annotations_for(&self, field_type_id: &str) -> &[Annotation] {
        self.store.annotations_for(field_type_id)
    }

    /// Diagnostics attached to one annotation, empty when clean.
    pub fn diagnostics_for(&self, id: AnnotationId) -> &[String] {
        self.diagnostics.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the active step in registry order.
    pub fn active_step(&self) -> usize {
        self.active_step
    }

    /// Spec of the active step.
    pub fn active_field_type(&self) -> Option<&FieldTypeSpec> {
        self.registry.at(self.active_step)
    }

    /// Completion counts for the step list.
    pub fn progress(&self) -> Progress {
        let mut progress = Progress {
            completed: 0,
            total: self.registry.len(),
            required_completed: 0,
            required_total: 0,
        };
        for spec in self.registry.iter() {
            let done = self.store.status_of(&spec.id) == StepStatus::Completed;
            if done {
                progress.completed += 1;
            }
            if spec.required {
                progress.required_total += 1;
                if done {
                    progress.required_completed += 1;
                }
            }
        }
        progress
    }

    /// Whether undo is currently possible.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo is currently possible.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

/// Build the durable record from the session as it is *right now*.
fn build_record(
    store: &AnnotationStore,
    active_step: usize,
    carrier_ref: &Option<String>,
    document_name: &Option<String>,
    ttl: chrono::Duration,
) -> CachedSession {
    let now = chrono::Utc::now();
    CachedSession {
        version: CACHE_FORMAT_VERSION,
        annotations: store.clone(),
        carrier_ref: carrier_ref.clone(),
        document_name: document_name.clone(),
        active_step_index: active_step,
        saved_at: now,
        expires_at: now + ttl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySessionCache;
    use crate::model::default_invoice_fields;

    fn engine() -> AnnotationEngine {
        AnnotationEngine::new(
            default_invoice_fields(),
            EngineConfig::default(),
            Box::new(MemorySessionCache::new()),
        )
    }

    fn draw(
        engine: &mut AnnotationEngine,
        field: &str,
        from: (f32, f32),
        to: (f32, f32),
        text: Option<&str>,
    ) -> CommitResult {
        let view = ViewTransform::identity();
        engine.start_annotation(field, None).unwrap();
        engine.pointer_down(from, &view);
        engine.pointer_move(to, &view);
        engine.pointer_up(to, &view, text.map(str::to_string))
    }

    #[test]
    fn test_draw_commits_annotation() {
        let mut engine = engine();
        let result = draw(
            &mut engine,
            "total",
            (10.0, 10.0),
            (60.0, 30.0),
            Some("$42.00"),
        );
        let CommitResult::Committed { field_type_id, index, report } = result else {
            panic!("expected a commit, got {result:?}");
        };
        assert_eq!(field_type_id, "total");
        assert_eq!(index, 0);
        assert!(report.valid());
        assert_eq!(engine.step_status("total"), StepStatus::Completed);
        assert!(engine.can_undo());
    }

    #[test]
    fn test_small_drag_discarded() {
        let mut engine = engine();
        let result = draw(&mut engine, "total", (10.0, 10.0), (19.0, 19.0), None);
        assert_eq!(result, CommitResult::Discarded);
        assert!(engine.store().is_empty());
        assert!(!engine.can_undo());
        assert!(engine.interaction().is_idle());
    }

    #[test]
    fn test_zoomed_drag_lands_in_document_space() {
        let mut engine = engine();
        let view = ViewTransform::new((0.0, 0.0), (100.0, 0.0), 2.0);
        engine.start_annotation("vendor_name", None).unwrap();
        engine.pointer_down((0.0, 0.0), &view);
        engine.pointer_up((100.0, 40.0), &view, None);

        let stored = &engine.annotations_for("vendor_name")[0];
        assert_eq!(stored.rect.x, 50.0); // (0 + 100) / 2
        assert_eq!(stored.rect.width, 50.0);
        assert_eq!(stored.rect.height, 20.0);
    }

    #[test]
    fn test_single_valued_commit_advances_step() {
        let mut engine = engine();
        assert_eq!(engine.active_step(), 0); // invoice_number
        draw(&mut engine, "invoice_number", (0.0, 0.0), (40.0, 20.0), None);
        // invoice_date is the next incomplete step.
        assert_eq!(engine.active_field_type().unwrap().id, "invoice_date");
    }

    #[test]
    fn test_capacity_rejection_is_nonfatal() {
        let mut engine = engine();
        for i in 0..3 {
            let x = i as f32 * 100.0;
            let result = draw(&mut engine, "total", (x, 0.0), (x + 50.0, 20.0), None);
            assert!(matches!(result, CommitResult::Committed { .. }));
        }
        let result = draw(&mut engine, "total", (500.0, 0.0), (560.0, 20.0), None);
        assert!(matches!(result, CommitResult::Rejected(_)));
        assert_eq!(engine.annotations_for("total").len(), 3);
        // The engine is still usable.
        assert!(engine.interaction().is_idle());
        let result = draw(&mut engine, "vendor_name", (0.0, 50.0), (80.0, 70.0), None);
        assert!(matches!(result, CommitResult::Committed { .. }));
    }

    #[test]
    fn test_move_and_cancel_leaves_store_unchanged() {
        let mut engine = engine();
        draw(&mut engine, "total", (10.0, 10.0), (60.0, 30.0), None);
        engine.clear_pending(); // Leave draw mode so pointer-down hit-tests
        let before = engine.store().clone();

        let view = ViewTransform::identity();
        engine.pointer_down((20.0, 20.0), &view); // Inside the stored rect
        assert!(engine.interaction().is_moving());
        engine.pointer_move((300.0, 300.0), &view);
        engine.cancel();

        assert!(engine.interaction().is_idle());
        assert_eq!(engine.store(), &before);
    }

    #[test]
    fn test_move_commits_new_position() {
        let mut engine = engine();
        draw(&mut engine, "total", (10.0, 10.0), (60.0, 30.0), None);
        engine.clear_pending();
        let view = ViewTransform::identity();
        engine.pointer_down((20.0, 20.0), &view);
        engine.pointer_move((120.0, 220.0), &view);
        let result = engine.pointer_up((120.0, 220.0), &view, None);

        assert!(matches!(result, CommitResult::Committed { .. }));
        let rect = engine.annotations_for("total")[0].rect;
        // Grabbed 10 units into the rect; origin follows the grab offset.
        assert_eq!(rect.x, 110.0);
        assert_eq!(rect.y, 210.0);
        assert_eq!(rect.width, 50.0);
        assert_eq!(rect.height, 20.0);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut engine = engine();
        draw(&mut engine, "total", (10.0, 10.0), (60.0, 30.0), None);
        let one = engine.store().clone();
        draw(&mut engine, "total", (100.0, 10.0), (160.0, 30.0), None);
        let two = engine.store().clone();

        assert!(engine.undo());
        assert_eq!(engine.store(), &one);
        assert!(engine.redo());
        assert_eq!(engine.store(), &two);
        assert!(!engine.redo());
    }

    #[test]
    fn test_remove_annotation_pushes_history() {
        let mut engine = engine();
        draw(&mut engine, "vendor_name", (0.0, 0.0), (80.0, 20.0), None);
        let removed = engine.remove_annotation("vendor_name", None);
        assert!(removed.is_some());
        assert_eq!(engine.step_status("vendor_name"), StepStatus::Pending);

        assert!(engine.undo());
        assert_eq!(engine.step_status("vendor_name"), StepStatus::Completed);
    }

    #[test]
    fn test_validate_all_counts_diagnostics() {
        let mut engine = engine();
        draw(&mut engine, "total", (0.0, 0.0), (40.0, 20.0), Some("N/A"));
        assert_eq!(engine.validate_all(), 1);
        let id = engine.annotations_for("total")[0].id;
        assert!(engine.diagnostics_for(id)[0].contains("expected format"));

        draw(&mut engine, "total", (100.0, 0.0), (140.0, 20.0), Some("$5.00"));
        assert_eq!(engine.validate_all(), 1);
    }

    #[test]
    fn test_autosave_fires_and_recovers() {
        let mut engine = AnnotationEngine::new(
            default_invoice_fields(),
            EngineConfig {
                autosave_debounce_ms: 0,
                ..EngineConfig::default()
            },
            Box::new(MemorySessionCache::new()),
        );
        engine.set_session_meta(Some("carrier-9".into()), Some("inv.pdf".into()));
        draw(&mut engine, "total", (10.0, 10.0), (60.0, 30.0), None);
        assert!(engine.poll_autosave());
        assert_eq!(engine.autosave_status(), AutosaveStatus::Saved);

        let stored = engine.store().clone();
        // Simulate a reload: wipe in-memory state, then recover.
        engine.store = AnnotationStore::new();
        engine.history.reset(engine.store.snapshot());
        let recovered = engine.restore_cached_session().expect("cached session");
        assert_eq!(recovered.carrier_ref.as_deref(), Some("carrier-9"));
        assert_eq!(engine.store(), &stored);
    }

    #[test]
    fn test_escape_cancels_drawing_without_commit() {
        let mut engine = engine();
        let view = ViewTransform::identity();
        engine.start_annotation("total", None).unwrap();
        engine.pointer_down((10.0, 10.0), &view);
        engine.pointer_move((200.0, 200.0), &view);
        engine.cancel();
        let result = engine.pointer_up((200.0, 200.0), &view, None);
        assert_eq!(result, CommitResult::Idle);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let mut engine = engine();
        assert_eq!(
            engine.start_annotation("bogus", None),
            Err(EngineError::UnknownFieldType("bogus".into()))
        );
        assert_eq!(
            engine.start_annotation("charges", Some("color")),
            Err(EngineError::UnknownSubType {
                field: "charges".into(),
                sub_type: "color".into()
            })
        );
    }
}
