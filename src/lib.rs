//! invat - Invoice Annotation Trainer
//!
//! A headless engine for labeling regions of a rendered invoice document with
//! typed field annotations, used to build training data for a downstream
//! extraction model. Document rendering is provided by the host; this crate
//! owns the annotation editing semantics: drawing, moving, validation,
//! undo/redo, debounced autosave, and the carrier/document/training workflow.

mod autosave;
mod cache;
mod command;
mod config;
mod constants;
mod engine;
mod history;
mod interaction;
mod model;
mod services;
mod session;
mod store;
mod transform;
mod validation;

#[cfg(test)]
mod tests;

pub use autosave::{AutosaveChannel, AutosaveStatus};
#[cfg(not(target_arch = "wasm32"))]
pub use cache::FsSessionCache;
pub use cache::{CacheError, CachedSession, MemorySessionCache, SessionCache};
pub use command::{Command, Key, KeyBindings, MAX_STEP_HOTKEYS, Modifiers, dispatch};
pub use config::EngineConfig;
pub use engine::{AnnotationEngine, CommitResult, EngineError, Progress, RecoveredSession};
pub use history::History;
pub use interaction::InteractionState;
pub use model::{
    Annotation, AnnotationId, DocPoint, DocRect, FieldTypeConfig, FieldTypeError,
    FieldTypeRegistry, FieldTypeSpec, SizeConstraints, default_invoice_fields,
};
pub use services::{
    CarrierDirectory, CarrierSummary, CreatedCarrier, FetchedDocument, SampleStore, ServiceError,
    StoredDocument, TrainingInvocation, TrainingOutcome, TrainingRequest,
};
pub use session::{ExternalServices, SessionOrchestrator, SubmitError, WorkflowState};
pub use store::{AnnotationStore, FieldEntry, StepStatus, StoreRejection, WriteOutcome};
pub use transform::ViewTransform;
pub use validation::{ValidationReport, validate};
