//! Session workflow orchestration.
//!
//! Sequences the overall flow - select a carrier, load a document, annotate
//! fields, submit for training - over the three external services, and owns
//! the workflow state the host's screens hang off. Annotation itself happens
//! through the embedded [`AnnotationEngine`].

use thiserror::Error;

use crate::engine::{AnnotationEngine, RecoveredSession};
use crate::services::{
    CarrierDirectory, CarrierSummary, SampleStore, ServiceError, StoredDocument, TrainingInvocation,
    TrainingOutcome, TrainingRequest,
};

/// Where the session is in the overall workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    /// Picking (or creating) the carrier the document belongs to.
    #[default]
    SelectingCarrier,
    /// A document is uploaded and ready to annotate.
    DocumentLoaded,
    /// The user is labeling fields.
    Annotating,
    /// A training submission is in flight.
    Submitting,
    /// Training accepted the submission.
    Complete,
}

/// Errors raised by workflow operations.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// No carrier selected yet
    #[error("Select a carrier before loading a document")]
    MissingCarrier,

    /// No document loaded yet
    #[error("Load a document before submitting")]
    MissingDocument,

    /// The operation is not valid in the current workflow state
    #[error("Not available while {state:?}")]
    WrongState {
        /// The state the session is in
        state: WorkflowState,
    },

    /// Too few completed field types to train on; checked locally before
    /// any network call
    #[error("Only {completed} field types completed; at least {required} are needed")]
    NotEnoughCompleted {
        /// Field types currently completed
        completed: usize,
        /// The configured minimum
        required: usize,
    },

    /// An external service failed; the session stays usable for retry
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// The three external collaborators, as trait objects so hosts and tests
/// can supply their own transports.
pub struct ExternalServices {
    pub directory: Box<dyn CarrierDirectory>,
    pub samples: Box<dyn SampleStore>,
    pub training: Box<dyn TrainingInvocation>,
}

/// Drives one annotation session from carrier selection to submission.
pub struct SessionOrchestrator {
    services: ExternalServices,
    engine: AnnotationEngine,
    state: WorkflowState,
    carrier: Option<CarrierSummary>,
    document: Option<StoredDocument>,
    last_outcome: Option<TrainingOutcome>,
}

impl SessionOrchestrator {
    /// Create an orchestrator around an engine and its services.
    pub fn new(services: ExternalServices, engine: AnnotationEngine) -> Self {
        Self {
            services,
            engine,
            state: WorkflowState::SelectingCarrier,
            carrier: None,
            document: None,
            last_outcome: None,
        }
    }

    // ========================================================================
    // Carrier selection
    // ========================================================================

    /// List carriers from the directory, optionally filtered by name.
    pub fn list_carriers(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<CarrierSummary>, ServiceError> {
        self.services.directory.list_carriers(filter)
    }

    /// Create a carrier and select it.
    pub fn create_carrier(
        &mut self,
        name: &str,
        category: &str,
    ) -> Result<CarrierSummary, ServiceError> {
        let created = self.services.directory.create_carrier(name, category)?;
        let carrier = CarrierSummary {
            id: created.id,
            name: name.to_string(),
        };
        log::info!("Created carrier '{}' ({})", carrier.name, carrier.id);
        self.carrier = Some(carrier.clone());
        Ok(carrier)
    }

    /// Select an existing carrier for the session.
    pub fn select_carrier(&mut self, carrier: CarrierSummary) {
        log::debug!("Selected carrier '{}' ({})", carrier.name, carrier.id);
        self.carrier = Some(carrier);
    }

    // ========================================================================
    // Document lifecycle
    // ========================================================================

    /// Upload a document and start a fresh annotation session over it.
    pub fn load_document(
        &mut self,
        file_bytes: &[u8],
        file_name: &str,
    ) -> Result<&StoredDocument, SubmitError> {
        let carrier = self.carrier.as_ref().ok_or(SubmitError::MissingCarrier)?;
        let stored = self
            .services
            .samples
            .upload_document(&carrier.id, file_bytes, file_name)?;
        log::info!(
            "Uploaded '{file_name}' ({} bytes) as {}",
            file_bytes.len(),
            stored.document_id
        );

        let carrier_id = carrier.id.clone();
        self.engine.reset();
        self.engine
            .set_session_meta(Some(carrier_id), Some(file_name.to_string()));
        self.last_outcome = None;
        self.state = WorkflowState::DocumentLoaded;
        Ok(self.document.insert(stored))
    }

    /// Enter the annotation phase (the host opened the annotation screen).
    pub fn start_annotating(&mut self) -> bool {
        match self.state {
            WorkflowState::DocumentLoaded | WorkflowState::Annotating => {
                self.state = WorkflowState::Annotating;
                true
            }
            state => {
                log::warn!("Cannot annotate while {state:?}");
                false
            }
        }
    }

    /// Re-open a previously uploaded document by id, e.g. after recovering
    /// a session on a fresh load. When the current session holds no
    /// annotations and the sample store returned some with the document,
    /// they are adopted.
    pub fn reopen_document(
        &mut self,
        document_id: &str,
    ) -> Result<&StoredDocument, SubmitError> {
        let fetched = self.services.samples.fetch_document(document_id)?;
        if self.engine.store().is_empty() {
            if let Some(annotations) = fetched.annotations {
                log::info!(
                    "Adopting {} previously stored annotations for {document_id}",
                    annotations.len()
                );
                self.engine.adopt_annotations(annotations);
            }
        }
        if self.state == WorkflowState::SelectingCarrier {
            self.state = WorkflowState::DocumentLoaded;
        }
        self.last_outcome = None;
        Ok(self.document.insert(StoredDocument {
            document_id: document_id.to_string(),
            url: fetched.url,
        }))
    }

    /// Recover an unexpired autosaved session. The host must re-associate
    /// the document file itself (see [`Self::reopen_document`]);
    /// annotations, step pointer, and carrier reference come back from the
    /// cache.
    pub fn recover_session(&mut self) -> Option<RecoveredSession> {
        let recovered = self.engine.restore_cached_session()?;
        self.state = WorkflowState::Annotating;
        self.document = None;
        self.last_outcome = None;
        Some(recovered)
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit the current annotations for training.
    ///
    /// Preconditions are checked locally before any network call: the
    /// session must be annotating a loaded document, and at least the
    /// configured minimum of field types must be completed. On service
    /// failure the session stays in `Annotating` so the user can retry
    /// without losing anything.
    pub fn submit_for_training(&mut self) -> Result<TrainingOutcome, SubmitError> {
        match self.state {
            WorkflowState::DocumentLoaded | WorkflowState::Annotating => {}
            state => return Err(SubmitError::WrongState { state }),
        }
        let carrier = self.carrier.as_ref().ok_or(SubmitError::MissingCarrier)?;
        let document = self.document.as_ref().ok_or(SubmitError::MissingDocument)?;

        let completed = self.engine.store().completed_count();
        let required = self.engine.config().min_completed_for_training;
        if completed < required {
            log::warn!("Submission rejected: {completed}/{required} field types completed");
            return Err(SubmitError::NotEnoughCompleted {
                completed,
                required,
            });
        }

        let request = TrainingRequest {
            carrier_id: carrier.id.clone(),
            document_id: document.document_id.clone(),
            annotations: self.engine.store().clone(),
        };

        self.state = WorkflowState::Submitting;
        match self.services.training.submit_training(&request) {
            Ok(outcome) => {
                log::info!(
                    "Training accepted: confidence {:.2}, {} fields extracted",
                    outcome.confidence,
                    outcome.extracted_field_count
                );
                self.state = WorkflowState::Complete;
                self.last_outcome = Some(outcome);
                self.engine.clear_cached_session();
                Ok(outcome)
            }
            Err(err) => {
                log::warn!("Training submission failed: {err}");
                self.state = WorkflowState::Annotating;
                Err(err.into())
            }
        }
    }

    /// Abandon the session and return to carrier selection.
    pub fn reset_session(&mut self) {
        self.engine.reset();
        self.state = WorkflowState::SelectingCarrier;
        self.carrier = None;
        self.document = None;
        self.last_outcome = None;
        log::debug!("Session reset");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The embedded engine, for status queries.
    pub fn engine(&self) -> &AnnotationEngine {
        &self.engine
    }

    /// The embedded engine; pointer events and commands go through here.
    pub fn engine_mut(&mut self) -> &mut AnnotationEngine {
        &mut self.engine
    }

    /// Current workflow state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// The selected carrier, if any.
    pub fn carrier(&self) -> Option<&CarrierSummary> {
        self.carrier.as_ref()
    }

    /// The loaded document, if any.
    pub fn document(&self) -> Option<&StoredDocument> {
        self.document.as_ref()
    }

    /// Outcome of the last successful submission.
    pub fn last_outcome(&self) -> Option<TrainingOutcome> {
        self.last_outcome
    }
}
