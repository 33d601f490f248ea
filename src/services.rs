//! External service seams.
//!
//! The engine consumes three collaborators - a carrier directory, a sample
//! document store, and the training invocation endpoint - through these
//! traits. Transport is out of scope here: hosts implement the traits over
//! whatever wire they use, and tests plug in fakes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::AnnotationStore;

/// Errors surfaced by external services.
///
/// Service failure never corrupts the session: the orchestrator stays in its
/// current state so the user can retry without losing annotations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a failure
    #[error("{message}")]
    Rejected {
        /// The service's own message, surfaced to the user
        message: String,
    },

    /// Response could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ServiceError {
    /// Create a rejection with a user-facing message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// A carrier as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierSummary {
    pub id: String,
    pub name: String,
}

/// Result of creating a carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCarrier {
    pub id: String,
}

/// A document accepted by the sample store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document_id: String,
    pub url: String,
}

/// A document fetched back from the sample store, possibly with previously
/// submitted annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<AnnotationStore>,
}

/// The payload submitted for training: the full annotation store plus the
/// identities it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub carrier_id: String,
    pub document_id: String,
    pub annotations: AnnotationStore,
}

/// What the extraction model reported back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub success: bool,
    pub confidence: f32,
    pub extracted_field_count: usize,
}

/// Carrier listing and creation.
pub trait CarrierDirectory {
    /// List carriers, optionally filtered by a name substring.
    fn list_carriers(&self, filter: Option<&str>) -> Result<Vec<CarrierSummary>, ServiceError>;

    /// Create a carrier and return its id.
    fn create_carrier(&mut self, name: &str, category: &str)
    -> Result<CreatedCarrier, ServiceError>;
}

/// Document upload and retrieval.
pub trait SampleStore {
    /// Upload a document for a carrier; returns its id and a viewing URL.
    fn upload_document(
        &mut self,
        carrier_id: &str,
        file_bytes: &[u8],
        file_name: &str,
    ) -> Result<StoredDocument, ServiceError>;

    /// Fetch a previously uploaded document.
    fn fetch_document(&self, document_id: &str) -> Result<FetchedDocument, ServiceError>;
}

/// Submission of annotations for model training.
pub trait TrainingInvocation {
    /// Submit the annotated document; returns the extraction outcome.
    fn submit_training(&mut self, request: &TrainingRequest)
    -> Result<TrainingOutcome, ServiceError>;
}
