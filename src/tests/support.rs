//! Shared fakes for scenario tests.

use std::cell::RefCell;
use std::rc::Rc;

/// Route engine logs through env_logger when a test asks for them
/// (RUST_LOG=debug cargo test -- --nocapture).
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

use crate::cache::{CacheError, CachedSession, MemorySessionCache, SessionCache};
use crate::services::{
    CarrierDirectory, CarrierSummary, CreatedCarrier, FetchedDocument, SampleStore, ServiceError,
    StoredDocument, TrainingInvocation, TrainingOutcome, TrainingRequest,
};

/// In-memory carrier directory.
pub struct FakeDirectory {
    pub carriers: Vec<CarrierSummary>,
    next_id: u32,
}

impl FakeDirectory {
    pub fn with_carriers(names: &[&str]) -> Self {
        let carriers = names
            .iter()
            .enumerate()
            .map(|(i, name)| CarrierSummary {
                id: format!("carrier-{}", i + 1),
                name: (*name).to_string(),
            })
            .collect::<Vec<_>>();
        let next_id = carriers.len() as u32 + 1;
        Self { carriers, next_id }
    }
}

impl CarrierDirectory for FakeDirectory {
    fn list_carriers(&self, filter: Option<&str>) -> Result<Vec<CarrierSummary>, ServiceError> {
        let matches = self
            .carriers
            .iter()
            .filter(|c| filter.is_none_or(|f| c.name.to_lowercase().contains(&f.to_lowercase())))
            .cloned()
            .collect();
        Ok(matches)
    }

    fn create_carrier(
        &mut self,
        name: &str,
        _category: &str,
    ) -> Result<CreatedCarrier, ServiceError> {
        let id = format!("carrier-{}", self.next_id);
        self.next_id += 1;
        self.carriers.push(CarrierSummary {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(CreatedCarrier { id })
    }
}

/// In-memory sample store that remembers uploads and can serve prior
/// annotations on fetch.
#[derive(Default)]
pub struct FakeSamples {
    pub uploads: Vec<(String, String)>,
    pub fetch_annotations: Option<crate::store::AnnotationStore>,
}

impl SampleStore for FakeSamples {
    fn upload_document(
        &mut self,
        carrier_id: &str,
        _file_bytes: &[u8],
        file_name: &str,
    ) -> Result<StoredDocument, ServiceError> {
        self.uploads.push((carrier_id.to_string(), file_name.to_string()));
        let document_id = format!("doc-{}", self.uploads.len());
        Ok(StoredDocument {
            url: format!("https://samples.test/{document_id}"),
            document_id,
        })
    }

    fn fetch_document(&self, document_id: &str) -> Result<FetchedDocument, ServiceError> {
        Ok(FetchedDocument {
            url: format!("https://samples.test/{document_id}"),
            annotations: self.fetch_annotations.clone(),
        })
    }
}

/// Training endpoint that records every request and can be told to fail.
pub struct FakeTraining {
    pub requests: Rc<RefCell<Vec<TrainingRequest>>>,
    pub fail_next: Rc<RefCell<bool>>,
}

impl FakeTraining {
    pub fn new() -> (Self, Rc<RefCell<Vec<TrainingRequest>>>, Rc<RefCell<bool>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let fail_next = Rc::new(RefCell::new(false));
        let fake = Self {
            requests: Rc::clone(&requests),
            fail_next: Rc::clone(&fail_next),
        };
        (fake, requests, fail_next)
    }
}

impl TrainingInvocation for FakeTraining {
    fn submit_training(
        &mut self,
        request: &TrainingRequest,
    ) -> Result<TrainingOutcome, ServiceError> {
        if std::mem::take(&mut *self.fail_next.borrow_mut()) {
            return Err(ServiceError::unavailable("training endpoint down"));
        }
        self.requests.borrow_mut().push(request.clone());
        Ok(TrainingOutcome {
            success: true,
            confidence: 0.93,
            extracted_field_count: request.annotations.len(),
        })
    }
}

/// A session cache that survives "reloads" by sharing its storage.
#[derive(Clone, Default)]
pub struct SharedCache(pub Rc<RefCell<MemorySessionCache>>);

impl SessionCache for SharedCache {
    fn put(&mut self, key: &str, record: &CachedSession) -> Result<(), CacheError> {
        self.0.borrow_mut().put(key, record)
    }

    fn get(&self, key: &str) -> Result<Option<CachedSession>, CacheError> {
        self.0.borrow().get(key)
    }

    fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        self.0.borrow_mut().remove(key)
    }
}
