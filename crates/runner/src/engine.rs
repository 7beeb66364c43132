//! From one webhook delivery to queued hook runs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipeline::{DescriptorExtractor, EventDescriptor, EventKind, HookName};
use tracing::{debug, info};

use crate::{DispatchHandle, HookResolver, RunnerError};

/// What a delivery turned into.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// The extracted descriptor, shared with every queued run.
    pub descriptor: Arc<EventDescriptor>,
    /// Hooks queued for this delivery, in resolution order.
    pub queued: Vec<HookName>,
}

/// Entry point for deliveries: stores the payload, extracts a descriptor,
/// resolves hooks, and queues them. Never waits for a hook to run.
#[derive(Debug, Clone)]
pub struct CiEngine {
    extractor: DescriptorExtractor,
    resolver: HookResolver,
    dispatcher: DispatchHandle,
    payload_dir: PathBuf,
}

impl CiEngine {
    /// Creates an engine writing raw payloads under `payload_dir`.
    pub fn new(
        extractor: DescriptorExtractor,
        resolver: HookResolver,
        dispatcher: DispatchHandle,
        payload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            dispatcher,
            payload_dir: payload_dir.into(),
        }
    }

    /// Handles one delivery of `event_type` carrying `raw_payload`.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::PayloadStore`] if the payload cannot be written.
    /// - [`RunnerError::Pipeline`] if the payload is malformed.
    ///
    /// Unconfigured repositories and unsupported events are not errors; they
    /// yield an outcome with nothing queued.
    pub fn handle_delivery(
        &self,
        event_type: &str,
        raw_payload: &[u8],
    ) -> Result<DeliveryOutcome, RunnerError> {
        let kind = EventKind::parse(event_type);
        let payload_path = store_payload(&self.payload_dir, raw_payload)?;
        debug!(event = %kind, payload = %payload_path.display(), "stored payload");

        let descriptor = Arc::new(self.extractor.extract(&kind, raw_payload, payload_path)?);
        let scripts = self.resolver.resolve(&descriptor);
        let queued: Vec<HookName> = scripts.iter().map(|s| s.name.clone()).collect();

        let count = self.dispatcher.dispatch(Arc::clone(&descriptor), scripts);
        info!(
            event = %kind,
            repository = %format!("{}/{}", descriptor.owner, descriptor.repo),
            commit = %descriptor.commit,
            queued = count,
            "delivery handled"
        );

        Ok(DeliveryOutcome { descriptor, queued })
    }
}

/// Writes the payload to a fresh `payload-*.json` file that is kept on disk;
/// hooks receive its path as their first argument.
fn store_payload(dir: &Path, raw_payload: &[u8]) -> Result<PathBuf, RunnerError> {
    let store_err = |source| RunnerError::PayloadStore {
        dir: dir.to_path_buf(),
        source,
    };
    let mut file = tempfile::Builder::new()
        .prefix("payload-")
        .suffix(".json")
        .tempfile_in(dir)
        .map_err(store_err)?;
    file.write_all(raw_payload).map_err(store_err)?;
    let (_, path) = file.keep().map_err(|e| store_err(e.error))?;
    Ok(path)
}
