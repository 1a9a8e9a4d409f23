use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::dispatch::repository::ProcessedRecord;
use crate::error::Result;
use crate::media::{ProcessingRequest, SourceMedia};

/// State of the processed file the host already knows about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedFileState {
    /// No processed file has been recorded yet
    pub is_new: bool,

    /// The processed file is the original file itself
    pub uses_original_file: bool,

    /// The processed file is present on the backing store
    pub exists: bool,

    /// Configuration checksum the processed file was generated with
    pub stored_checksum: Option<String>,
}

impl ProcessedFileState {
    /// State for a file that was never processed
    pub fn new_file() -> Self {
        Self { is_new: true, ..Self::default() }
    }

    /// State for an existing processed file generated with `checksum`
    pub fn stored(checksum: impl Into<String>) -> Self {
        Self {
            is_new: false,
            uses_original_file: false,
            exists: true,
            stored_checksum: Some(checksum.into()),
        }
    }

    /// Generated with a different configuration
    pub fn is_outdated(&self, current_checksum: &str) -> bool {
        self.stored_checksum.as_deref() != Some(current_checksum)
    }

    /// Whether a preview has to be (re)generated
    pub fn needs_reprocessing(&self, current_checksum: &str) -> bool {
        self.is_new
            || (!self.uses_original_file && !self.exists)
            || self.is_outdated(current_checksum)
    }
}

/// The host asks for a file to be processed
#[derive(Debug, Clone)]
pub struct FileProcessingEvent {
    pub source: SourceMedia,
    /// Task name as sent by the host, e.g. `Image.Preview`
    pub task: String,
    pub request: ProcessingRequest,
    pub processed: ProcessedFileState,
}

/// Why a handler left an event alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotVideo,
    UnsupportedTask,
    UpToDate,
    NoOutput,
}

/// What a handler did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Ignored(IgnoreReason),
    Processed(ProcessedRecord),
}

/// Something subscribed to file-processing events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the unique name of this handler
    fn name(&self) -> &str;

    async fn handle(&self, event: &FileProcessingEvent) -> Result<HandlerOutcome>;
}

/// In-process event bus for file-processing events
///
/// Handlers run in subscription order, one after another.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        debug!("Subscribed handler {}", handler.name());
        self.handlers.push(handler);
    }

    /// Names of all subscribed handlers
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to every handler and collect their outcomes
    pub async fn publish(&self, event: &FileProcessingEvent) -> Vec<Result<HandlerOutcome>> {
        let mut outcomes = Vec::with_capacity(self.handlers.len());
        for handler in &self.handlers {
            let outcome = handler.handle(event).await;
            if let Err(e) = &outcome {
                warn!("Handler {} failed for {}: {}", handler.name(), event.source.name, e);
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
