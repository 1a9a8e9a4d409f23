use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::events::{
    EventBus, EventHandler, FileProcessingEvent, HandlerOutcome, IgnoreReason,
};
use crate::dispatch::repository::ProcessedFileRepository;
use crate::error::{PreviewError, Result, ThumbError};
use crate::media::{MediaType, TaskType};
use crate::processing::PreviewPipeline;

pub const HANDLER_NAME: &str = "video-preview";

/// Generates previews for video files and hands them to the repository
pub struct PreviewProcessingHandler {
    pipeline: PreviewPipeline,
    repository: Arc<dyn ProcessedFileRepository>,
}

impl PreviewProcessingHandler {
    pub fn new(pipeline: PreviewPipeline, repository: Arc<dyn ProcessedFileRepository>) -> Self {
        Self { pipeline, repository }
    }

    /// Video by declared type, or by an extension listed as a container
    fn is_video(&self, event: &FileProcessingEvent) -> bool {
        event.source.media_type == MediaType::Video
            || self.pipeline.config().extension.is_container(&event.source.extension)
    }

    /// Decide whether this event is ours to process
    fn route(&self, event: &FileProcessingEvent) -> std::result::Result<TaskType, IgnoreReason> {
        if !self.is_video(event) {
            return Err(IgnoreReason::NotVideo);
        }

        let task = TaskType::from_str(&event.task).map_err(|_| IgnoreReason::UnsupportedTask)?;
        if task != event.request.task {
            return Err(IgnoreReason::UnsupportedTask);
        }

        if !event.processed.needs_reprocessing(&event.request.checksum()) {
            return Err(IgnoreReason::UpToDate);
        }

        Ok(task)
    }
}

#[async_trait]
impl EventHandler for PreviewProcessingHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    async fn handle(&self, event: &FileProcessingEvent) -> Result<HandlerOutcome> {
        let task = match self.route(event) {
            Ok(task) => task,
            Err(reason) => {
                debug!("Skipping {} ({}): {:?}", event.source.name, event.task, reason);
                return Ok(HandlerOutcome::Ignored(reason));
            }
        };

        let checksum = event.request.checksum();
        info!("Processing {} for {}", task, event.source.name);

        let artifact = match self.pipeline.generate_preview(&event.source, &event.request, &checksum).await {
            Ok(artifact) => artifact,
            Err(ThumbError::Preview(PreviewError::NoOutputProduced { path })) => {
                warn!("Nothing to persist for {}: no output at {}", event.source.name, path);
                return Ok(HandlerOutcome::Ignored(IgnoreReason::NoOutput));
            }
            Err(e) => return Err(e),
        };

        let record = self.repository.add(&artifact)?;
        Ok(HandlerOutcome::Processed(record))
    }
}

/// Subscribe the preview handler when the feature is enabled
///
/// Returns whether the handler was subscribed. An invalid configuration
/// keeps the feature off.
pub fn register(
    bus: &mut EventBus,
    config: Arc<Config>,
    repository: Arc<dyn ProcessedFileRepository>,
) -> Result<bool> {
    if !config.extension.local_media_thumbs_enable {
        info!("Video previews disabled by configuration");
        return Ok(false);
    }
    config.validate()?;

    let pipeline = PreviewPipeline::new(config);
    bus.subscribe(Arc::new(PreviewProcessingHandler::new(pipeline, repository)));
    Ok(true)
}
