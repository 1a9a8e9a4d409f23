//! # video-thumbs
//!
//! Preview images for video files in a content-management system.
//!
//! For every video file the host wants an image preview of, one frame is
//! extracted with an external transcoder (ffmpeg), resized or crop-scaled
//! with an external image tool (ImageMagick or GraphicsMagick) and handed
//! back with its dimensions, size and configuration checksum. When the tools
//! produce nothing, a "No thumb / generated!" placeholder is rendered
//! instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use video_thumbs::{Config, PreviewPipeline, ProcessingRequest, SourceMedia};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let pipeline = PreviewPipeline::new(Arc::new(Config::default()));
//! let source = SourceMedia::from_local_path("clip.mp4");
//! let request = ProcessingRequest::preview(120, 90);
//!
//! let artifact = pipeline.generate_preview(&source, &request, &request.checksum()).await?;
//! artifact.persist_to(format!("processed/{}", artifact.target_name))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`media`] - Source files, processing requests, image header inspection
//! - [`processing`] - External tools, scaling, placeholder and the pipeline
//! - [`dispatch`] - Event bus, preview handler and persistence
//! - [`config`] - Configuration management

pub mod config;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod processing;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    dispatch::{EventBus, FileProcessingEvent, HandlerOutcome, PreviewProcessingHandler},
    error::{Result, ThumbError},
    media::{Dimension, ProcessingRequest, SourceMedia, TaskType},
    processing::{PreviewArtifact, PreviewPipeline},
};
