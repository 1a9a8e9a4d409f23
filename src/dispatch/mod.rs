//! # Dispatch Module
//!
//! Wires preview generation into the host's file-processing events.
//!
//! The host publishes a [`FileProcessingEvent`] on an [`EventBus`]. The
//! [`PreviewProcessingHandler`] picks up video files with a supported task
//! whose processed file is missing or outdated, runs the pipeline and hands
//! the result to a [`ProcessedFileRepository`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use video_thumbs::{config::Config, dispatch::{self, DirectoryRepository, EventBus}};
//!
//! let mut bus = EventBus::new();
//! let repository = Arc::new(DirectoryRepository::new("fileadmin/_processed_"));
//! dispatch::register(&mut bus, Arc::new(Config::default()), repository)?;
//! # Ok::<(), video_thumbs::ThumbError>(())
//! ```

pub mod events;
pub mod handler;
pub mod repository;

pub use events::{
    EventBus, EventHandler, FileProcessingEvent, HandlerOutcome, IgnoreReason, ProcessedFileState,
};
pub use handler::{register, PreviewProcessingHandler, HANDLER_NAME};
pub use repository::{DirectoryRepository, ProcessedFileRepository, ProcessedRecord};
