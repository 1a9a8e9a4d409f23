//! # Media Module
//!
//! Source files, processing requests and image header inspection.

pub mod info;
pub mod types;

pub use info::ImageInfo;
pub use types::{
    hash_identifier, Dimension, MediaType, ProcessingRequest, ScaleMode, SourceMedia, TaskType,
};
