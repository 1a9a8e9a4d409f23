//! # Processing Module
//!
//! Turns a video file into a preview image.
//!
//! The [`PreviewPipeline`] runs the transcoder to extract one frame, then
//! the image tool to resize or crop-scale it, and falls back to a rendered
//! placeholder when the tools produce nothing. External programs are run
//! through the [`ToolRunner`] trait and dimensions come from an
//! [`ImageScaler`], so both can be replaced.

pub mod pipeline;
pub mod placeholder;
pub mod scale;
pub mod tools;
pub mod transient;

pub use pipeline::{target_file_name, PreviewArtifact, PreviewPipeline};
pub use placeholder::PlaceholderRenderer;
pub use scale::{crop_offset, CropGeometry, ImageScaler, ScaleResult, StandardScaler};
pub use tools::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use transient::TransientFile;
