use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{PreviewError, Result};
use crate::media::{ImageInfo, ProcessingRequest, SourceMedia, TaskType};
use crate::media::info::non_empty_size;
use crate::processing::placeholder::PlaceholderRenderer;
use crate::processing::scale::{ImageScaler, StandardScaler};
use crate::processing::tools::{ProcessRunner, ToolInvocation, ToolRunner};
use crate::processing::transient::TransientFile;

const FRAME_PREFIX: &str = "videopreview_";
const OUTPUT_PREFIX: &str = "video_";
const NO_THUMB: &str = "No thumb";
const GENERATED: &str = "generated!";

/// A finished preview image, ready to be handed to the persistence layer
///
/// The artifact owns its file in transient storage. Copy it somewhere
/// durable with [`PreviewArtifact::persist_to`]; the transient file is
/// removed when the artifact is dropped.
#[derive(Debug)]
pub struct PreviewArtifact {
    file: TransientFile,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub checksum: String,
    pub target_name: String,
}

impl PreviewArtifact {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Copy the image to `destination`, creating parent directories
    pub fn persist_to<P: AsRef<Path>>(&self, destination: P) -> Result<PathBuf> {
        let destination = destination.as_ref();
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(self.file.path(), destination)?;
        Ok(destination.to_path_buf())
    }

    /// Take ownership of the transient file instead of letting it be removed
    pub fn into_path(self) -> PathBuf {
        self.file.keep()
    }
}

/// `preview_<checksum>_<name without extension>.jpg`
pub fn target_file_name(checksum: &str, base_name: &str) -> String {
    format!("preview_{}_{}.jpg", checksum, base_name)
}

/// Generates preview images for video files
///
/// Each call extracts one frame with the configured transcoder, scales it
/// with the image tool and reports the result. Calls share nothing but the
/// transient directory, so any number may run concurrently.
pub struct PreviewPipeline {
    config: Arc<Config>,
    runner: Arc<dyn ToolRunner>,
    scaler: Arc<dyn ImageScaler>,
    placeholder: PlaceholderRenderer,
}

impl PreviewPipeline {
    /// Create a pipeline that runs real processes
    pub fn new(config: Arc<Config>) -> Self {
        let runner = ProcessRunner::new(config.pipeline.tool_timeout());
        let placeholder = PlaceholderRenderer::new(&config.placeholder);
        Self {
            config,
            runner: Arc::new(runner),
            scaler: Arc::new(StandardScaler),
            placeholder,
        }
    }

    /// Replace the process runner
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the scaling helper
    pub fn with_scaler(mut self, scaler: Arc<dyn ImageScaler>) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Produce a preview for `source`
    ///
    /// Tool failures never surface here: a missing, empty or unreadable
    /// output degrades to a placeholder image. The only error is
    /// [`PreviewError::NoOutputProduced`], when even the placeholder could
    /// not be written (or an IO error preparing transient storage). Nothing
    /// should be persisted then.
    pub async fn generate_preview(
        &self,
        source: &SourceMedia,
        request: &ProcessingRequest,
        checksum: &str,
    ) -> Result<PreviewArtifact> {
        let transient_dir = &self.config.pipeline.transient_dir;
        let frame = TransientFile::reserve(transient_dir, FRAME_PREFIX, &source.hashed_identifier)?;
        let output = TransientFile::reserve(transient_dir, OUTPUT_PREFIX, &source.hashed_identifier)?;

        debug!("Generating {} for {} ({}x{})",
               request.task, source.name, request.width, request.height);

        // Step 1: Frame extraction
        self.extract_frame(source, frame.path()).await;

        // Step 2: Mode dispatch
        match request.task {
            TaskType::Preview => self.resize(source, frame.path(), output.path(), request).await,
            TaskType::CropScaleMask => self.crop_scale(source, frame.path(), output.path(), request).await,
        }

        // Step 3: The frame is not needed past this point
        drop(frame);

        // Step 4: Finalize
        self.finalize(source, output, checksum)
    }

    async fn extract_frame(&self, source: &SourceMedia, frame_path: &Path) {
        let invocation = ToolInvocation::new(self.config.extension.processor_binary())
            .arg("-ss")
            .arg(&self.config.pipeline.seek_position)
            .arg("-i")
            .arg(&source.local_path)
            .args(["-frames:v", "1"])
            .arg(frame_path);

        match self.runner.run(&invocation).await {
            Ok(output) if !output.success => {
                warn!("Frame extraction for {} exited with {:?}", source.name, output.status_code);
            }
            Ok(_) => {}
            Err(e) => warn!("Frame extraction for {} failed: {}", source.name, e),
        }
    }

    /// Plain preview: sample the frame to exactly the requested size
    async fn resize(&self, source: &SourceMedia, frame_path: &Path, output_path: &Path, request: &ProcessingRequest) {
        if !self.config.graphics.processor_enabled {
            debug!("Image processing disabled, writing placeholder for {}", source.name);
            self.write_placeholder(source, output_path);
            return;
        }

        if frame_path.is_file() {
            let geometry = format!("{}x{}!", request.width.value, request.height.value);
            let invocation = self
                .convert()
                .args(["-sample", geometry.as_str()])
                .arg(image_input(frame_path))
                .arg(output_path);
            self.run_image_tool(source, &invocation).await;
        }

        if !is_usable_image(output_path) {
            self.write_placeholder(source, output_path);
        }
    }

    /// Crop/scale/mask preview: scale within bounds, then cut the crop window
    async fn crop_scale(&self, source: &SourceMedia, frame_path: &Path, output_path: &Path, request: &ProcessingRequest) {
        if frame_path.is_file() {
            self.crop_scale_frame(source, frame_path, output_path, request).await;
        }

        if !is_usable_image(output_path) {
            self.write_placeholder(source, output_path);
        }
    }

    async fn crop_scale_frame(&self, source: &SourceMedia, frame_path: &Path, output_path: &Path, request: &ProcessingRequest) {
        let graphics = &self.config.graphics;
        let dimensions = match image::image_dimensions(frame_path) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                warn!("Could not read extracted frame for {}: {}", source.name, e);
                (0, 0)
            }
        };

        let scaled = self.scaler.scale(dimensions, request, graphics.allow_upscaling);
        debug!("Scaled {}x{} to {}x{} (crop: {:?})",
               dimensions.0, dimensions.1, scaled.width, scaled.height, scaled.crop);

        if request.no_scale && scaled.crop.is_none() && (scaled.width, scaled.height) == dimensions {
            debug!("No scaling needed for {}, using the extracted frame", source.name);
            if let Err(e) = std::fs::copy(frame_path, output_path) {
                warn!("Could not copy extracted frame for {}: {}", source.name, e);
            }
            return;
        }

        let scale_command = if request.use_sample { "-sample" } else { graphics.scale_command.as_str() };
        let quality = graphics.jpg_quality.to_string();
        let mut invocation = self
            .convert()
            .arg(scale_command)
            .arg(format!("{}x{}!", scaled.width, scaled.height))
            .args(["-colorspace", graphics.colorspace.as_str(), "-quality", quality.as_str()]);

        if let Some(crop) = scaled.crop {
            let (window_w, window_h) = crop.window(scaled.width, scaled.height);
            let (offset_x, offset_y) = crop.offsets(scaled.width, scaled.height);
            invocation = invocation.args([
                "-crop".to_string(),
                format!("{}x{}{:+}{:+}!", window_w, window_h, offset_x, offset_y),
            ]);
        }

        let invocation = invocation.arg(image_input(frame_path)).arg(output_path);
        self.run_image_tool(source, &invocation).await;
    }

    /// `convert` program with its leading arguments
    fn convert(&self) -> ToolInvocation {
        let (program, leading) = self.config.graphics.convert_command();
        ToolInvocation::new(program).args(leading)
    }

    async fn run_image_tool(&self, source: &SourceMedia, invocation: &ToolInvocation) {
        match self.runner.run(invocation).await {
            Ok(output) if !output.success => {
                warn!("Image tool for {} exited with {:?}: {}",
                      source.name, output.status_code, output.combined());
            }
            Ok(_) => {}
            Err(e) => warn!("Image tool for {} failed: {}", source.name, e),
        }
    }

    fn write_placeholder(&self, source: &SourceMedia, output_path: &Path) {
        warn!("No preview produced for {}, writing placeholder", source.name);
        if let Err(e) = self.placeholder.render(output_path, &[NO_THUMB, GENERATED, &source.name]) {
            warn!("Placeholder for {} could not be written: {}", source.name, e);
        }
    }

    fn finalize(&self, source: &SourceMedia, output: TransientFile, checksum: &str) -> Result<PreviewArtifact> {
        let no_output = || PreviewError::NoOutputProduced {
            path: output.path().display().to_string(),
        };

        if non_empty_size(output.path()).is_none() {
            return Err(no_output().into());
        }

        let info = ImageInfo::read(output.path()).map_err(|e| {
            warn!("Output for {} is not a readable image: {}", source.name, e);
            no_output()
        })?;
        let target_name = target_file_name(checksum, source.name_without_extension());

        info!("Generated {} ({}x{}, {} bytes) for {}",
              target_name, info.width, info.height, info.size, source.name);

        Ok(PreviewArtifact {
            file: output,
            width: info.width,
            height: info.height,
            size: info.size,
            checksum: checksum.to_string(),
            target_name,
        })
    }
}

/// Non-empty and carries a readable image header
fn is_usable_image(path: &Path) -> bool {
    non_empty_size(path).is_some() && image::image_dimensions(path).is_ok()
}

/// Input file argument for the image tool: first frame, read as JPEG
fn image_input(path: &Path) -> String {
    format!("jpg:{}[0]", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Dimension;
    use crate::processing::placeholder::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH};
    use crate::processing::test_support::FakeTools;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Arc<Config>, SourceMedia) {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.pipeline.transient_dir = dir.path().join("transient");

        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not really a video").unwrap();
        let source = SourceMedia::from_local_path(&video);

        (dir, Arc::new(config), source)
    }

    fn transient_entries(dir: &TempDir) -> Vec<PathBuf> {
        match std::fs::read_dir(dir.path().join("transient")) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_target_file_name() {
        assert_eq!(target_file_name("abc123", "clip"), "preview_abc123_clip.jpg");
    }

    #[tokio::test]
    async fn test_plain_preview_scenario() {
        let (dir, config, source) = setup();
        let tools = Arc::new(FakeTools::working(320, 240));
        let pipeline = PreviewPipeline::new(config).with_runner(tools.clone());

        let request = ProcessingRequest::preview(120, 90);
        let checksum = request.checksum();
        let artifact = pipeline.generate_preview(&source, &request, &checksum).await.unwrap();

        assert_eq!((artifact.width, artifact.height), (120, 90));
        assert_eq!(artifact.target_name, format!("preview_{}_clip.jpg", checksum));
        assert_eq!(artifact.checksum, checksum);
        assert!(artifact.size > 0);

        // Only the handed-over output is left in transient storage
        assert_eq!(transient_entries(&dir), vec![artifact.path().to_path_buf()]);
        drop(artifact);
        assert!(transient_entries(&dir).is_empty());

        let calls = tools.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args[0], "-ss");
        assert_eq!(calls[0].args[1], "00:00:01");
        assert_eq!(calls[0].args[3].as_os_str(), source.local_path.as_os_str());
        assert!(calls[1].args.iter().any(|a| a == "120x90!"));
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_artifacts() {
        let (_dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::working(320, 240)));

        let request = ProcessingRequest::preview(64, 48);
        let first = pipeline.generate_preview(&source, &request, &request.checksum()).await.unwrap();
        let second = pipeline.generate_preview(&source, &request, &request.checksum()).await.unwrap();

        assert_eq!(first.checksum, second.checksum);
        assert_eq!((first.width, first.height), (second.width, second.height));
        assert_eq!(first.target_name, second.target_name);
        assert_ne!(first.path(), second.path());
    }

    #[tokio::test]
    async fn test_failing_image_tool_falls_back_to_placeholder() {
        let (dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::broken_image_tool(320, 240)));

        let request = ProcessingRequest::preview(120, 90);
        let artifact = pipeline.generate_preview(&source, &request, "abc123").await.unwrap();

        assert_eq!((artifact.width, artifact.height), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        assert!(artifact.size > 0);
        assert_eq!(artifact.target_name, "preview_abc123_clip.jpg");
        assert_eq!(transient_entries(&dir).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_tools_fall_back_to_placeholder() {
        let (dir, config, source) = setup();
        let mut config = (*config).clone();
        config.extension.local_media_processor_path = "/nonexistent".to_string();
        config.graphics.processor_path = "/nonexistent".to_string();
        let pipeline = PreviewPipeline::new(Arc::new(config));

        let request = ProcessingRequest::crop_scale(100, 100);
        let artifact = pipeline.generate_preview(&source, &request, "c0ffee").await.unwrap();

        assert_eq!((artifact.width, artifact.height), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        assert_eq!(transient_entries(&dir).len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_processor_writes_placeholder() {
        let (_dir, config, source) = setup();
        let mut config = (*config).clone();
        config.graphics.processor_enabled = false;
        let tools = Arc::new(FakeTools::working(320, 240));
        let pipeline = PreviewPipeline::new(Arc::new(config)).with_runner(tools.clone());

        let request = ProcessingRequest::preview(120, 90);
        let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();

        assert_eq!(artifact.width, PLACEHOLDER_WIDTH);
        // Only the transcoder ran
        assert_eq!(tools.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_output_falls_back_to_placeholder() {
        let (dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::empty_output(320, 240)));

        let request = ProcessingRequest::preview(120, 90);
        let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();

        assert_eq!((artifact.width, artifact.height), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        assert!(artifact.size > 0);
        assert_eq!(transient_entries(&dir), vec![artifact.path().to_path_buf()]);
    }

    #[tokio::test]
    async fn test_unreadable_output_falls_back_to_placeholder() {
        let (dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::garbage_output(320, 240)));

        for request in [
            ProcessingRequest::preview(120, 90),
            ProcessingRequest::crop_scale(Dimension::crop(100, 0), Dimension::crop(100, 0)),
        ] {
            let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();
            assert_eq!((artifact.width, artifact.height), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
            assert_eq!(image::image_dimensions(artifact.path()).unwrap(), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        }
        assert!(transient_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_tool_falls_back_to_placeholder() {
        let (dir, config, source) = setup();
        let tools = Arc::new(FakeTools::timing_out(320, 240));
        let pipeline = PreviewPipeline::new(config).with_runner(tools.clone());

        let request = ProcessingRequest::preview(120, 90);
        let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();

        assert_eq!((artifact.width, artifact.height), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        assert_eq!(tools.calls().len(), 2);
        // The extracted frame is gone, only the handed-over output remains
        assert_eq!(transient_entries(&dir), vec![artifact.path().to_path_buf()]);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_no_output_produced() {
        let (_dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::blocked_output(320, 240)));

        let request = ProcessingRequest::preview(120, 90);
        let result = pipeline.generate_preview(&source, &request, "abc").await;

        assert!(matches!(
            result,
            Err(crate::error::ThumbError::Preview(PreviewError::NoOutputProduced { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unusable_transient_dir_fails() {
        let (dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::working(320, 240)));

        // A file where the transient directory should be
        std::fs::write(dir.path().join("transient"), b"blocked").unwrap();

        let request = ProcessingRequest::preview(120, 90);
        assert!(pipeline.generate_preview(&source, &request, "abc").await.is_err());
    }

    #[tokio::test]
    async fn test_crop_scale_scenario() {
        let (dir, config, source) = setup();
        let tools = Arc::new(FakeTools::working(320, 240));
        let pipeline = PreviewPipeline::new(config).with_runner(tools.clone());

        let request = ProcessingRequest::crop_scale(Dimension::crop(100, 0), Dimension::crop(100, 0))
            .with_max(200, 0);
        let artifact = pipeline.generate_preview(&source, &request, &request.checksum()).await.unwrap();

        assert_eq!((artifact.width, artifact.height), (100, 100));

        let calls = tools.calls();
        let convert = &calls[1];
        assert_eq!(convert.args[0], "-geometry");
        assert_eq!(convert.args[1], "133x100!");
        assert!(convert.args.iter().any(|a| a == "-colorspace"));
        assert!(convert.args.iter().any(|a| a == "100x100+16+0!"));

        drop(artifact);
        assert!(transient_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_crop_scale_without_crop_uses_sample() {
        let (_dir, config, source) = setup();
        let tools = Arc::new(FakeTools::working(320, 240));
        let pipeline = PreviewPipeline::new(config).with_runner(tools.clone());

        let request = ProcessingRequest::crop_scale(Dimension::max(100), Dimension::max(100)).with_sample(true);
        let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();

        assert_eq!((artifact.width, artifact.height), (100, 75));
        let calls = tools.calls();
        assert_eq!(calls[1].args[0], "-sample");
        assert!(!calls[1].args.iter().any(|a| a == "-crop"));
    }

    #[tokio::test]
    async fn test_no_scale_copies_frame() {
        let (_dir, config, source) = setup();
        let tools = Arc::new(FakeTools::working(320, 240));
        let pipeline = PreviewPipeline::new(config).with_runner(tools.clone());

        let request = ProcessingRequest::crop_scale(320, 240).with_no_scale(true);
        let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();

        assert_eq!((artifact.width, artifact.height), (320, 240));
        assert_eq!(tools.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_to_copies_file() {
        let (dir, config, source) = setup();
        let pipeline = PreviewPipeline::new(config).with_runner(Arc::new(FakeTools::working(320, 240)));

        let request = ProcessingRequest::preview(32, 24);
        let artifact = pipeline.generate_preview(&source, &request, "abc").await.unwrap();
        let stored = artifact
            .persist_to(dir.path().join("processed").join(&artifact.target_name))
            .unwrap();
        drop(artifact);

        assert!(stored.is_file());
        assert_eq!(image::image_dimensions(&stored).unwrap(), (32, 24));
    }
}
