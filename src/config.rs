use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for video-thumbs
///
/// Built once at startup and shared read-only by the pipeline and the
/// dispatch layer. A configuration that fails [`Config::validate`] keeps
/// the whole feature switched off.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Host extension settings
    pub extension: ExtensionConfig,

    /// Image tool settings
    pub graphics: GraphicsConfig,

    /// Pipeline behaviour
    pub pipeline: PipelineConfig,

    /// Placeholder rendering
    pub placeholder: PlaceholderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.extension.validate()?;
        self.graphics.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// Settings of the host extension, keyed the way the host stores them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtensionConfig {
    /// Wire the preview handler into the event bus at all
    pub local_media_thumbs_enable: bool,

    /// Comma separated list of file extensions treated as video
    pub local_media_containers: String,

    /// Transcoder executable name, without platform suffix
    pub local_media_processor: String,

    /// Directory containing the transcoder; empty means `PATH` lookup
    pub local_media_processor_path: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            local_media_thumbs_enable: true,
            local_media_containers: "mp4,webm,ogv,mov,avi,mkv,m4v".to_string(),
            local_media_processor: "ffmpeg".to_string(),
            local_media_processor_path: String::new(),
        }
    }
}

impl ExtensionConfig {
    /// Lower-cased container extensions, without leading dots
    pub fn containers(&self) -> HashSet<String> {
        self.local_media_containers
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    /// Check whether an extension is listed as a video container
    pub fn is_container(&self, extension: &str) -> bool {
        self.containers().contains(&extension.trim_start_matches('.').to_lowercase())
    }

    /// Full path of the transcoder executable for this platform
    pub fn processor_binary(&self) -> PathBuf {
        let name = format!("{}{}", self.local_media_processor, std::env::consts::EXE_SUFFIX);
        if self.local_media_processor_path.is_empty() {
            PathBuf::from(name)
        } else {
            Path::new(&self.local_media_processor_path).join(name)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.local_media_processor.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                key: "extension.localMediaProcessor".to_string(),
            }.into());
        }

        if self.containers().is_empty() {
            return Err(ConfigError::MissingKey {
                key: "extension.localMediaContainers".to_string(),
            }.into());
        }

        Ok(())
    }
}

/// Which `convert` flavour the image tool is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageProcessor {
    ImageMagick,
    GraphicsMagick,
}

/// Image tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Image processing enabled at all
    pub processor_enabled: bool,

    /// ImageMagick or GraphicsMagick
    pub processor: ImageProcessor,

    /// Directory containing `convert` / `gm`; empty means `PATH` lookup
    pub processor_path: String,

    /// Allow results larger than the extracted frame
    pub allow_upscaling: bool,

    /// Scale operator used when the request does not ask for `-sample`
    pub scale_command: String,

    /// Output colorspace
    pub colorspace: String,

    /// JPEG quality (1-100)
    pub jpg_quality: u8,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            processor_enabled: true,
            processor: ImageProcessor::ImageMagick,
            processor_path: String::new(),
            allow_upscaling: true,
            scale_command: "-geometry".to_string(),
            colorspace: "sRGB".to_string(),
            jpg_quality: 85,
        }
    }
}

impl GraphicsConfig {
    /// Program and leading arguments for a `convert` call
    pub fn convert_command(&self) -> (PathBuf, Vec<String>) {
        let (name, leading) = match self.processor {
            ImageProcessor::ImageMagick => ("convert", vec![]),
            ImageProcessor::GraphicsMagick => ("gm", vec!["convert".to_string()]),
        };
        let name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
        let program = if self.processor_path.is_empty() {
            PathBuf::from(name)
        } else {
            Path::new(&self.processor_path).join(name)
        };
        (program, leading)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpg_quality) {
            return Err(ConfigError::InvalidValue {
                key: "graphics.jpg_quality".to_string(),
                value: self.jpg_quality.to_string()
            }.into());
        }

        if !self.scale_command.starts_with('-') {
            return Err(ConfigError::InvalidValue {
                key: "graphics.scale_command".to_string(),
                value: self.scale_command.clone()
            }.into());
        }

        Ok(())
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scratch directory for frame and resize output
    pub transient_dir: PathBuf,

    /// Position of the extracted frame (`HH:MM:SS`)
    pub seek_position: String,

    /// Upper bound for each external process, in seconds
    pub tool_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transient_dir: PathBuf::from("var/transient"),
            seek_position: "00:00:01".to_string(),
            tool_timeout_secs: 60,
        }
    }
}

impl PipelineConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.tool_timeout_secs".to_string(),
                value: self.tool_timeout_secs.to_string()
            }.into());
        }

        if !is_valid_seek_position(&self.seek_position) {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.seek_position".to_string(),
                value: self.seek_position.clone()
            }.into());
        }

        Ok(())
    }
}

/// `HH:MM:SS` with an optional fractional part on the seconds
fn is_valid_seek_position(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return false;
    }

    let whole = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let (seconds, fraction) = match parts[2].split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (parts[2], None),
    };

    whole(parts[0]) && whole(parts[1]) && whole(seconds) && fraction.map_or(true, whole)
}

/// Placeholder rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// TrueType font for the placeholder text; built-in bitmap font otherwise
    pub font_path: Option<PathBuf>,
}
