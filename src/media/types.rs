use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PreviewError, ThumbError};

/// Host file-type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Unknown,
    Text,
    Image,
    Audio,
    Video,
    Application,
}

impl MediaType {
    /// Best-effort classification from a file extension
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "mp4" | "m4v" | "mov" | "avi" | "mkv" | "webm" | "ogv" | "mpg" | "mpeg" | "wmv"
            | "flv" => Self::Video,
            "mp3" | "wav" | "flac" | "ogg" | "m4a" | "aac" => Self::Audio,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tif" | "tiff" | "webp" => Self::Image,
            "txt" | "csv" | "md" | "html" => Self::Text,
            "pdf" | "zip" | "json" | "xml" => Self::Application,
            _ => Self::Unknown,
        }
    }
}

/// A video file as handed over by the host's file store
#[derive(Debug, Clone)]
pub struct SourceMedia {
    /// Storage identifier (unique within the store)
    pub identifier: String,

    /// Content identifier hash, used to scope transient files
    pub hashed_identifier: String,

    /// File name including extension
    pub name: String,

    /// Extension without leading dot
    pub extension: String,

    /// Declared media type
    pub media_type: MediaType,

    /// Locally accessible copy of the file
    pub local_path: PathBuf,
}

impl SourceMedia {
    /// Describe a file on the local disk
    pub fn from_local_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let identifier = path.display().to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| identifier.clone());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            hashed_identifier: hash_identifier(&identifier),
            media_type: MediaType::from_extension(&extension),
            identifier,
            name,
            extension,
            local_path: path.to_path_buf(),
        }
    }

    /// File name without its extension
    pub fn name_without_extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// 40 hex characters identifying a storage identifier
pub fn hash_identifier(identifier: &str) -> String {
    blake3::hash(identifier.as_bytes()).to_hex().as_str()[..40].to_string()
}

/// The two processing tasks a preview can be generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Preview,
    CropScaleMask,
}

impl TaskType {
    /// Task name as used by the host
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preview => "Image.Preview",
            Self::CropScaleMask => "Image.CropScaleMask",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskType {
    type Err = ThumbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Image.Preview" => Ok(Self::Preview),
            "Image.CropScaleMask" => Ok(Self::CropScaleMask),
            other => Err(PreviewError::InvalidRequest {
                details: format!("unsupported task type '{}'", other),
            }.into()),
        }
    }
}

/// How a requested dimension should be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Exact value
    Plain,
    /// Upper bound, aspect ratio preserved (`m` suffix)
    Max,
    /// Cover and crop, offset in percent (`c` suffix)
    Crop(i32),
}

/// A width or height as the host writes it: `120`, `120m`, `120c`, `120c-50`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub value: u32,
    pub mode: ScaleMode,
}

impl Dimension {
    pub const UNSET: Self = Self { value: 0, mode: ScaleMode::Plain };

    pub fn plain(value: u32) -> Self {
        Self { value, mode: ScaleMode::Plain }
    }

    pub fn max(value: u32) -> Self {
        Self { value, mode: ScaleMode::Max }
    }

    /// Crop dimension with the offset clamped to [-100, 100]
    pub fn crop(value: u32, offset: i32) -> Self {
        Self { value, mode: ScaleMode::Crop(offset.clamp(-100, 100)) }
    }

    pub fn is_max(&self) -> bool {
        self.mode == ScaleMode::Max
    }

    pub fn is_crop(&self) -> bool {
        matches!(self.mode, ScaleMode::Crop(_))
    }

    /// Crop offset percentage, 0 when not cropping
    pub fn crop_offset(&self) -> i32 {
        match self.mode {
            ScaleMode::Crop(offset) => offset,
            _ => 0,
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::UNSET
    }
}

impl From<u32> for Dimension {
    fn from(value: u32) -> Self {
        Self::plain(value)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ScaleMode::Plain => write!(f, "{}", self.value),
            ScaleMode::Max => write!(f, "{}m", self.value),
            ScaleMode::Crop(0) => write!(f, "{}c", self.value),
            ScaleMode::Crop(offset) => write!(f, "{}c{:+}", self.value, offset),
        }
    }
}

impl FromStr for Dimension {
    type Err = ThumbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::UNSET);
        }

        let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let invalid = || -> ThumbError {
            PreviewError::InvalidRequest { details: format!("invalid dimension '{}'", s) }.into()
        };

        let value = if digits_end == 0 {
            0
        } else {
            s[..digits_end].parse::<u32>().map_err(|_| invalid())?
        };

        match &s[digits_end..] {
            "" => Ok(Self::plain(value)),
            "m" => Ok(Self::max(value)),
            rest if rest.starts_with('c') => {
                let offset = &rest[1..];
                if offset.is_empty() {
                    Ok(Self::crop(value, 0))
                } else {
                    let offset = offset.parse::<i32>().map_err(|_| invalid())?;
                    Ok(Self::crop(value, offset))
                }
            }
            _ => Err(invalid()),
        }
    }
}

/// Immutable description of one preview to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRequest {
    pub task: TaskType,
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub no_scale: bool,
    pub use_sample: bool,
}

impl ProcessingRequest {
    pub fn new(task: TaskType, width: Dimension, height: Dimension) -> Self {
        Self {
            task,
            width,
            height,
            max_width: 0,
            max_height: 0,
            min_width: 0,
            min_height: 0,
            no_scale: false,
            use_sample: false,
        }
    }

    /// Plain preview of exactly `width` x `height`
    pub fn preview(width: u32, height: u32) -> Self {
        Self::new(TaskType::Preview, width.into(), height.into())
    }

    /// Crop-scale-mask request
    pub fn crop_scale(width: impl Into<Dimension>, height: impl Into<Dimension>) -> Self {
        Self::new(TaskType::CropScaleMask, width.into(), height.into())
    }

    pub fn with_max(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_min(mut self, min_width: u32, min_height: u32) -> Self {
        self.min_width = min_width;
        self.min_height = min_height;
        self
    }

    pub fn with_no_scale(mut self, no_scale: bool) -> Self {
        self.no_scale = no_scale;
        self
    }

    pub fn with_sample(mut self, use_sample: bool) -> Self {
        self.use_sample = use_sample;
        self
    }

    /// Horizontal crop offset percentage
    pub fn crop_horizontal(&self) -> i32 {
        self.width.crop_offset()
    }

    /// Vertical crop offset percentage
    pub fn crop_vertical(&self) -> i32 {
        self.height.crop_offset()
    }

    /// Configuration checksum: identifies this exact processing configuration
    pub fn checksum(&self) -> String {
        let canonical = format!(
            "{}|width={}|height={}|maxWidth={}|maxHeight={}|minWidth={}|minHeight={}|noScale={}|useSample={}",
            self.task.name(),
            self.width,
            self.height,
            self.max_width,
            self.max_height,
            self.min_width,
            self.min_height,
            self.no_scale as u8,
            self.use_sample as u8,
        );
        blake3::hash(canonical.as_bytes()).to_hex().as_str()[..10].to_string()
    }
}
