use std::path::Path;

use crate::error::Result;

/// Pixel dimensions and byte size of an image on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

impl ImageInfo {
    /// Read dimensions from the image header and size from the filesystem
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (width, height) = image::image_dimensions(path)?;
        let size = std::fs::metadata(path)?.len();
        Ok(Self { width, height, size })
    }
}

/// Size in bytes of a file, `None` when it does not exist or is empty
pub fn non_empty_size<P: AsRef<Path>>(path: P) -> Option<u64> {
    std::fs::metadata(path.as_ref())
        .ok()
        .filter(|meta| meta.is_file() && meta.len() > 0)
        .map(|meta| meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_read_jpeg_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let img: RgbImage = ImageBuffer::from_fn(64, 48, |_, _| Rgb([10, 20, 30]));
        img.save(&path).unwrap();

        let info = ImageInfo::read(&path).unwrap();
        assert_eq!((info.width, info.height), (64, 48));
        assert!(info.size > 0);
    }

    #[test]
    fn test_non_empty_size() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.jpg");
        std::fs::write(&empty, b"").unwrap();

        assert_eq!(non_empty_size(&empty), None);
        assert_eq!(non_empty_size(dir.path().join("missing.jpg")), None);

        let full = dir.path().join("full.jpg");
        std::fs::write(&full, b"abc").unwrap();
        assert_eq!(non_empty_size(&full), Some(3));
    }
}
