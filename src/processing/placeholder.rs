use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, warn};

use crate::config::PlaceholderConfig;
use crate::error::{PreviewError, Result};

pub const PLACEHOLDER_WIDTH: u32 = 170;
pub const PLACEHOLDER_HEIGHT: u32 = 136;

const BACKGROUND: Rgb<u8> = Rgb([0xdd, 0xdd, 0xdd]);
const TEXT: Rgb<u8> = Rgb([0x33, 0x33, 0x33]);
const MARGIN: i32 = 10;
const LINE_PITCH: i32 = 20;
const FONT_SIZE: f32 = 14.0;

static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// Renders the "No thumb / generated!" image written when no preview could
/// be produced by the external tools
pub struct PlaceholderRenderer {
    font: Option<FontArc>,
}

impl PlaceholderRenderer {
    /// Renderer using the configured TrueType font, or the embedded one
    pub fn new(config: &PlaceholderConfig) -> Self {
        let configured = config.font_path.as_ref().and_then(|path| {
            let loaded = std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|data| FontArc::try_from_vec(data).map_err(|e| e.to_string()));
            match loaded {
                Ok(font) => {
                    debug!("Loaded placeholder font {:?}", path);
                    Some(font)
                }
                Err(e) => {
                    warn!("Could not load placeholder font {:?}, using embedded font: {}", path, e);
                    None
                }
            }
        });

        match configured {
            Some(font) => Self { font: Some(font) },
            None => Self::builtin(),
        }
    }

    /// Renderer using the embedded font only
    pub fn builtin() -> Self {
        let font = match FontArc::try_from_slice(EMBEDDED_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("Embedded placeholder font is unusable, text will be omitted: {}", e);
                None
            }
        };
        Self { font }
    }

    /// Write a placeholder JPEG with one text line per entry
    pub fn render<P: AsRef<Path>>(&self, path: P, lines: &[&str]) -> Result<()> {
        let path = path.as_ref();
        let mut img: RgbImage = ImageBuffer::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, BACKGROUND);

        if let Some(font) = &self.font {
            let scale = PxScale::from(FONT_SIZE);
            for (i, line) in lines.iter().enumerate() {
                // Text running past the right edge is clipped
                draw_text_mut(&mut img, TEXT, MARGIN, MARGIN + i as i32 * LINE_PITCH, scale, font, line);
            }
        }

        img.save_with_format(path, ImageFormat::Jpeg).map_err(|e| PreviewError::PlaceholderFailed {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dark_pixels(img: &RgbImage) -> usize {
        img.pixels().filter(|p| p.0.iter().all(|&c| c < 0x80)).count()
    }

    #[test]
    fn test_placeholder_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("placeholder.jpg");

        PlaceholderRenderer::builtin()
            .render(&path, &["No thumb", "generated!", "clip.mp4"])
            .unwrap();

        let (width, height) = image::image_dimensions(&path).unwrap();
        assert_eq!((width, height), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_text_is_drawn() {
        let dir = tempdir().unwrap();
        let blank = dir.path().join("blank.jpg");
        let labelled = dir.path().join("labelled.jpg");

        let renderer = PlaceholderRenderer::builtin();
        assert!(renderer.font.is_some());
        renderer.render(&blank, &[]).unwrap();
        renderer.render(&labelled, &["No thumb", "generated!"]).unwrap();

        let blank = image::open(&blank).unwrap().to_rgb8();
        let labelled = image::open(&labelled).unwrap().to_rgb8();
        assert_eq!(dark_pixels(&blank), 0);
        assert!(dark_pixels(&labelled) > 50);
    }

    #[test]
    fn test_long_lines_are_clipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.jpg");

        PlaceholderRenderer::builtin()
            .render(&path, &["a_very_long_file_name_that_does_not_fit_at_all.mp4"])
            .unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT));
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("placeholder.jpg");
        assert!(PlaceholderRenderer::builtin().render(&path, &["No thumb"]).is_err());
    }

    #[test]
    fn test_unloadable_font_falls_back_to_embedded() {
        let dir = tempdir().unwrap();
        let font_path = dir.path().join("not-a-font.ttf");
        std::fs::write(&font_path, b"garbage").unwrap();

        let renderer = PlaceholderRenderer::new(&PlaceholderConfig { font_path: Some(font_path) });
        assert!(renderer.font.is_some());
    }

    #[test]
    fn test_configured_font_is_used() {
        let dir = tempdir().unwrap();
        let font_path = dir.path().join("mono.ttf");
        std::fs::write(&font_path, EMBEDDED_FONT).unwrap();

        let renderer = PlaceholderRenderer::new(&PlaceholderConfig { font_path: Some(font_path) });
        let path = dir.path().join("placeholder.jpg");
        renderer.render(&path, &["No thumb"]).unwrap();
        assert!(path.is_file());
    }
}
