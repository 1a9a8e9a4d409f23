use crate::media::ProcessingRequest;

/// Crop window produced by the scaling helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    /// Width of the window cut out of the scaled image (0 = scaled width)
    pub orig_width: u32,
    /// Height of the window (0 = scaled height)
    pub orig_height: u32,
    /// Horizontal offset percentage in [-100, 100], 0 = centered
    pub crop_h: i32,
    /// Vertical offset percentage in [-100, 100], 0 = centered
    pub crop_v: i32,
}

impl CropGeometry {
    /// Pixel offsets of the window inside a `width` x `height` image
    pub fn offsets(&self, width: u32, height: u32) -> (i64, i64) {
        let (orig_width, orig_height) = self.window(width, height);
        (
            crop_offset(width, orig_width, self.crop_h),
            crop_offset(height, orig_height, self.crop_v),
        )
    }

    /// Window size with unset sides defaulting to the scaled size
    pub fn window(&self, width: u32, height: u32) -> (u32, u32) {
        let orig_width = if self.orig_width == 0 { width } else { self.orig_width };
        let orig_height = if self.orig_height == 0 { height } else { self.orig_height };
        (orig_width, orig_height)
    }
}

/// `floor((scaled - window) * (percent + 100) / 200)`
pub fn crop_offset(scaled: u32, window: u32, percent: i32) -> i64 {
    let percent = percent.clamp(-100, 100) as i64;
    ((scaled as i64 - window as i64) * (percent + 100)).div_euclid(200)
}

/// Final dimensions computed for a crop-scale request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleResult {
    pub width: u32,
    pub height: u32,
    pub crop: Option<CropGeometry>,
    /// Aspect ratio was preserved by fitting inside the requested box
    pub max: bool,
}

/// Computes target dimensions from source dimensions and bounds
pub trait ImageScaler: Send + Sync {
    fn scale(&self, source: (u32, u32), request: &ProcessingRequest, allow_upscaling: bool) -> ScaleResult;
}

/// Scaling rules of the host's graphical functions
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl ImageScaler for StandardScaler {
    fn scale(&self, source: (u32, u32), request: &ProcessingRequest, allow_upscaling: bool) -> ScaleResult {
        let (src_w, src_h) = source;
        let mut max = request.width.is_max() || request.height.is_max();
        let crop = request.width.is_crop() || request.height.is_crop();

        let mut w = request.width.value;
        let mut h = request.height.value;

        if request.max_width > 0 {
            let reference = if w > 0 { w } else { src_w };
            if reference > request.max_width {
                w = request.max_width;
                max = true;
            }
        }
        if request.max_height > 0 {
            let reference = if h > 0 { h } else { src_h };
            if reference > request.max_height {
                h = request.max_height;
                max = true;
            }
        }

        let orig_width = w;
        let orig_height = h;

        if !allow_upscaling {
            w = w.min(src_w);
            h = h.min(src_h);
        }

        let (mut out_w, mut out_h) = (src_w, src_h);
        if (w > 0 || h > 0) && src_w > 0 && src_h > 0 {
            let ratio = src_w as f64 / src_h as f64;
            match (w > 0, h > 0) {
                (true, false) => {
                    out_h = (src_h as f64 * (w as f64 / src_w as f64)).ceil() as u32;
                    out_w = w;
                }
                (false, true) => {
                    out_w = (src_w as f64 * (h as f64 / src_h as f64)).ceil() as u32;
                    out_h = h;
                }
                _ => {
                    if max {
                        if h as f64 * ratio > w as f64 {
                            h = (w as f64 / ratio).round() as u32;
                        } else {
                            w = (h as f64 * ratio).round() as u32;
                        }
                    }
                    if crop {
                        if (h as f64 * ratio) < w as f64 {
                            h = (w as f64 / ratio).round() as u32;
                        } else {
                            w = (h as f64 * ratio).round() as u32;
                        }
                    }
                    out_w = w;
                    out_h = h;
                }
            }
        } else if src_w == 0 || src_h == 0 {
            out_w = w;
            out_h = h;
        }

        // Minimum measures
        if request.min_width > 0 && out_w < request.min_width {
            if (max || crop) && out_w > 0 {
                out_h = (out_h as f64 * request.min_width as f64 / out_w as f64).round() as u32;
            }
            out_w = request.min_width;
        }
        if request.min_height > 0 && out_h < request.min_height {
            if (max || crop) && out_h > 0 {
                out_w = (out_w as f64 * request.min_height as f64 / out_h as f64).round() as u32;
            }
            out_h = request.min_height;
        }

        ScaleResult {
            width: out_w,
            height: out_h,
            crop: crop.then(|| CropGeometry {
                orig_width,
                orig_height,
                crop_h: request.crop_horizontal(),
                crop_v: request.crop_vertical(),
            }),
            max,
        }
    }
}
