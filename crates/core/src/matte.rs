//! Foreground matting for try-on outputs.
//!
//! Try-on renders come back as a person against a studio backdrop. Before
//! compositing onto a new scene the backdrop has to become transparent.
//! [`Matte`] is the seam for that step; [`BorderKeyMatte`] keys out the
//! colour that dominates the image border.

use image::{GrayImage, Luma, Rgba, RgbaImage};

/// Produces a foreground alpha mask for an image.
pub trait Matte: Send + Sync {
    /// Return a mask the same size as `img`: 255 is foreground, 0 is backdrop.
    fn alpha_mask(&self, img: &RgbaImage) -> GrayImage;

    /// Replace the alpha channel of `img` with [`Self::alpha_mask`].
    ///
    /// Existing transparency is kept: the result is the minimum of both.
    fn cut_out(&self, img: &RgbaImage) -> RgbaImage {
        let mask = self.alpha_mask(img);
        let mut out = img.clone();
        for (x, y, px) in out.enumerate_pixels_mut() {
            let Luma([m]) = *mask.get_pixel(x, y);
            px.0[3] = px.0[3].min(m);
        }
        out
    }
}

/// Chroma-style key against the average border colour.
///
/// Each pixel's distance from the backdrop colour is scaled into a 0-255
/// mask value. Values at or above `foreground_threshold` are opaque, values
/// at or below `background_threshold` are transparent, and the band between
/// is ramped linearly. The opaque region is then eroded and feathered to
/// suppress the fringe left by anti-aliased edges.
#[derive(Debug, Clone)]
pub struct BorderKeyMatte {
    /// RGB distance from the backdrop that counts as fully foreground.
    pub key_tolerance: f32,
    pub foreground_threshold: u8,
    pub background_threshold: u8,
    pub erode_radius: u32,
    pub feather_sigma: f32,
}

impl Default for BorderKeyMatte {
    fn default() -> Self {
        Self {
            key_tolerance: 60.0,
            foreground_threshold: 240,
            background_threshold: 10,
            erode_radius: 2,
            feather_sigma: 1.0,
        }
    }
}

impl BorderKeyMatte {
    /// Mean colour of the outermost pixel ring.
    pub fn backdrop_color(img: &RgbaImage) -> [f32; 3] {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return [0.0; 3];
        }
        let mut sum = [0f64; 3];
        let mut count = 0u64;
        let mut add = |px: &Rgba<u8>| {
            for c in 0..3 {
                sum[c] += f64::from(px.0[c]);
            }
            count += 1;
        };
        for x in 0..w {
            add(img.get_pixel(x, 0));
            if h > 1 {
                add(img.get_pixel(x, h - 1));
            }
        }
        for y in 1..h.saturating_sub(1) {
            add(img.get_pixel(0, y));
            if w > 1 {
                add(img.get_pixel(w - 1, y));
            }
        }
        let n = count.max(1) as f64;
        [
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
        ]
    }

    fn ramp(&self, mask: u8) -> u8 {
        let lo = self.background_threshold;
        let hi = self.foreground_threshold;
        if mask >= hi {
            255
        } else if mask <= lo || hi <= lo {
            0
        } else {
            let t = f32::from(mask - lo) / f32::from(hi - lo);
            (t * 255.0).round() as u8
        }
    }
}

impl Matte for BorderKeyMatte {
    fn alpha_mask(&self, img: &RgbaImage) -> GrayImage {
        let backdrop = Self::backdrop_color(img);
        let tolerance = self.key_tolerance.max(1.0);

        let mut mask = GrayImage::new(img.width(), img.height());
        for (x, y, px) in img.enumerate_pixels() {
            let dist = (0..3)
                .map(|c| {
                    let d = f32::from(px.0[c]) - backdrop[c];
                    d * d
                })
                .sum::<f32>()
                .sqrt();
            let raw = (dist / tolerance * 255.0).clamp(0.0, 255.0) as u8;
            mask.put_pixel(x, y, Luma([self.ramp(raw)]));
        }

        let eroded = erode(&mask, self.erode_radius);
        if self.feather_sigma > 0.0 {
            image::imageops::blur(&eroded, self.feather_sigma)
        } else {
            eroded
        }
    }
}

/// Grayscale erosion with a square window, done as two separable passes.
pub fn erode(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let (w, h) = mask.dimensions();
    let r = radius as i64;

    let mut horizontal = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let lo = (x as i64 - r).max(0) as u32;
            let hi = (x as i64 + r).min(w as i64 - 1) as u32;
            let min = (lo..=hi).map(|sx| mask.get_pixel(sx, y).0[0]).min().unwrap_or(0);
            horizontal.put_pixel(x, y, Luma([min]));
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let lo = (y as i64 - r).max(0) as u32;
        let hi = (y as i64 + r).min(h as i64 - 1) as u32;
        for x in 0..w {
            let min = (lo..=hi)
                .map(|sy| horizontal.get_pixel(x, sy).0[0])
                .min()
                .unwrap_or(0);
            out.put_pixel(x, y, Luma([min]));
        }
    }
    out
}
