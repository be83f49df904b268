//! Place a try-on render onto a generated background scene.
//!
//! The subject is cut out of its studio backdrop, scaled down, grounded
//! with a soft elliptical shadow, brightness-matched to the scene and
//! alpha-composited. The result is a JPEG the size of the original render.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::CoreError;
use crate::imaging::{encode_jpeg, load_image};
use crate::matte::Matte;

/// Tunables for [`composite_on_background`].
#[derive(Debug, Clone)]
pub struct CompositeParams {
    /// Zoom applied to the background before it is fitted to the render.
    pub background_zoom: f32,
    /// Scale of the subject relative to the render size.
    pub subject_scale: f32,
    /// Alpha values above this are snapped to fully opaque.
    pub alpha_snap_threshold: u8,
    /// Shadow ellipse width as a fraction of the subject width.
    pub shadow_width: f32,
    /// Shadow ellipse height as a fraction of the subject height.
    pub shadow_height: f32,
    /// Top edge of the shadow ellipse as a fraction of the subject height.
    pub shadow_top: f32,
    pub shadow_alpha: u8,
    pub shadow_blur_sigma: f32,
    /// Vertical placement of the subject as a fraction of the scene height.
    pub vertical_offset: f32,
    pub brightness_min: f32,
    pub brightness_max: f32,
    pub jpeg_quality: u8,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            background_zoom: 1.35,
            subject_scale: 0.78,
            alpha_snap_threshold: 200,
            shadow_width: 0.55,
            shadow_height: 0.08,
            shadow_top: 0.88,
            shadow_alpha: 120,
            shadow_blur_sigma: 18.0,
            vertical_offset: 0.14,
            brightness_min: 0.85,
            brightness_max: 1.15,
            jpeg_quality: 92,
        }
    }
}

/// Composite the subject of `foreground` onto `background`; returns JPEG bytes.
pub fn composite_on_background(
    foreground: &[u8],
    background: &[u8],
    matte: &dyn Matte,
    params: &CompositeParams,
) -> Result<Vec<u8>, CoreError> {
    let render = load_image(foreground)?;
    let scene = load_image(background)?;
    composite_images(&render, &scene, matte, params)
}

/// [`composite_on_background`] over already-decoded images.
pub fn composite_images(
    render: &DynamicImage,
    scene: &DynamicImage,
    matte: &dyn Matte,
    params: &CompositeParams,
) -> Result<Vec<u8>, CoreError> {
    let render = render.to_rgba8();
    let (width, height) = render.dimensions();
    if width == 0 || height == 0 {
        return Err(CoreError::Validation("Foreground image is empty".into()));
    }

    let cutout = matte.cut_out(&render);
    let mut scene = fit_background(&scene.to_rgba8(), width, height, params.background_zoom);

    let mut subject = scale(&cutout, params.subject_scale);
    snap_alpha(&mut subject, params.alpha_snap_threshold);

    let shadow = ground_shadow(subject.width(), subject.height(), params);

    let x = (i64::from(scene.width()) - i64::from(subject.width())) / 2;
    let y = (scene.height() as f32 * params.vertical_offset) as i64;

    if let (Some(scene_luma), Some(subject_luma)) = (mean_luma(&scene), mean_luma(&subject)) {
        if subject_luma > 0.0 {
            let factor = brightness_factor(scene_luma, subject_luma, params);
            adjust_brightness(&mut subject, factor);
        }
    }

    imageops::overlay(&mut scene, &shadow, x, y);
    imageops::overlay(&mut scene, &subject, x, y);

    let flattened = DynamicImage::ImageRgba8(scene).to_rgb8();
    encode_jpeg(&flattened, params.jpeg_quality)
}

/// Zoom the scene, then centre-crop and resize it to exactly `width x height`.
pub fn fit_background(scene: &RgbaImage, width: u32, height: u32, zoom: f32) -> RgbaImage {
    let zoomed = scale(scene, zoom);
    DynamicImage::ImageRgba8(zoomed)
        .resize_to_fill(width, height, FilterType::Lanczos3)
        .to_rgba8()
}

fn scale(img: &RgbaImage, factor: f32) -> RgbaImage {
    let w = ((img.width() as f32 * factor) as u32).max(1);
    let h = ((img.height() as f32 * factor) as u32).max(1);
    imageops::resize(img, w, h, FilterType::Lanczos3)
}

/// Snap nearly-opaque alpha to fully opaque; leaves soft edges alone.
pub fn snap_alpha(img: &mut RgbaImage, threshold: u8) {
    for px in img.pixels_mut() {
        if px.0[3] > threshold {
            px.0[3] = 255;
        }
    }
}

/// Blurred elliptical shadow on a transparent layer of the subject's size.
pub fn ground_shadow(width: u32, height: u32, params: &CompositeParams) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    let ew = (width as f32 * params.shadow_width) as u32;
    let eh = (height as f32 * params.shadow_height) as u32;
    let ex = (width - ew.min(width)) / 2;
    let ey = (height as f32 * params.shadow_top) as u32;
    fill_ellipse(&mut layer, ex, ey, ew, eh, Rgba([0, 0, 0, params.shadow_alpha]));
    if params.shadow_blur_sigma > 0.0 {
        imageops::blur(&layer, params.shadow_blur_sigma)
    } else {
        layer
    }
}

/// Fill the ellipse inscribed in the box at (`x`, `y`) of size `w x h`.
///
/// Parts of the box outside the image are clipped.
pub fn fill_ellipse(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    if w == 0 || h == 0 {
        return;
    }
    let rx = w as f32 / 2.0;
    let ry = h as f32 / 2.0;
    let cx = x as f32 + rx;
    let cy = y as f32 + ry;
    let x_end = x.saturating_add(w).min(img.width());
    let y_end = y.saturating_add(h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            let dx = (px as f32 + 0.5 - cx) / rx;
            let dy = (py as f32 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                img.put_pixel(px, py, color);
            }
        }
    }
}

/// ITU-R 601 luma, alpha-weighted so transparent pixels do not count.
///
/// Returns `None` for a fully transparent image.
pub fn mean_luma(img: &RgbaImage) -> Option<f32> {
    let mut weighted = 0f64;
    let mut total_alpha = 0f64;
    for px in img.pixels() {
        let [r, g, b, a] = px.0;
        let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        let alpha = f64::from(a) / 255.0;
        weighted += luma * alpha;
        total_alpha += alpha;
    }
    (total_alpha > 0.0).then(|| (weighted / total_alpha) as f32)
}

/// Scene-to-subject luma ratio, clamped to the configured band.
pub fn brightness_factor(scene_luma: f32, subject_luma: f32, params: &CompositeParams) -> f32 {
    (scene_luma / subject_luma).clamp(params.brightness_min, params.brightness_max)
}

/// Multiply RGB by `factor`, leaving alpha untouched.
pub fn adjust_brightness(img: &mut RgbaImage, factor: f32) {
    for px in img.pixels_mut() {
        for c in 0..3 {
            px.0[c] = (f32::from(px.0[c]) * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}
