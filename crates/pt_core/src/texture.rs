//! Texture loading for materials and environment maps.
//!
//! Images are decoded once at scene load into linear float RGBA so the
//! renderer can sample them from any thread without further conversion.

use std::path::Path;

use image::DynamicImage;
use pt_math::Color;
use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture: {0}")]
    LoadError(String),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Texture has no pixels: {0}")]
    Empty(String),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded texture with pixel data.
///
/// Stores pixels in linear RGBA float format, row-major, with row 0 at the
/// top of the image.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data, [R, G, B, A] per pixel
    pub pixels: Vec<[f32; 4]>,

    /// Original file path (for debugging)
    pub path: String,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<[f32; 4]>,
        path: impl Into<String>,
    ) -> TextureResult<Self> {
        let path = path.into();
        if width == 0 || height == 0 || pixels.len() != (width * height) as usize {
            return Err(TextureError::Empty(path));
        }
        Ok(Self {
            width,
            height,
            pixels,
            path,
        })
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![[color.x, color.y, color.z, 1.0]],
            path: "<solid>".to_string(),
        }
    }

    /// Convert a decoded image.
    ///
    /// Float images (HDR, EXR) are taken as linear radiance; 8/16-bit images
    /// are assumed to be sRGB encoded.
    pub fn from_image(img: DynamicImage, path: impl Into<String>) -> TextureResult<Self> {
        let (width, height) = (img.width(), img.height());
        let pixels: Vec<[f32; 4]> = match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                img.into_rgba32f().pixels().map(|p| p.0).collect()
            }
            _ => img
                .to_rgba8()
                .pixels()
                .map(|p| {
                    [
                        srgb_to_linear(p[0]),
                        srgb_to_linear(p[1]),
                        srgb_to_linear(p[2]),
                        p[3] as f32 / 255.0, // Alpha is linear
                    ]
                })
                .collect(),
        };
        Self::new(width, height, pixels, path)
    }

    /// Sample at image coordinates with bilinear filtering.
    ///
    /// `u` runs left to right and wraps around; `v` runs top to bottom and is
    /// clamped at the first and last rows. Texel centers sit at half-integer
    /// positions.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        let w = self.width as f32;
        let h = self.height as f32;

        let x = u.rem_euclid(1.0) * w - 0.5;
        let y = (v.clamp(0.0, 1.0) * h - 0.5).clamp(0.0, h - 1.0);

        let x_floor = x.floor();
        let y_floor = y.floor();
        let fx = x - x_floor;
        let fy = y - y_floor;

        let x0 = (x_floor as i64).rem_euclid(self.width as i64) as u32;
        let x1 = (x0 + 1) % self.width;
        let y0 = y_floor as u32;
        let y1 = (y0 + 1).min(self.height - 1);

        let p00 = self.texel(x0, y0);
        let p10 = self.texel(x1, y0);
        let p01 = self.texel(x0, y1);
        let p11 = self.texel(x1, y1);

        let top = p00 * (1.0 - fx) + p10 * fx;
        let bottom = p01 * (1.0 - fx) + p11 * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// RGB of the texel at integer coordinates.
    pub fn texel(&self, x: u32, y: u32) -> Color {
        let idx = (y * self.width + x) as usize;
        self.pixels
            .get(idx)
            .map(|p| Color::new(p[0], p[1], p[2]))
            .unwrap_or(Color::ZERO)
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

/// Load a texture from a file path.
pub fn load_texture(path: impl AsRef<Path>) -> TextureResult<Texture> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| {
        TextureError::LoadError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let texture = Texture::from_image(img, path.to_string_lossy())?;
    log::info!(
        "Loaded texture: {} ({}x{}, {:.1} KB)",
        path.display(),
        texture.width,
        texture.height,
        texture.size_bytes() as f32 / 1024.0
    );
    Ok(texture)
}

/// Decode a texture from an in-memory encoded image (PNG, HDR, ...).
pub fn load_texture_from_memory(bytes: &[u8], name: &str) -> TextureResult<Texture> {
    let img = image::load_from_memory(bytes)?;
    Texture::from_image(img, name)
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, Rgb32FImage, RgbImage};
    use std::io::Cursor;

    fn two_by_two() -> Texture {
        // Top row red/green, bottom row blue/white
        Texture::new(
            2,
            2,
            vec![
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0, 1.0],
                [1.0, 1.0, 1.0, 1.0],
            ],
            "<test>",
        )
        .unwrap()
    }

    #[test]
    fn test_solid_color_texture() {
        let tex = Texture::solid_color(Color::new(1.0, 0.5, 0.0));
        assert_eq!(tex.width, 1);
        assert_eq!(tex.height, 1);

        let sample = tex.sample(0.5, 0.5);
        assert!((sample - Color::new(1.0, 0.5, 0.0)).length() < 1e-6);
        let sample = tex.sample(0.99, 0.0);
        assert!((sample - Color::new(1.0, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_sample_texel_centers() {
        let tex = two_by_two();
        assert!((tex.sample(0.25, 0.25) - Color::new(1.0, 0.0, 0.0)).length() < 1e-6);
        assert!((tex.sample(0.75, 0.25) - Color::new(0.0, 1.0, 0.0)).length() < 1e-6);
        assert!((tex.sample(0.25, 0.75) - Color::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_sample_bilinear_blend() {
        let tex = two_by_two();
        // Halfway between the two top texels
        let c = tex.sample(0.5, 0.25);
        assert!((c - Color::new(0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_sample_wraps_u_clamps_v() {
        let tex = two_by_two();
        // u = 0 sits between the last and first column
        let c = tex.sample(0.0, 0.25);
        assert!((c - Color::new(0.5, 0.5, 0.0)).length() < 1e-6);
        // v = 0 clamps to the top row
        let c = tex.sample(0.25, 0.0);
        assert!((c - Color::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_empty_texture_rejected() {
        assert!(matches!(
            Texture::new(0, 4, vec![], "empty"),
            Err(TextureError::Empty(_))
        ));
        assert!(Texture::new(2, 2, vec![[0.0; 4]; 3], "short").is_err());
    }

    #[test]
    fn test_float_image_stays_linear() {
        let img = Rgb32FImage::from_pixel(1, 1, Rgb([4.0, 0.5, 0.25]));
        let tex = Texture::from_image(DynamicImage::ImageRgb32F(img), "hdr").unwrap();
        assert_eq!(tex.texel(0, 0), Color::new(4.0, 0.5, 0.25));
    }

    #[test]
    fn test_load_from_memory_png() {
        let _ = env_logger::builder().is_test(true).try_init();
        let img = RgbImage::from_pixel(3, 2, Rgb([255, 0, 128]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();

        let tex = load_texture_from_memory(bytes.get_ref(), "mem.png").unwrap();
        assert_eq!((tex.width, tex.height), (3, 2));
        let c = tex.texel(2, 1);
        assert!((c.x - 1.0).abs() < 1e-6);
        assert_eq!(c.y, 0.0);
        assert!((c.z - srgb_to_linear(128)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let _ = env_logger::builder().is_test(true).try_init();
        let err = load_texture("/definitely/not/here.hdr").unwrap_err();
        assert!(matches!(err, TextureError::LoadError(_)));
    }

    #[test]
    fn test_srgb_to_linear() {
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }
}
