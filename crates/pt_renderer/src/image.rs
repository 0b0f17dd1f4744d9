//! Progressive accumulation buffer.

use pt_math::Color;

/// Running mean of the radiance samples of every pixel.
///
/// Row 0 is the bottom row of the screen. `number_of_samples` counts the
/// completed passes merged into the current data.
#[derive(Clone, Debug, Default)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<Color>,
    number_of_samples: u32,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Color::ZERO; (width as usize) * (height as usize)],
            number_of_samples: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn number_of_samples(&self) -> u32 {
        self.number_of_samples
    }

    pub fn pixels(&self) -> &[Color] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.data[(y * self.width + x) as usize]
    }

    /// Raw RGB floats for uploading to a texture.
    pub fn as_f32_slice(&self) -> &[f32] {
        bytemuck::cast_slice(&self.data)
    }

    /// Reallocate to a new size and restart accumulation.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    /// Forget the accumulated samples.
    ///
    /// The pixel data is left as is; the next pass overwrites it because a
    /// merge with zero prior samples ignores the old value.
    pub fn restart(&mut self) {
        self.number_of_samples = 0;
    }

    pub(crate) fn data_mut(&mut self) -> &mut [Color] {
        &mut self.data
    }

    pub(crate) fn finish_pass(&mut self) {
        self.number_of_samples += 1;
    }

    /// 8-bit RGBA with gamma 2.0, top row first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let width = self.width as usize;
        let mut out = Vec::with_capacity(self.data.len() * 4);
        if width == 0 {
            return out;
        }
        for row in self.data.chunks_exact(width).rev() {
            for color in row {
                out.extend_from_slice(&color_to_rgba(*color));
            }
        }
        out
    }
}

/// Merge one new sample into a running mean of `n` earlier samples.
#[inline]
pub fn accumulate(old: Color, sample: Color, n: u32) -> Color {
    let n = n as f32;
    old * (n / (n + 1.0)) + sample / (n + 1.0)
}

/// Replace non-finite channels with zero and clamp negatives.
pub(crate) fn sanitize(c: Color) -> Color {
    let fix = |x: f32| if x.is_finite() { x.max(0.0) } else { 0.0 };
    Color::new(fix(c.x), fix(c.y), fix(c.z))
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let encode = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0) + 0.5) as u8;
    [encode(color.x), encode(color.y), encode(color.z), 255]
}
