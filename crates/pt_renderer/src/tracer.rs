//! Progressive render driver.
//!
//! [`PathTracer`] owns the accumulation image and the render settings. The
//! caller drives it once per frame: react to window resizes and edits with
//! [`PathTracer::resize`], [`PathTracer::restart`] or
//! [`PathTracer::set_settings`], then call [`PathTracer::trace_paths`] to add
//! one more sample to every pixel.

use pt_math::Color;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::accel::Accelerator;
use crate::camera::{Camera, ScreenBasis};
use crate::error::{RenderError, RenderResult};
use crate::image::{accumulate, Image};
use crate::integrator::shade;
use crate::scene::Scene;
use crate::settings::Settings;

/// Render context for one viewer.
pub struct PathTracer {
    settings: Settings,
    image: Image,
    /// Dedicated workers when `settings.worker_threads > 0`
    pool: Option<ThreadPool>,
    /// Last window size passed to `resize`, before subsampling
    window_size: (u32, u32),
}

impl PathTracer {
    /// Create a renderer with an empty image. Call [`PathTracer::resize`]
    /// before the first pass.
    pub fn new(settings: Settings) -> RenderResult<Self> {
        settings.validate()?;
        Ok(Self {
            pool: build_pool(settings.worker_threads)?,
            settings,
            image: Image::default(),
            window_size: (0, 0),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    /// Reallocate the image for a window of the given size.
    ///
    /// The image is `width / subsampling` by `height / subsampling`. If that
    /// leaves no pixels the current image is kept and an error is returned.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let (w, h) = image_size(width, height, self.settings.subsampling)?;
        self.apply_size(width, height, w, h);
        Ok(())
    }

    fn apply_size(&mut self, width: u32, height: u32, w: u32, h: u32) {
        self.window_size = (width, height);
        self.image.resize(w, h);
        log::info!(
            "Resized render image to {}x{} (window {}x{}, subsampling {})",
            w,
            h,
            width,
            height,
            self.settings.subsampling
        );
    }

    /// Discard accumulated samples, e.g. after the camera or a material
    /// changed.
    pub fn restart(&mut self) {
        log::debug!(
            "Restarting accumulation after {} samples",
            self.image.number_of_samples()
        );
        self.image.restart();
    }

    /// Apply new settings.
    ///
    /// A subsampling change reallocates the image for the last window size;
    /// any other change affecting radiance restarts accumulation. On error
    /// nothing changes.
    pub fn set_settings(&mut self, settings: Settings) -> RenderResult<()> {
        settings.validate()?;

        let (width, height) = self.window_size;
        let reallocate = settings.subsampling != self.settings.subsampling && width > 0 && height > 0;
        let new_size = if reallocate {
            Some(image_size(width, height, settings.subsampling)?)
        } else {
            None
        };
        let pool = if settings.worker_threads != self.settings.worker_threads {
            Some(build_pool(settings.worker_threads)?)
        } else {
            None
        };

        let old = std::mem::replace(&mut self.settings, settings);
        if let Some(pool) = pool {
            self.pool = pool;
        }
        match new_size {
            Some((w, h)) => self.apply_size(width, height, w, h),
            None if settings.changes_radiance(&old) => self.restart(),
            None => {}
        }
        Ok(())
    }

    /// Add one sample to every pixel.
    ///
    /// Returns `false` without rendering when the image is empty or the
    /// sample cap has been reached.
    pub fn trace_paths<A: Accelerator>(&mut self, scene: &Scene<A>, camera: &Camera) -> bool {
        let cap = self.settings.max_paths_per_pixel;
        let n = self.image.number_of_samples();
        if self.image.is_empty() {
            return false;
        }
        if cap != 0 && n >= cap {
            log::debug!("Sample cap of {} paths per pixel reached", cap);
            return false;
        }

        let width = self.image.width();
        let height = self.image.height();
        let screen = camera.screen(self.settings.fov_degrees, width as f32 / height as f32);
        let settings = self.settings;

        let render = |data: &mut [Color]| {
            data.par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, pixel) in row.iter_mut().enumerate() {
                        let sample = sample_pixel(
                            scene, &screen, &settings, width, height, x as u32, y as u32, n,
                        );
                        *pixel = accumulate(*pixel, sample, n);
                    }
                });
        };

        match &self.pool {
            Some(pool) => pool.install(|| render(self.image.data_mut())),
            None => render(self.image.data_mut()),
        }

        self.image.finish_pass();
        log::debug!("Finished pass {}", self.image.number_of_samples());
        true
    }

    /// The sample the next pass will merge into pixel `(x, y)`.
    pub fn sample_pixel<A: Accelerator>(
        &self,
        scene: &Scene<A>,
        camera: &Camera,
        x: u32,
        y: u32,
    ) -> Color {
        let width = self.image.width();
        let height = self.image.height();
        let screen = camera.screen(self.settings.fov_degrees, width as f32 / height as f32);
        sample_pixel(
            scene,
            &screen,
            &self.settings,
            width,
            height,
            x,
            y,
            self.image.number_of_samples(),
        )
    }
}

/// Render image size for a window, or an error if it would be empty.
fn image_size(width: u32, height: u32, subsampling: u32) -> RenderResult<(u32, u32)> {
    let (w, h) = (width / subsampling, height / subsampling);
    if w == 0 || h == 0 {
        return Err(RenderError::InvalidSize {
            width,
            height,
            subsampling,
        });
    }
    Ok((w, h))
}

fn build_pool(worker_threads: usize) -> RenderResult<Option<ThreadPool>> {
    if worker_threads == 0 {
        return Ok(None);
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .thread_name(|i| format!("pt-worker-{}", i))
        .build()
        .map_err(|e| RenderError::ThreadPool(e.to_string()))?;
    log::info!("Render pool with {} threads", worker_threads);
    Ok(Some(pool))
}

/// Seed of the random stream for one pixel in one pass.
///
/// SplitMix64 finalizer over the combined inputs, so neighbouring pixels
/// and passes get unrelated streams.
fn pixel_seed(seed: u64, pass: u32, pixel: u64) -> u64 {
    let mut z = seed
        ^ (pass as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ pixel.wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[allow(clippy::too_many_arguments)]
fn sample_pixel<A: Accelerator>(
    scene: &Scene<A>,
    screen: &ScreenBasis,
    settings: &Settings,
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    pass: u32,
) -> Color {
    let pixel = y as u64 * width as u64 + x as u64;
    let mut rng = SmallRng::seed_from_u64(pixel_seed(settings.seed, pass, pixel));

    let (jx, jy) = if settings.jitter {
        (rng.gen::<f32>(), rng.gen::<f32>())
    } else {
        (0.0, 0.0)
    };
    let ray = screen.ray(
        (x as f32 + jx) / width as f32,
        (y as f32 + jy) / height as f32,
    );

    match scene.accel.intersect(&ray) {
        Some(hit) => shade(scene, &hit, settings.max_bounces, &mut rng),
        None => scene.environment.radiance(ray.direction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{Bvh, Geometry};
    use crate::environment::Environment;
    use pt_core::{Material, Mesh, PointLight};
    use pt_math::{Mat4, Vec3};

    fn test_scene() -> Scene<Bvh> {
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::parallelogram(Vec3::new(-5.0, 0.0, 4.0), Vec3::X * 10.0, Vec3::NEG_Z * 10.0),
            Material::new("floor", Color::splat(0.6)),
            Mat4::IDENTITY,
        );
        geometry.add_mesh(
            &Mesh::cuboid(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
            Material::new("box", Color::new(0.8, 0.3, 0.2))
                .with_reflectivity(0.5)
                .with_shininess(50.0),
            Mat4::IDENTITY,
        );
        let light = PointLight::new(Vec3::new(2.0, 8.0, 3.0), Color::ONE, 80.0);
        Scene::build(geometry, vec![light], Environment::constant(Color::new(0.3, 0.4, 0.6)))
            .unwrap()
    }

    fn test_camera() -> Camera {
        Camera::look_at(Vec3::new(0.0, 3.0, 8.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
    }

    fn tracer(settings: Settings) -> PathTracer {
        let mut tracer = PathTracer::new(settings).unwrap();
        tracer.resize(32, 24).unwrap();
        tracer
    }

    fn small_settings() -> Settings {
        Settings {
            subsampling: 2,
            max_bounces: 3,
            seed: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_image_is_mean_of_pass_samples() {
        let scene = test_scene();
        let camera = test_camera();
        let mut tracer = tracer(small_settings());
        let pixels = [(0, 0), (8, 6), (15, 11), (3, 10)];

        let mut sums = [Color::ZERO; 4];
        let passes = 6;
        for _ in 0..passes {
            for (sum, &(x, y)) in sums.iter_mut().zip(&pixels) {
                *sum += tracer.sample_pixel(&scene, &camera, x, y);
            }
            assert!(tracer.trace_paths(&scene, &camera));
        }

        assert_eq!(tracer.image().number_of_samples(), passes);
        for (sum, &(x, y)) in sums.iter().zip(&pixels) {
            let mean = *sum / passes as f32;
            let value = tracer.image().pixel(x, y);
            assert!(
                (value - mean).length() <= 1e-4 * mean.length().max(1.0),
                "pixel ({x}, {y}): {value} vs {mean}"
            );
        }
    }

    #[test]
    fn test_restart_matches_fresh_render() {
        let scene = test_scene();
        let camera = test_camera();

        let mut fresh = tracer(small_settings());
        fresh.trace_paths(&scene, &camera);

        let mut restarted = tracer(small_settings());
        for _ in 0..4 {
            restarted.trace_paths(&scene, &camera);
        }
        restarted.restart();
        assert_eq!(restarted.image().number_of_samples(), 0);
        restarted.trace_paths(&scene, &camera);

        assert_eq!(restarted.image().number_of_samples(), 1);
        assert_eq!(restarted.image().pixels(), fresh.image().pixels());
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let scene = test_scene();
        let camera = test_camera();

        let mut global = tracer(small_settings());
        let mut pooled = tracer(Settings {
            worker_threads: 3,
            ..small_settings()
        });
        for _ in 0..2 {
            global.trace_paths(&scene, &camera);
            pooled.trace_paths(&scene, &camera);
        }
        assert_eq!(global.image().pixels(), pooled.image().pixels());
    }

    #[test]
    fn test_resize_applies_subsampling() {
        let mut tracer = PathTracer::new(Settings::default()).unwrap();
        tracer.resize(801, 603).unwrap();
        assert_eq!(tracer.image().width(), 200);
        assert_eq!(tracer.image().height(), 150);
        assert_eq!(tracer.image().pixels().len(), 200 * 150);
        assert_eq!(tracer.image().number_of_samples(), 0);
    }

    #[test]
    fn test_resize_to_nothing_keeps_image() {
        let scene = test_scene();
        let camera = test_camera();
        let mut tracer = tracer(small_settings());
        tracer.trace_paths(&scene, &camera);
        let before = tracer.image().pixels().to_vec();

        let err = tracer.resize(1, 100).unwrap_err();
        assert!(matches!(err, RenderError::InvalidSize { width: 1, .. }));
        assert_eq!(tracer.image().width(), 16);
        assert_eq!(tracer.image().number_of_samples(), 1);
        assert_eq!(tracer.image().pixels(), before.as_slice());
        assert_eq!(tracer.window_size(), (32, 24));
    }

    #[test]
    fn test_sample_cap_stops_refinement() {
        let scene = test_scene();
        let camera = test_camera();
        let mut tracer = tracer(Settings {
            max_paths_per_pixel: 3,
            ..small_settings()
        });

        let results: Vec<bool> = (0..5).map(|_| tracer.trace_paths(&scene, &camera)).collect();
        assert_eq!(results, [true, true, true, false, false]);
        assert_eq!(tracer.image().number_of_samples(), 3);
    }

    #[test]
    fn test_empty_image_does_not_render() {
        let scene = test_scene();
        let mut tracer = PathTracer::new(Settings::default()).unwrap();
        assert!(!tracer.trace_paths(&scene, &test_camera()));
        assert_eq!(tracer.image().number_of_samples(), 0);
    }

    /// Every direction of this map has a distinct color.
    fn gradient_environment() -> Environment {
        let (w, h) = (16, 8);
        let pixels = (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                [x as f32 / w as f32, y as f32 / h as f32, 0.5, 1.0]
            })
            .collect();
        let map = pt_core::Texture::new(w, h, pixels, "gradient").unwrap();
        Environment::new(std::sync::Arc::new(map), 1.0)
    }

    fn sky_scene(environment: Environment) -> Scene<Bvh> {
        // Small quad far below so the whole view misses
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::parallelogram(Vec3::new(0.0, -50.0, 0.0), Vec3::X, Vec3::NEG_Z),
            Material::default(),
            Mat4::IDENTITY,
        );
        Scene::build(geometry, vec![], environment).unwrap()
    }

    #[test]
    fn test_miss_shows_environment() {
        let scene = sky_scene(gradient_environment());
        let camera = Camera::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 1.0, 0.3), Vec3::Y);
        let mut tracer = tracer(Settings {
            jitter: false,
            ..small_settings()
        });
        tracer.trace_paths(&scene, &camera);

        let image = tracer.image();
        let (w, h) = (image.width(), image.height());
        let screen = camera.screen(tracer.settings().fov_degrees, w as f32 / h as f32);
        for y in 0..h {
            for x in 0..w {
                let ray = screen.ray(x as f32 / w as f32, y as f32 / h as f32);
                let expected = scene.environment.radiance(ray.direction);
                let value = image.pixel(x, y);
                assert!(
                    (value - expected).length() < 1e-5,
                    "pixel ({x}, {y}): {value} vs {expected}"
                );
            }
        }
        // The view spans more than one color
        assert_ne!(image.pixel(0, 0), image.pixel(w - 1, h - 1));
    }

    #[test]
    fn test_negative_environment_gives_black_pixels() {
        let mut environment = Environment::constant(Color::ONE);
        environment.multiplier = -1.0;
        let scene = sky_scene(environment);
        let camera = Camera::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y, Vec3::Z);
        let mut tracer = tracer(small_settings());
        tracer.trace_paths(&scene, &camera);

        assert!(tracer.image().pixels().iter().all(|p| *p == Color::ZERO));
    }

    #[test]
    fn test_rows_start_at_bottom() {
        // Ground below the horizon, black sky above
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::parallelogram(Vec3::new(-50.0, 0.0, 50.0), Vec3::X * 100.0, Vec3::NEG_Z * 100.0),
            Material::new("lamp", Color::ZERO).with_emission(Color::ONE),
            Mat4::IDENTITY,
        );
        let scene: Scene = Scene::build(geometry, vec![], Environment::black()).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, Vec3::Y);

        let mut tracer = tracer(Settings {
            jitter: false,
            ..small_settings()
        });
        tracer.trace_paths(&scene, &camera);

        let image = tracer.image();
        assert_eq!(image.pixel(8, 0), Color::ONE);
        assert_eq!(image.pixel(8, image.height() - 1), Color::ZERO);
    }

    #[test]
    fn test_set_settings() {
        let scene = test_scene();
        let camera = test_camera();
        let mut tracer = tracer(small_settings());
        tracer.trace_paths(&scene, &camera);
        tracer.trace_paths(&scene, &camera);

        // Raising the cap keeps the accumulated samples
        tracer
            .set_settings(Settings {
                max_paths_per_pixel: 10,
                ..small_settings()
            })
            .unwrap();
        assert_eq!(tracer.image().number_of_samples(), 2);

        // Changing the bounce depth restarts
        tracer
            .set_settings(Settings {
                max_bounces: 1,
                ..small_settings()
            })
            .unwrap();
        assert_eq!(tracer.image().number_of_samples(), 0);

        // Changing subsampling reallocates for the remembered window
        tracer
            .set_settings(Settings {
                subsampling: 4,
                ..small_settings()
            })
            .unwrap();
        assert_eq!((tracer.image().width(), tracer.image().height()), (8, 6));

        // Invalid settings are rejected and leave the old ones in place
        assert!(tracer
            .set_settings(Settings {
                subsampling: 0,
                ..small_settings()
            })
            .is_err());
        assert_eq!(tracer.settings().subsampling, 4);

        // A subsampling that leaves no pixels is rolled back
        assert!(tracer
            .set_settings(Settings {
                subsampling: 64,
                ..small_settings()
            })
            .is_err());
        assert_eq!(tracer.settings().subsampling, 4);
        assert_eq!(tracer.image().width(), 8);
    }

    #[test]
    fn test_rejected_settings_keep_pool() {
        let scene = test_scene();
        let camera = test_camera();
        let mut tracer = tracer(small_settings());
        tracer.trace_paths(&scene, &camera);

        let err = tracer
            .set_settings(Settings {
                subsampling: 64,
                worker_threads: 3,
                max_bounces: 1,
                ..small_settings()
            })
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidSize { subsampling: 64, .. }));
        assert_eq!(*tracer.settings(), small_settings());
        assert!(tracer.pool.is_none());
        assert_eq!(tracer.image().number_of_samples(), 1);

        // A valid thread count change swaps the pool and keeps the samples
        tracer
            .set_settings(Settings {
                worker_threads: 2,
                ..small_settings()
            })
            .unwrap();
        let threads = tracer.pool.as_ref().map(|p| p.current_num_threads());
        assert_eq!(threads, Some(2));
        assert_eq!(tracer.image().number_of_samples(), 1);
    }

    #[test]
    fn test_pixel_seed_spreads() {
        let a = pixel_seed(0, 0, 0);
        assert_ne!(a, pixel_seed(0, 0, 1));
        assert_ne!(a, pixel_seed(0, 1, 0));
        assert_ne!(a, pixel_seed(1, 0, 0));
    }
}
