//! Path tracing radiance estimator.
//!
//! Every vertex of a path gathers direct light from all point lights through
//! shadow rays and adds its own emission. The path then continues in a
//! direction sampled from the surface BSDF until it leaves the scene, runs
//! out of bounces or loses all throughput.

use pt_math::{Color, Ray};
use rand::RngCore;

use crate::accel::Accelerator;
use crate::brdf::Bsdf;
use crate::hit::Intersection;
use crate::image::sanitize;
use crate::scene::Scene;
use crate::RAY_EPSILON;

/// Densities below this terminate the path.
const PDF_EPSILON: f32 = 1e-8;

/// Radiance arriving along `ray`.
///
/// Returns black when the primary ray misses; the caller decides what a
/// miss shows.
pub fn li<A: Accelerator>(
    scene: &Scene<A>,
    ray: &Ray,
    max_bounces: u32,
    rng: &mut dyn RngCore,
) -> Color {
    match scene.accel.intersect(ray) {
        Some(hit) => shade(scene, &hit, max_bounces, rng),
        None => Color::ZERO,
    }
}

/// Radiance leaving `hit` toward `hit.wo`.
///
/// `max_bounces = 0` gives direct lighting plus emission. The result is
/// always finite and non-negative.
pub fn shade<'s, A: Accelerator>(
    scene: &'s Scene<A>,
    hit: &Intersection<'s>,
    max_bounces: u32,
    rng: &mut dyn RngCore,
) -> Color {
    let mut radiance = Color::ZERO;
    let mut throughput = Color::ONE;
    let mut hit = *hit;

    for bounce in 0..=max_bounces {
        let bsdf = Bsdf::new(hit.material, hit.uv);

        radiance += throughput * direct_lighting(scene, &hit, &bsdf);
        radiance += throughput * bsdf.emitted();

        if bounce == max_bounces {
            break;
        }

        let n = hit.shading_normal;
        let Some(sample) = bsdf.sample(hit.wo, n, rng) else {
            break;
        };
        if sample.pdf < PDF_EPSILON {
            break;
        }

        throughput *= sample.f * sample.wi.dot(n).abs() / sample.pdf;
        if !throughput.is_finite() || throughput.max_element() <= 0.0 {
            break;
        }

        let ray = Ray::new(hit.offset_origin(sample.wi), sample.wi);
        match scene.accel.intersect(&ray) {
            Some(next) => hit = next,
            None => {
                radiance += throughput * scene.environment.radiance(ray.direction);
                break;
            }
        }
    }

    sanitize(radiance)
}

/// Light arriving directly from the point lights and reflected toward `wo`.
fn direct_lighting<A: Accelerator>(scene: &Scene<A>, hit: &Intersection, bsdf: &Bsdf) -> Color {
    let n = hit.shading_normal;
    let mut sum = Color::ZERO;

    for light in &scene.lights {
        let to_light = light.position - hit.position;
        let distance = to_light.length();
        if distance <= RAY_EPSILON {
            continue;
        }

        let wi = to_light / distance;
        let cos_theta = wi.dot(n);
        if cos_theta <= 0.0 {
            continue;
        }

        let origin = hit.offset_origin(wi);
        let shadow_ray = Ray::from_unit(origin, wi);
        if scene
            .accel
            .occluded(&shadow_ray, (light.position - origin).length())
        {
            continue;
        }

        sum += bsdf.evaluate(wi, hit.wo, n) * light.radiance_at_distance(distance) * cos_theta;
    }

    sum
}
