//! Material lobes and the composite BSDF.
//!
//! All directions are world space and point away from the surface: `wo`
//! toward the viewer, `wi` toward the light. `n` is the shading normal on the
//! viewer's side.
//!
//! The glossy lobes use a normalized Blinn-Phong microfacet distribution with
//! the Cook-Torrance masking term and Schlick's Fresnel approximation.

use std::f32::consts::PI;

use pt_core::Material;
use pt_math::{Color, Vec3};
use rand::{Rng, RngCore};

use crate::sampling::{cosine_sample_hemisphere, reflect, spherical_direction};

/// Cosines below this are treated as grazing and contribute nothing.
const COS_EPSILON: f32 = 1e-6;

/// A direction drawn from a lobe or BSDF.
#[derive(Clone, Copy, Debug)]
pub struct BsdfSample {
    pub wi: Vec3,
    /// BSDF value for (wi, wo)
    pub f: Color,
    /// Density of `wi`, or the discrete probability for delta lobes
    pub pdf: f32,
    /// Sampled from a delta distribution (never returned by `evaluate`)
    pub is_delta: bool,
}

/// One scattering lobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lobe {
    /// Lambertian reflection.
    Diffuse { albedo: Color },
    /// Fresnel blend of a tinted glossy layer over a diffuse base.
    Dielectric {
        albedo: Color,
        specular: Color,
        shininess: f32,
        fresnel: f32,
    },
    /// Glossy reflection tinted by the base color.
    Metal {
        color: Color,
        shininess: f32,
        fresnel: f32,
    },
    /// Thin-surface pass-through.
    Transmission { tint: Color },
    /// Emits light and reflects nothing.
    Emissive { radiance: Color },
}

impl Lobe {
    /// BSDF value for the pair of directions.
    pub fn evaluate(&self, wi: Vec3, wo: Vec3, n: Vec3) -> Color {
        match *self {
            Lobe::Diffuse { albedo } => {
                if wi.dot(n) <= 0.0 || wo.dot(n) <= 0.0 {
                    return Color::ZERO;
                }
                albedo / PI
            }
            Lobe::Dielectric {
                albedo,
                specular,
                shininess,
                fresnel,
            } => {
                if wi.dot(n) <= 0.0 || wo.dot(n) <= 0.0 {
                    return Color::ZERO;
                }
                let wh = (wi + wo).normalize();
                let f = schlick_fresnel(fresnel, wh.dot(wi));
                f * specular * microfacet_brdf(wi, wo, n, shininess) + (1.0 - f) * albedo / PI
            }
            Lobe::Metal {
                color,
                shininess,
                fresnel,
            } => {
                if wi.dot(n) <= 0.0 || wo.dot(n) <= 0.0 {
                    return Color::ZERO;
                }
                let wh = (wi + wo).normalize();
                schlick_fresnel(fresnel, wh.dot(wi)) * color * microfacet_brdf(wi, wo, n, shininess)
            }
            Lobe::Transmission { .. } | Lobe::Emissive { .. } => Color::ZERO,
        }
    }

    /// Density with which `sample` would produce `wi`.
    ///
    /// Zero for delta and emissive lobes.
    pub fn pdf(&self, wi: Vec3, wo: Vec3, n: Vec3) -> f32 {
        match *self {
            Lobe::Diffuse { .. } => diffuse_pdf(wi, n),
            Lobe::Dielectric { shininess, .. } => {
                0.5 * microfacet_pdf(wi, wo, n, shininess) + 0.5 * diffuse_pdf(wi, n)
            }
            Lobe::Metal { shininess, .. } => microfacet_pdf(wi, wo, n, shininess),
            Lobe::Transmission { .. } | Lobe::Emissive { .. } => 0.0,
        }
    }

    /// Draw an incident direction for `wo`.
    ///
    /// Returns `None` when the drawn direction carries no energy (below the
    /// surface, zero density).
    pub fn sample(&self, wo: Vec3, n: Vec3, rng: &mut dyn RngCore) -> Option<BsdfSample> {
        let wi = match *self {
            Lobe::Diffuse { .. } => cosine_sample_hemisphere(n, rng),
            Lobe::Dielectric { shininess, .. } => {
                if rng.gen::<f32>() < 0.5 {
                    sample_microfacet(wo, n, shininess, rng)?
                } else {
                    cosine_sample_hemisphere(n, rng)
                }
            }
            Lobe::Metal { shininess, .. } => sample_microfacet(wo, n, shininess, rng)?,
            Lobe::Transmission { tint } => {
                let wi = -wo;
                let cos = wi.dot(n).abs();
                if cos < COS_EPSILON {
                    return None;
                }
                return Some(BsdfSample {
                    wi,
                    f: tint / cos,
                    pdf: 1.0,
                    is_delta: true,
                });
            }
            Lobe::Emissive { .. } => return None,
        };

        if wo.dot(n) <= 0.0 || wi.dot(n) <= COS_EPSILON {
            return None;
        }
        let pdf = self.pdf(wi, wo, n);
        if pdf <= 0.0 {
            return None;
        }

        Some(BsdfSample {
            wi,
            f: self.evaluate(wi, wo, n),
            pdf,
            is_delta: false,
        })
    }

    /// Radiance emitted by the lobe.
    pub fn emitted(&self) -> Color {
        match *self {
            Lobe::Emissive { radiance } => radiance,
            _ => Color::ZERO,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Lobe::Transmission { .. })
    }
}

/// Weighted mix of lobes built from a [`Material`] at one shading point.
///
/// Weights always sum to one, so the weight doubles as the probability of
/// picking a lobe when sampling.
#[derive(Clone, Copy, Debug)]
pub struct Bsdf {
    lobes: [(f32, Lobe); 4],
    emission: Lobe,
}

impl Bsdf {
    /// Build the BSDF for `material` at texture coordinates `uv`.
    ///
    /// Parameters are clamped again here so values edited after
    /// construction can never produce negative radiance.
    pub fn new(material: &Material, uv: [f32; 2]) -> Self {
        let reflectivity = clamp_unit(material.reflectivity);
        let metalness = clamp_unit(material.metalness);
        let fresnel = clamp_unit(material.fresnel);
        let transparency = clamp_unit(material.transparency);
        let shininess = if material.shininess.is_finite() {
            material.shininess.max(0.0)
        } else {
            0.0
        };

        let albedo = non_negative(material.diffuse_at(uv));
        let specular = non_negative(material.specular_reflectance);
        let opaque = 1.0 - transparency;

        Self {
            lobes: [
                ((1.0 - reflectivity) * opaque, Lobe::Diffuse { albedo }),
                (
                    reflectivity * (1.0 - metalness) * opaque,
                    Lobe::Dielectric {
                        albedo,
                        specular,
                        shininess,
                        fresnel,
                    },
                ),
                (
                    reflectivity * metalness * opaque,
                    Lobe::Metal {
                        color: albedo,
                        shininess,
                        fresnel,
                    },
                ),
                (transparency, Lobe::Transmission { tint: albedo }),
            ],
            emission: Lobe::Emissive {
                radiance: non_negative(material.emission),
            },
        }
    }

    /// Sum of the weighted non-delta lobes.
    pub fn evaluate(&self, wi: Vec3, wo: Vec3, n: Vec3) -> Color {
        self.lobes
            .iter()
            .filter(|(w, _)| *w > 0.0)
            .map(|(w, lobe)| *w * lobe.evaluate(wi, wo, n))
            .sum()
    }

    /// Mixture density of the non-delta lobes.
    pub fn pdf(&self, wi: Vec3, wo: Vec3, n: Vec3) -> f32 {
        self.lobes
            .iter()
            .filter(|(w, _)| *w > 0.0)
            .map(|(w, lobe)| *w * lobe.pdf(wi, wo, n))
            .sum()
    }

    /// Pick a lobe by weight and sample it.
    ///
    /// For glossy and diffuse picks the returned value and density cover the
    /// whole mixture, so `f * cos / pdf` is an unbiased throughput update.
    pub fn sample(&self, wo: Vec3, n: Vec3, rng: &mut dyn RngCore) -> Option<BsdfSample> {
        let total: f32 = self.lobes.iter().map(|(w, _)| *w).sum();
        if total <= 0.0 {
            return None;
        }

        let mut pick = rng.gen::<f32>() * total;
        let (weight, lobe) = self
            .lobes
            .iter()
            .filter(|(w, _)| *w > 0.0)
            .find(|(w, _)| {
                pick -= *w;
                pick < 0.0
            })
            .or_else(|| self.lobes.iter().rev().find(|(w, _)| *w > 0.0))?;

        let sample = lobe.sample(wo, n, rng)?;
        if sample.is_delta {
            return Some(BsdfSample {
                f: sample.f * *weight,
                pdf: sample.pdf * *weight,
                ..sample
            });
        }

        let pdf = self.pdf(sample.wi, wo, n);
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            f: self.evaluate(sample.wi, wo, n),
            pdf,
            ..sample
        })
    }

    pub fn emitted(&self) -> Color {
        self.emission.emitted()
    }

    /// The weighted lobes, in diffuse, dielectric, metal, transmission order.
    pub fn lobes(&self) -> &[(f32, Lobe)] {
        &self.lobes
    }
}

fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

fn non_negative(c: Color) -> Color {
    if c.is_finite() {
        c.max(Color::ZERO)
    } else {
        Color::ZERO
    }
}

/// Schlick weight `(1 - cos)^5`.
#[inline]
fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick Fresnel approximation with reflectance `r0` at normal incidence.
#[inline]
fn schlick_fresnel(r0: f32, cos_theta: f32) -> f32 {
    r0 + (1.0 - r0) * schlick_weight(cos_theta)
}

#[inline]
fn diffuse_pdf(wi: Vec3, n: Vec3) -> f32 {
    wi.dot(n).max(0.0) / PI
}

/// Normalized Blinn-Phong distribution.
#[inline]
fn blinn_phong_d(n_dot_h: f32, shininess: f32) -> f32 {
    (shininess + 2.0) / (2.0 * PI) * n_dot_h.max(0.0).powf(shininess)
}

/// Microfacet reflection without the Fresnel factor.
fn microfacet_brdf(wi: Vec3, wo: Vec3, n: Vec3, shininess: f32) -> f32 {
    let n_dot_wi = wi.dot(n);
    let n_dot_wo = wo.dot(n);
    if n_dot_wi <= COS_EPSILON || n_dot_wo <= COS_EPSILON {
        return 0.0;
    }

    let wh = (wi + wo).normalize();
    let n_dot_wh = n.dot(wh);
    let wo_dot_wh = wo.dot(wh);
    if wo_dot_wh <= 0.0 {
        return 0.0;
    }

    let d = blinn_phong_d(n_dot_wh, shininess);
    let g = 1.0_f32
        .min(2.0 * n_dot_wh * n_dot_wo / wo_dot_wh)
        .min(2.0 * n_dot_wh * n_dot_wi / wo_dot_wh);
    d * g / (4.0 * n_dot_wo * n_dot_wi)
}

/// Density of reflecting `wo` about a half vector drawn from
/// `cos(theta_h)^(s+1)`.
fn microfacet_pdf(wi: Vec3, wo: Vec3, n: Vec3, shininess: f32) -> f32 {
    if wi.dot(n) <= 0.0 {
        return 0.0;
    }
    let wh = (wi + wo).normalize_or_zero();
    let wo_dot_wh = wo.dot(wh);
    let n_dot_wh = n.dot(wh);
    if wo_dot_wh <= 0.0 || n_dot_wh <= 0.0 {
        return 0.0;
    }
    (shininess + 1.0) * n_dot_wh.powf(shininess) / (2.0 * PI * 4.0 * wo_dot_wh)
}

fn sample_microfacet(wo: Vec3, n: Vec3, shininess: f32, rng: &mut dyn RngCore) -> Option<Vec3> {
    let cos_theta_h = rng.gen::<f32>().powf(1.0 / (shininess + 1.0));
    let wh = spherical_direction(cos_theta_h, n, rng);
    let wi = reflect(-wo, wh);
    (wi.dot(n) > 0.0).then_some(wi)
}
