//! Materials and lights.
//!
//! These are plain data owned by the scene. The renderer borrows them for the
//! duration of a pass and never mutates them while a pass is in flight.

use std::sync::Arc;

use pt_math::{Color, Vec3};

use crate::texture::Texture;

/// Surface material.
///
/// The scalar parameters blend the lobes the renderer builds from this
/// material: `reflectivity` moves energy from the diffuse lobe to the glossy
/// lobes, `metalness` chooses between the dielectric and metal glossy lobes,
/// `fresnel` is the reflectance at normal incidence and `transparency` lets
/// light pass straight through.
#[derive(Clone, Debug)]
pub struct Material {
    /// Material name (from the loader's material table)
    pub name: String,

    /// Diffuse reflectance (RGB, 0-1)
    pub diffuse_reflectance: Color,

    /// Tint of the dielectric specular highlight
    pub specular_reflectance: Color,

    /// Ambient reflectance, carried for the presentation layer
    pub ambient_reflectance: Color,

    /// Blinn-Phong exponent of the glossy lobes
    pub shininess: f32,

    /// Emitted radiance
    pub emission: Color,

    /// Glossy vs diffuse blend (0-1)
    pub reflectivity: f32,

    /// Metal vs dielectric blend of the glossy part (0-1)
    pub metalness: f32,

    /// Reflectance at normal incidence (0-1)
    pub fresnel: f32,

    /// Fraction of light passing through the surface (0-1)
    pub transparency: f32,

    /// Optional texture modulating the diffuse reflectance
    pub diffuse_texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_reflectance: Color::new(0.5, 0.5, 0.5), // Grey default
            specular_reflectance: Color::ONE,
            ambient_reflectance: Color::ZERO,
            shininess: 25.0,
            emission: Color::ZERO,
            reflectivity: 0.0,
            metalness: 0.0,
            fresnel: 0.04,
            transparency: 0.0,
            diffuse_texture: None,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_reflectance: Color) -> Self {
        Self {
            name: name.into(),
            diffuse_reflectance: diffuse_reflectance.max(Color::ZERO),
            ..Default::default()
        }
    }

    pub fn with_reflectivity(mut self, reflectivity: f32) -> Self {
        self.reflectivity = reflectivity.clamp(0.0, 1.0);
        self
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }

    pub fn with_fresnel(mut self, fresnel: f32) -> Self {
        self.fresnel = fresnel.clamp(0.0, 1.0);
        self
    }

    pub fn with_transparency(mut self, transparency: f32) -> Self {
        self.transparency = transparency.clamp(0.0, 1.0);
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess.max(0.0);
        self
    }

    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission.max(Color::ZERO);
        self
    }

    pub fn with_diffuse_texture(mut self, texture: Arc<Texture>) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }

    /// Diffuse reflectance at texture coordinates `uv`.
    ///
    /// Without a texture this is the constant reflectance.
    pub fn diffuse_at(&self, uv: [f32; 2]) -> Color {
        match &self.diffuse_texture {
            // Mesh UVs have v pointing up, image rows go down.
            Some(texture) => self.diffuse_reflectance * texture.sample(uv[0], 1.0 - uv[1]),
            None => self.diffuse_reflectance,
        }
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emission.max_element() > 0.0
    }
}

/// An omnidirectional point light with inverse-square falloff.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity_multiplier: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Color, intensity_multiplier: f32) -> Self {
        Self {
            position,
            color,
            intensity_multiplier,
        }
    }

    /// Radiance arriving at a point `distance` away from the light.
    pub fn radiance_at_distance(&self, distance: f32) -> Color {
        self.intensity_multiplier * self.color / (distance * distance)
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(10.0, 40.0, 10.0),
            color: Color::ONE,
            intensity_multiplier: 2500.0,
        }
    }
}
