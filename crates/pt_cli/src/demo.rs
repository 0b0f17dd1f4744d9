//! Built-in demo scene: a few boxes on a checkered ground plane.

use std::sync::Arc;

use anyhow::Result;
use pt_core::{Material, Mesh, PointLight, Texture};
use pt_math::{Color, Mat4, Vec3};
use pt_renderer::{Environment, Geometry, Scene};

/// Point the demo camera orbits around.
pub const TARGET: Vec3 = Vec3::new(0.0, 10.0, 0.0);

pub fn build_scene(environment: Environment) -> Result<Scene> {
    let mut geometry = Geometry::new();

    let ground = Material::new("ground", Color::splat(0.8))
        .with_diffuse_texture(Arc::new(checker_texture(8, 64)?));
    geometry.add_mesh(
        &Mesh::parallelogram(Vec3::new(-100.0, 0.0, 100.0), Vec3::X * 200.0, Vec3::NEG_Z * 200.0),
        ground,
        Mat4::IDENTITY,
    );

    let boxes = [
        (
            Vec3::new(-15.0, 0.0, -5.0),
            Vec3::new(-5.0, 10.0, 5.0),
            Material::new("clay", Color::new(0.7, 0.2, 0.15)),
        ),
        (
            Vec3::new(0.0, 0.0, -15.0),
            Vec3::new(8.0, 16.0, -7.0),
            Material::new("gold", Color::new(1.0, 0.78, 0.34))
                .with_reflectivity(1.0)
                .with_metalness(1.0)
                .with_fresnel(0.9)
                .with_shininess(200.0),
        ),
        (
            Vec3::new(5.0, 0.0, 2.0),
            Vec3::new(11.0, 6.0, 8.0),
            Material::new("plastic", Color::new(0.1, 0.2, 0.7))
                .with_reflectivity(0.7)
                .with_shininess(60.0),
        ),
        (
            Vec3::new(-4.0, 0.0, 8.0),
            Vec3::new(-2.0, 2.0, 10.0),
            Material::new("lamp", Color::ZERO).with_emission(Color::new(6.0, 4.0, 2.0)),
        ),
    ];
    for (min, max, material) in boxes {
        geometry.add_mesh(&Mesh::cuboid(min, max), material, Mat4::IDENTITY);
    }

    // Tilted tinted glass pane in front of the clay box
    let pane = Mesh::parallelogram(Vec3::ZERO, Vec3::X * 8.0, Vec3::Y * 8.0);
    geometry.add_mesh(
        &pane,
        Material::new("glass", Color::new(0.6, 0.9, 0.7)).with_transparency(0.8),
        Mat4::from_translation(Vec3::new(-14.0, 0.0, 10.0)) * Mat4::from_rotation_y(0.4),
    );

    Ok(Scene::build(geometry, vec![PointLight::default()], environment)?)
}

/// Equirectangular sky: blue zenith fading to a bright horizon over brown
/// ground.
pub fn sky_texture(width: u32, height: u32) -> Result<Texture> {
    let zenith = Color::new(0.25, 0.45, 0.9);
    let horizon = Color::new(0.9, 0.9, 0.85);
    let ground = Color::new(0.25, 0.2, 0.15);

    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        // Row 0 is straight up
        let elevation = 1.0 - 2.0 * (y as f32 + 0.5) / height as f32;
        let color = if elevation >= 0.0 {
            horizon.lerp(zenith, elevation.sqrt())
        } else {
            horizon.lerp(ground, (-elevation * 4.0).min(1.0))
        };
        pixels.extend((0..width).map(|_| [color.x, color.y, color.z, 1.0]));
    }
    Ok(Texture::new(width, height, pixels, "<sky>")?)
}

fn checker_texture(cells: u32, size: u32) -> Result<Texture> {
    let cell = (size / cells).max(1);
    let pixels = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            let v = if (x / cell + y / cell) % 2 == 0 { 1.0 } else { 0.5 };
            [v, v, v, 1.0]
        })
        .collect();
    Ok(Texture::new(size, size, pixels, "<checker>")?)
}
