//! Ready-made scenes used by the viewer and the tests.

use glyph_math::Vec3;

use crate::atlas::Atlas;
use crate::builder::SceneBuilder;
use crate::error::SceneResult;
use crate::geometry::QuadDiagonal;
use crate::material::{LegacyMaterial, Material};
use crate::scene::Scene;

/// Classic box: red left wall, green right wall, white elsewhere, one
/// diffuse and one glass sphere, area light under the ceiling.
pub fn cornell_box() -> SceneResult<Scene> {
    let mut b = SceneBuilder::new();
    let white = LegacyMaterial::White;

    b.set_camera_pose([0.0, 2.0, 7.5], 0.0, 0.0, 45f32.to_radians())?
        .set_env_light([0.0; 3], 0.0)?
        .set_area_light([0.0, 3.6, 0.0], 0.35, false)?
        .add_point_light([0.0, 3.5, 0.0], [1.0; 3], 6.0)?;

    // floor, ceiling, back
    b.add_quad([-2.0, 0.0, 2.0], [2.0, 0.0, 2.0], [2.0, 0.0, -2.0], [-2.0, 0.0, -2.0], white)?
        .add_quad([-2.0, 4.0, -2.0], [2.0, 4.0, -2.0], [2.0, 4.0, 2.0], [-2.0, 4.0, 2.0], white)?
        .add_quad([-2.0, 0.0, -2.0], [2.0, 0.0, -2.0], [2.0, 4.0, -2.0], [-2.0, 4.0, -2.0], white)?;
    // left, right
    b.add_quad([-2.0, 0.0, 2.0], [-2.0, 0.0, -2.0], [-2.0, 4.0, -2.0], [-2.0, 4.0, 2.0], LegacyMaterial::Red)?
        .add_quad([2.0, 0.0, -2.0], [2.0, 0.0, 2.0], [2.0, 4.0, 2.0], [2.0, 4.0, -2.0], LegacyMaterial::Green)?;

    b.add_sphere([-0.8, 0.8, -0.6], 0.8, white)?
        .add_sphere([0.9, 0.7, 0.6], 0.7, LegacyMaterial::Glass)?;

    Ok(b.to_unified())
}

/// Width of the showcase sign atlas in texels.
const SIGN_WIDTH: u32 = 32;
/// Height of the showcase sign atlas in texels.
const SIGN_HEIGHT: u32 = 8;

/// Outdoor scene with a textured sign carrying glyph texels, an orbiting
/// area light and a sky gradient.
pub fn showcase() -> SceneResult<Scene> {
    let mut b = SceneBuilder::new();

    let mut atlas = Atlas::new(SIGN_WIDTH, SIGN_HEIGHT);
    for y in 0..SIGN_HEIGHT {
        for x in 0..SIGN_WIDTH {
            let edge = x == 0 || y == 0 || x == SIGN_WIDTH - 1 || y == SIGN_HEIGHT - 1;
            let rgb = if edge { [200, 160, 40] } else { [20, 30, 70] };
            atlas.set_pixel(x, y, rgb);
        }
    }
    for row in 3..=4 {
        atlas.write_text(12, row, "GLYPHRAY", [255, 230, 90])?;
    }
    b.set_atlas(atlas)?;

    let ground = b.add_material(Material::diffuse("ground", Vec3::new(0.6, 0.6, 0.55)))?;
    let brass = {
        let mut m = Material::reflective("brass", Vec3::new(0.9, 0.75, 0.4));
        m.roughness = 0.2;
        b.add_material(m)?
    };

    b.set_camera_pose([0.0, 1.6, 6.0], 0.0, -0.12, 50f32.to_radians())?
        .set_env_gradient([0.5, 0.7, 1.0], [0.25, 0.2, 0.15], 0.6)?
        .set_area_light([0.0, 4.0, 0.0], 0.5, true)?
        .add_directional_light([0.4, 1.0, 0.6], [1.0, 0.95, 0.85], 0.9)?
        .add_point_light([-2.5, 2.5, 2.0], [0.6, 0.7, 1.0], 4.0)?;

    b.add_quad([-6.0, 0.0, 6.0], [6.0, 0.0, 6.0], [6.0, 0.0, -6.0], [-6.0, 0.0, -6.0], ground)?
        .add_plane([0.0, 1.0, 0.0], -0.01, ground)?;

    let (w, h) = ((SIGN_WIDTH - 1) as u16, (SIGN_HEIGHT - 1) as u16);
    b.add_quad_uv(
        [-2.0, 0.5, -1.5],
        [2.0, 0.5, -1.5],
        [2.0, 1.5, -1.5],
        [-2.0, 1.5, -1.5],
        LegacyMaterial::White,
        [[0, h], [w, h], [w, 0], [0, 0]],
        QuadDiagonal::Ac,
    )?;

    b.add_sphere([-1.6, 0.6, 0.8], 0.6, LegacyMaterial::Red)?
        .add_sphere([0.0, 0.5, 1.2], 0.5, LegacyMaterial::Glass)?
        .add_sphere([1.6, 0.6, 0.8], 0.6, brass)?
        .add_sphere([2.8, 0.35, -0.2], 0.35, LegacyMaterial::Green)?;

    Ok(b.to_unified())
}
