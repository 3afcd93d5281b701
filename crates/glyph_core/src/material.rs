//! Material definitions, the legacy numeric palette and the material table.

use glyph_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{check_finite, SceneError, SceneResult};

/// Radiance of the legacy LIGHT material and the default area light.
pub const LIGHT_EMISSION: Vec3 = Vec3::splat(16.0);

/// Roughness above which a reflective material is traced as diffuse by the path tracer.
pub const SPECULAR_ROUGHNESS_CUTOFF: f32 = 0.5;

/// A surface material.
///
/// Exactly one of diffuse / emissive / reflective governs shading, see
/// [`Material::kind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name, unique within a table when non-empty
    pub name: String,

    /// Diffuse/albedo color (RGB, 0-1)
    pub albedo: Vec3,

    /// Whether the surface emits light
    pub emissive: bool,

    /// Emitted radiance (RGB, unbounded)
    pub emission: Vec3,

    /// Whether the surface is a specular reflector/refractor
    pub reflective: bool,

    /// Roughness factor (0=smooth, 1=rough)
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: Vec3::splat(0.5), // Grey default
            emissive: false,
            emission: Vec3::ZERO,
            reflective: false,
            roughness: 0.5,
        }
    }
}

/// Which shading model a material uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Diffuse,
    Emissive,
    Reflective,
}

impl Material {
    /// Create a diffuse material.
    pub fn diffuse(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            albedo,
            ..Default::default()
        }
    }

    /// Create a light-emitting material.
    pub fn emissive(name: impl Into<String>, emission: Vec3) -> Self {
        Self {
            name: name.into(),
            albedo: Vec3::ONE,
            emissive: true,
            emission,
            ..Default::default()
        }
    }

    /// Create a smooth specular material.
    pub fn reflective(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            albedo,
            reflective: true,
            roughness: 0.0,
            ..Default::default()
        }
    }

    /// Shading model. Emission wins over reflection.
    pub fn kind(&self) -> MaterialKind {
        if self.emissive {
            MaterialKind::Emissive
        } else if self.reflective {
            MaterialKind::Reflective
        } else {
            MaterialKind::Diffuse
        }
    }

    /// Check numeric fields and clamp them into their documented ranges.
    pub fn validated(mut self) -> SceneResult<Self> {
        for (field, v) in [("albedo", self.albedo), ("emission", self.emission)] {
            for c in v.to_array() {
                check_finite(field, c)?;
            }
        }
        check_finite("roughness", self.roughness)?;
        if self.emission.min_element() < 0.0 {
            return Err(SceneError::InvalidValue {
                field: "emission",
                reason: "radiance must be non-negative".into(),
            });
        }
        self.albedo = self.albedo.clamp(Vec3::ZERO, Vec3::ONE);
        self.roughness = self.roughness.clamp(0.0, 1.0);
        Ok(self)
    }
}

/// Numeric material ids kept for scenes written against the fixed palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LegacyMaterial {
    Light = 0,
    White = 1,
    Green = 2,
    Red = 3,
    Glass = 6,
    Mirror = 7,
}

impl LegacyMaterial {
    pub const ALL: [LegacyMaterial; 6] = [
        LegacyMaterial::Light,
        LegacyMaterial::White,
        LegacyMaterial::Green,
        LegacyMaterial::Red,
        LegacyMaterial::Glass,
        LegacyMaterial::Mirror,
    ];

    /// Diffuse presets in quantization order. Fixed, not configuration.
    pub const DIFFUSE_PALETTE: [(LegacyMaterial, Vec3); 3] = [
        (LegacyMaterial::White, Vec3::new(0.73, 0.73, 0.73)),
        (LegacyMaterial::Green, Vec3::new(0.12, 0.45, 0.15)),
        (LegacyMaterial::Red, Vec3::new(0.65, 0.05, 0.05)),
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            LegacyMaterial::Light => "LIGHT",
            LegacyMaterial::White => "WHITE",
            LegacyMaterial::Green => "GREEN",
            LegacyMaterial::Red => "RED",
            LegacyMaterial::Glass => "GLASS",
            LegacyMaterial::Mirror => "MIRROR",
        }
    }

    /// GLASS and MIRROR bounce specularly.
    pub fn is_specular(self) -> bool {
        matches!(self, LegacyMaterial::Glass | LegacyMaterial::Mirror)
    }

    pub fn albedo(self) -> Vec3 {
        match self {
            LegacyMaterial::Light | LegacyMaterial::Glass => Vec3::ONE,
            LegacyMaterial::Mirror => Vec3::splat(0.95),
            diffuse => Self::DIFFUSE_PALETTE
                .iter()
                .find(|(m, _)| *m == diffuse)
                .map(|(_, albedo)| *albedo)
                .unwrap_or(Vec3::splat(0.5)),
        }
    }

    /// Full material record for this preset.
    pub fn material(self) -> Material {
        match self {
            LegacyMaterial::Light => Material::emissive(self.name(), LIGHT_EMISSION),
            LegacyMaterial::Glass | LegacyMaterial::Mirror => {
                Material::reflective(self.name(), self.albedo())
            }
            _ => Material::diffuse(self.name(), self.albedo()),
        }
    }

    /// Nearest diffuse preset by Euclidean RGB distance. Ties go to the
    /// earlier palette entry.
    pub fn nearest_diffuse(albedo: Vec3) -> Self {
        let mut best = Self::DIFFUSE_PALETTE[0];
        let mut best_dist = f32::INFINITY;
        for entry in Self::DIFFUSE_PALETTE {
            let dist = albedo.distance_squared(entry.1);
            if dist < best_dist {
                best = entry;
                best_dist = dist;
            }
        }
        best.0
    }

    /// Lossy single-code encoding of a full material.
    ///
    /// `Material` carries no transmission flag, so every smooth reflective
    /// material becomes GLASS, the MIRROR entry included. The path tracer
    /// gives both codes the same Fresnel bounce. MIRROR keeps its own table
    /// id, and the ray tracer and rasterizer still see its 0.95 albedo.
    pub fn encode(material: &Material) -> Self {
        match material.kind() {
            MaterialKind::Emissive => LegacyMaterial::Light,
            MaterialKind::Reflective if material.roughness <= SPECULAR_ROUGHNESS_CUTOFF => {
                LegacyMaterial::Glass
            }
            _ => Self::nearest_diffuse(material.albedo),
        }
    }
}

/// Ways of naming a material when adding geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialRef {
    /// Table index
    Id(usize),
    /// Name lookup
    Name(String),
    /// Legacy palette entry, added on demand
    Legacy(LegacyMaterial),
    /// Inline descriptor, appended (or deduplicated by name)
    Literal(Material),
}

impl From<usize> for MaterialRef {
    fn from(id: usize) -> Self {
        MaterialRef::Id(id)
    }
}

impl From<&str> for MaterialRef {
    fn from(name: &str) -> Self {
        MaterialRef::Name(name.to_string())
    }
}

impl From<String> for MaterialRef {
    fn from(name: String) -> Self {
        MaterialRef::Name(name)
    }
}

impl From<LegacyMaterial> for MaterialRef {
    fn from(legacy: LegacyMaterial) -> Self {
        MaterialRef::Legacy(legacy)
    }
}

impl From<Material> for MaterialRef {
    fn from(material: Material) -> Self {
        MaterialRef::Literal(material)
    }
}

/// Append-only material storage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded so that index == legacy id. Slots 4 and 5 are gray placeholders.
    pub fn with_legacy() -> Self {
        let mut table = Self::new();
        for id in 0..=7u32 {
            let material = match LegacyMaterial::from_id(id) {
                Some(legacy) => legacy.material(),
                None => Material::diffuse(format!("RESERVED_{id}"), Vec3::splat(0.5)),
            };
            table.materials.push(material);
        }
        table
    }

    /// Wrap an existing list (e.g. from a deserialized scene). Names are not re-deduplicated.
    pub fn from_vec(materials: Vec<Material>) -> Self {
        Self { materials }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn as_slice(&self) -> &[Material] {
        &self.materials
    }

    pub fn into_vec(self) -> Vec<Material> {
        self.materials
    }

    /// Index of the first material with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Append a material and return its index. A non-empty name that is
    /// already present returns the existing index instead.
    pub fn add(&mut self, material: Material) -> SceneResult<usize> {
        if !material.name.is_empty() {
            if let Some(existing) = self.find(&material.name) {
                return Ok(existing);
            }
        }
        let material = material.validated()?;
        self.materials.push(material);
        Ok(self.materials.len() - 1)
    }

    /// Resolve any material reference to a table index.
    pub fn resolve(&mut self, reference: impl Into<MaterialRef>) -> SceneResult<usize> {
        match reference.into() {
            MaterialRef::Id(id) if id < self.materials.len() => Ok(id),
            MaterialRef::Id(id) => Err(SceneError::UnknownMaterial(format!("#{id}"))),
            MaterialRef::Name(name) => self
                .find(&name)
                .ok_or(SceneError::UnknownMaterial(name)),
            MaterialRef::Legacy(legacy) => match self.find(legacy.name()) {
                Some(index) => Ok(index),
                None => self.add(legacy.material()),
            },
            MaterialRef::Literal(material) => self.add(material),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_priority() {
        let mut m = Material::reflective("m", Vec3::ONE);
        assert_eq!(m.kind(), MaterialKind::Reflective);
        m.emissive = true;
        assert_eq!(m.kind(), MaterialKind::Emissive);
        assert_eq!(Material::default().kind(), MaterialKind::Diffuse);
    }

    #[test]
    fn test_legacy_table_indices_match_ids() {
        let table = MaterialTable::with_legacy();
        for legacy in LegacyMaterial::ALL {
            let index = legacy.id() as usize;
            assert_eq!(table.get(index).unwrap().name, legacy.name());
        }
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn test_nearest_diffuse_palette() {
        assert_eq!(LegacyMaterial::nearest_diffuse(Vec3::ONE), LegacyMaterial::White);
        assert_eq!(
            LegacyMaterial::nearest_diffuse(Vec3::new(0.9, 0.1, 0.0)),
            LegacyMaterial::Red
        );
        assert_eq!(
            LegacyMaterial::nearest_diffuse(Vec3::new(0.0, 0.6, 0.1)),
            LegacyMaterial::Green
        );
        // Black is closest to green: |g|² = 0.0144+0.2025+0.0225 beats red's 0.4275
        assert_eq!(LegacyMaterial::nearest_diffuse(Vec3::ZERO), LegacyMaterial::Green);
    }

    #[test]
    fn test_encode() {
        assert_eq!(
            LegacyMaterial::encode(&Material::emissive("lamp", Vec3::ONE)),
            LegacyMaterial::Light
        );
        assert_eq!(
            LegacyMaterial::encode(&Material::reflective("glass", Vec3::ONE)),
            LegacyMaterial::Glass
        );
        let mut brushed = Material::reflective("brushed", Vec3::new(0.8, 0.1, 0.1));
        brushed.roughness = 0.9;
        assert_eq!(LegacyMaterial::encode(&brushed), LegacyMaterial::Red);
    }

    #[test]
    fn test_mirror_encodes_as_glass() {
        let mirror = LegacyMaterial::Mirror.material();
        assert_eq!(LegacyMaterial::encode(&mirror), LegacyMaterial::Glass);
        assert!(LegacyMaterial::Mirror.is_specular());
        assert!(LegacyMaterial::Glass.is_specular());
    }

    #[test]
    fn test_add_deduplicates_by_name() {
        let mut table = MaterialTable::new();
        let a = table.add(Material::diffuse("paint", Vec3::X)).unwrap();
        let b = table.add(Material::diffuse("paint", Vec3::Y)).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(a).unwrap().albedo, Vec3::X);

        // Unnamed materials are never merged
        table.add(Material::default()).unwrap();
        table.add(Material::default()).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_resolve_references() {
        let mut table = MaterialTable::with_legacy();
        assert_eq!(table.resolve(2usize).unwrap(), 2);
        assert_eq!(table.resolve("RED").unwrap(), 3);
        assert_eq!(table.resolve(LegacyMaterial::Mirror).unwrap(), 7);
        assert!(matches!(table.resolve(99usize), Err(SceneError::UnknownMaterial(_))));
        assert!(matches!(table.resolve("nope"), Err(SceneError::UnknownMaterial(_))));

        let id = table.resolve(Material::diffuse("teal", Vec3::new(0.0, 0.5, 0.5))).unwrap();
        assert_eq!(id, 8);
    }

    #[test]
    fn test_legacy_added_on_demand() {
        let mut table = MaterialTable::new();
        let glass = table.resolve(LegacyMaterial::Glass).unwrap();
        assert_eq!(glass, 0);
        assert_eq!(table.resolve(LegacyMaterial::Glass).unwrap(), 0);
    }

    #[test]
    fn test_validation_clamps_and_rejects() {
        let m = Material::diffuse("hot", Vec3::new(2.0, -1.0, 0.5)).validated().unwrap();
        assert_eq!(m.albedo, Vec3::new(1.0, 0.0, 0.5));

        let bad = Material::diffuse("nan", Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(bad.validated().is_err());

        let negative = Material::emissive("dark", Vec3::splat(-1.0));
        assert!(negative.validated().is_err());
    }
}
