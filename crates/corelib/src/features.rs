//! Pipeline configuration: which mesh layout, how many textures and whether
//! the tangent-space stage runs. Each valid combination maps to one shader variant.

use crate::{CoreError, CoreResult};

/// Texture global holding the tangent-space normal map. Its pixels are
/// vectors, not colours.
pub const NORMAL_MAP_SAMPLER: &str = "tangentnm";

/// Shader program family selected by [`PipelineFeatures`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    /// Untextured, constant colour; works with indexed or expanded positions.
    Flat,
    /// Single diffuse texture with a point light.
    Textured,
    /// Diffuse + tangent-space normal map.
    NormalMapped,
}

impl ShaderVariant {
    /// File stem used when loading sources from a shader directory.
    pub fn file_stem(self) -> &'static str {
        match self {
            ShaderVariant::Flat => "flat",
            ShaderVariant::Textured => "textured",
            ShaderVariant::NormalMapped => "normal_mapped",
        }
    }

    /// Texture globals the variant samples, in texture-argument order.
    pub fn sampler_names(self) -> &'static [&'static str] {
        match self {
            ShaderVariant::Flat => &[],
            ShaderVariant::Textured => &["myTextureSampler"],
            ShaderVariant::NormalMapped => &["diffuse", NORMAL_MAP_SAMPLER],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineFeatures {
    pub use_indices: bool,
    pub textures: u8,
    pub tangent_space: bool,
}

impl PipelineFeatures {
    /// Build and validate a feature set.
    pub fn new(use_indices: bool, textures: u8, tangent_space: bool) -> CoreResult<Self> {
        let features = Self {
            use_indices,
            textures,
            tangent_space,
        };
        features.validate()?;
        Ok(features)
    }

    /// Features implied by the number of images supplied: two images
    /// always means diffuse + normal map.
    pub fn from_texture_count(use_indices: bool, textures: u8) -> CoreResult<Self> {
        Self::new(use_indices, textures, textures == 2)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.textures > 2 {
            return Err(CoreError::TextureCount(self.textures));
        }
        if self.use_indices && self.textures > 0 {
            return Err(CoreError::InvalidFeatures(
                "the indexed layout carries positions only and cannot be textured",
            ));
        }
        if self.use_indices && self.tangent_space {
            return Err(CoreError::InvalidFeatures(
                "tangent space needs per-face vertex records, not the indexed layout",
            ));
        }
        if self.tangent_space != (self.textures == 2) {
            return Err(CoreError::InvalidFeatures(
                "tangent space requires exactly a diffuse and a normal-map texture",
            ));
        }
        Ok(())
    }

    pub fn variant(&self) -> ShaderVariant {
        match (self.textures, self.tangent_space) {
            (0, _) => ShaderVariant::Flat,
            (1, _) => ShaderVariant::Textured,
            _ => ShaderVariant::NormalMapped,
        }
    }

    /// Whether uvs/normals must be uploaded alongside positions.
    #[inline]
    pub fn needs_surface_attributes(&self) -> bool {
        self.textures > 0
    }
}

impl Default for PipelineFeatures {
    fn default() -> Self {
        Self {
            use_indices: false,
            textures: 0,
            tangent_space: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_configurations_are_valid() {
        let cases = [
            (true, 0, false, ShaderVariant::Flat),
            (false, 0, false, ShaderVariant::Flat),
            (false, 1, false, ShaderVariant::Textured),
            (false, 2, true, ShaderVariant::NormalMapped),
        ];
        for (indexed, textures, tangent, variant) in cases {
            let f = PipelineFeatures::new(indexed, textures, tangent).expect("valid");
            assert_eq!(f.variant(), variant);
        }
    }

    #[test]
    fn rejects_unsupported_combinations() {
        assert_eq!(
            PipelineFeatures::new(false, 3, false),
            Err(CoreError::TextureCount(3))
        );
        assert!(PipelineFeatures::new(true, 1, false).is_err());
        assert!(PipelineFeatures::new(true, 0, true).is_err());
        assert!(PipelineFeatures::new(false, 1, true).is_err());
        assert!(PipelineFeatures::new(false, 2, false).is_err());
    }

    #[test]
    fn texture_count_implies_tangent_stage() {
        let f = PipelineFeatures::from_texture_count(false, 2).unwrap();
        assert!(f.tangent_space);
        assert_eq!(f.variant().sampler_names(), &["diffuse", "tangentnm"]);
        assert!(PipelineFeatures::from_texture_count(true, 2).is_err());
    }
}
