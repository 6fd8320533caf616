//! GPU 2D textures built from decoded images.

use asset::DecodedImage;

use crate::error::{RenderError, RenderResult};

/// Colour images (diffuse maps) are stored sRGB-encoded.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
/// Data images (normal maps) are sampled without decoding.
pub const DATA_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Sampling setup for an uploaded texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureProfile {
    /// Full mip chain, trilinear filtering, clamped to edge.
    #[default]
    Mipmapped,
    /// Base level only, linear filtering, repeating. Keeps tangent-space
    /// normal maps free of mip averaging.
    SingleLevel,
}

impl TextureProfile {
    pub fn sampler_descriptor(self) -> wgpu::SamplerDescriptor<'static> {
        match self {
            TextureProfile::Mipmapped => wgpu::SamplerDescriptor {
                label: Some("Mipmapped sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            },
            TextureProfile::SingleLevel => wgpu::SamplerDescriptor {
                label: Some("Single-level sampler"),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                lod_max_clamp: 0.0,
                ..Default::default()
            },
        }
    }
}

/// Texture, its default view and the sampler of its profile.
pub struct GpuTexture {
    sampler: wgpu::Sampler,
    view: wgpu::TextureView,
    texture: wgpu::Texture,
    label: String,
}

impl GpuTexture {
    /// Upload `image`, consuming it: the GPU copy is the only one kept.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: DecodedImage,
        profile: TextureProfile,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> RenderResult<Self> {
        let (width, height) = (image.width(), image.height());
        let limit = device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(RenderError::TextureTooLarge {
                width,
                height,
                limit,
            });
        }

        let levels = match profile {
            TextureProfile::Mipmapped => image
                .rgba_mip_chain()
                .map_err(|e| RenderError::Texture(format!("`{label}`: {e}")))?,
            TextureProfile::SingleLevel => vec![asset::texture::MipLevel {
                width,
                height,
                pixels: image.to_rgba8(),
            }],
        };
        drop(image);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level.width),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&profile.sampler_descriptor());
        log::info!(
            "Uploaded texture `{label}` {width}x{height}, {} mip level(s), {profile:?}",
            levels.len()
        );

        Ok(Self {
            sampler,
            view,
            texture,
            label: label.to_owned(),
        })
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        log::debug!("Releasing texture `{}`", self.label);
        self.texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmapped_profile_clamps_and_filters_mips() {
        let desc = TextureProfile::Mipmapped.sampler_descriptor();
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.mipmap_filter, wgpu::FilterMode::Linear);
    }

    #[test]
    fn single_level_profile_never_leaves_base_level() {
        let desc = TextureProfile::SingleLevel.sampler_descriptor();
        assert_eq!(desc.lod_max_clamp, 0.0);
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
    }
}
