//! Named uniform uploads and the bind groups that expose them to a program.

use std::collections::BTreeMap;

use glam::{Mat4, Vec3};

use crate::{
    error::{RenderError, RenderResult},
    shader::{ResourceKind, ShaderProgram},
    texture::GpuTexture,
};

pub const UNIFORM_MVP: &str = "MVP";
pub const UNIFORM_MODEL: &str = "M";
pub const UNIFORM_VIEW: &str = "V";
pub const UNIFORM_LIGHT_POSITION: &str = "LightPosition_worldspace";

/// Suffix naming the sampler that pairs with a texture global.
pub const SAMPLER_SUFFIX: &str = "_sampler";

/// Uniform buffers are padded to 16 bytes.
fn padded_size(size: u64) -> u64 {
    size.div_ceil(16) * 16
}

/// Bytes of a `mat4x4<f32>` uniform.
pub fn mat4_bytes(m: &Mat4) -> [u8; 64] {
    bytemuck::cast(m.to_cols_array())
}

/// Bytes of a `vec3<f32>` uniform, padded to a full vec4 slot.
pub fn vec3_bytes(v: Vec3) -> [u8; 16] {
    bytemuck::cast([v.x, v.y, v.z, 0.0f32])
}

/// One GPU buffer per uniform the program declares, keyed by name.
pub struct UniformBuffers {
    buffers: BTreeMap<String, wgpu::Buffer>,
}

impl UniformBuffers {
    pub fn new(device: &wgpu::Device, program: &ShaderProgram) -> Self {
        let buffers = program
            .resources()
            .iter()
            .filter_map(|slot| match slot.kind {
                ResourceKind::UniformBuffer { size } => Some((slot.name.clone(), size)),
                _ => None,
            })
            .map(|(name, size)| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&name),
                    size: padded_size(size),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (name, buffer)
            })
            .collect();
        Self { buffers }
    }

    pub fn get(&self, name: &str) -> Option<&wgpu::Buffer> {
        self.buffers.get(name)
    }

    /// Write `bytes` to uniform `name`. Names the program does not declare
    /// are skipped and reported as `false`.
    pub fn write(&self, queue: &wgpu::Queue, name: &str, bytes: &[u8]) -> bool {
        match self.buffers.get(name) {
            Some(buffer) => {
                let len = (bytes.len() as u64).min(buffer.size()) as usize;
                queue.write_buffer(buffer, 0, &bytes[..len]);
                true
            }
            None => {
                log::trace!("uniform `{name}` is not used by this program");
                false
            }
        }
    }

    pub fn set_mat4(&self, queue: &wgpu::Queue, name: &str, m: &Mat4) -> bool {
        self.write(queue, name, &mat4_bytes(m))
    }

    pub fn set_vec3(&self, queue: &wgpu::Queue, name: &str, v: Vec3) -> bool {
        self.write(queue, name, &vec3_bytes(v))
    }
}

impl Drop for UniformBuffers {
    fn drop(&mut self) {
        for buffer in self.buffers.values() {
            buffer.destroy();
        }
    }
}

/// Bind groups wiring uniforms and textures to every resource the program declares.
pub struct ProgramBindings {
    groups: Vec<wgpu::BindGroup>,
}

impl ProgramBindings {
    /// `textures` are looked up by texture global name; the sampler global
    /// `<name>_sampler` takes the sampler of the same texture.
    pub fn new(
        device: &wgpu::Device,
        program: &ShaderProgram,
        uniforms: &UniformBuffers,
        textures: &[(&str, &GpuTexture)],
    ) -> RenderResult<Self> {
        let texture = |name: &str| {
            textures
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, t)| *t)
        };

        let mut groups = Vec::with_capacity(program.bind_group_layouts().len());
        for (group, layout) in program.bind_group_layouts().iter().enumerate() {
            let mut entries = Vec::new();
            for slot in program
                .resources()
                .iter()
                .filter(|slot| slot.location.group == group as u32)
            {
                let unbound = || RenderError::UnboundResource(slot.name.clone());
                let resource = match slot.kind {
                    ResourceKind::UniformBuffer { .. } => uniforms
                        .get(&slot.name)
                        .ok_or_else(unbound)?
                        .as_entire_binding(),
                    ResourceKind::Texture => wgpu::BindingResource::TextureView(
                        texture(&slot.name).ok_or_else(unbound)?.view(),
                    ),
                    ResourceKind::Sampler => {
                        let owner = slot.name.strip_suffix(SAMPLER_SUFFIX).ok_or_else(unbound)?;
                        let owner_texture = texture(owner).ok_or_else(unbound)?;
                        wgpu::BindingResource::Sampler(owner_texture.sampler())
                    }
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: slot.location.binding,
                    resource,
                });
            }
            groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} bindings {group}", program.label())),
                layout,
                entries: &entries,
            }));
        }
        Ok(Self { groups })
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (index, group) in self.groups.iter().enumerate() {
            pass.set_bind_group(index as u32, group, &[]);
        }
    }
}
