//! GPU vertex streams: one buffer per attribute, fixed shader locations.

use asset::MeshStreams;
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};

/// Shader location of each vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeSlot {
    Position = 0,
    Uv = 1,
    Normal = 2,
    Tangent = 3,
    Bitangent = 4,
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const UV_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const NORMAL_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];
const TANGENT_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x3];
const BITANGENT_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32x3];

impl AttributeSlot {
    pub const ALL: [AttributeSlot; 5] = [
        AttributeSlot::Position,
        AttributeSlot::Uv,
        AttributeSlot::Normal,
        AttributeSlot::Tangent,
        AttributeSlot::Bitangent,
    ];

    #[inline]
    pub fn location(self) -> u32 {
        self as u32
    }

    fn attributes(self) -> &'static [wgpu::VertexAttribute] {
        match self {
            AttributeSlot::Position => &POSITION_ATTRS,
            AttributeSlot::Uv => &UV_ATTRS,
            AttributeSlot::Normal => &NORMAL_ATTRS,
            AttributeSlot::Tangent => &TANGENT_ATTRS,
            AttributeSlot::Bitangent => &BITANGENT_ATTRS,
        }
    }

    /// Tightly packed, non-interleaved layout for this attribute's buffer.
    pub fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        let attributes = self.attributes();
        wgpu::VertexBufferLayout {
            array_stride: attributes[0].format.size(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AttributeSlot::Position => "positions",
            AttributeSlot::Uv => "uvs",
            AttributeSlot::Normal => "normals",
            AttributeSlot::Tangent => "tangents",
            AttributeSlot::Bitangent => "bitangents",
        }
    }

    /// Raw bytes of this attribute's stream; empty when the mesh lacks it.
    fn bytes(self, streams: &MeshStreams) -> &[u8] {
        match self {
            AttributeSlot::Position => bytemuck::cast_slice(&streams.positions),
            AttributeSlot::Uv => bytemuck::cast_slice(&streams.uvs),
            AttributeSlot::Normal => bytemuck::cast_slice(&streams.normals),
            AttributeSlot::Tangent => bytemuck::cast_slice(&streams.tangents),
            AttributeSlot::Bitangent => bytemuck::cast_slice(&streams.bitangents),
        }
    }
}

/// Attribute slots present in `streams`, in slot order.
pub fn present_slots(streams: &MeshStreams) -> Vec<AttributeSlot> {
    AttributeSlot::ALL
        .into_iter()
        .filter(|slot| !slot.bytes(streams).is_empty())
        .collect()
}

struct AttributeBuffer {
    slot: AttributeSlot,
    buffer: wgpu::Buffer,
}

/// Uploaded mesh. Immutable after creation.
pub struct GpuMesh {
    index_buffer: Option<wgpu::Buffer>,
    attributes: Vec<AttributeBuffer>,
    draw_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, streams: &MeshStreams) -> RenderResult<Self> {
        streams
            .validate()
            .map_err(|e| RenderError::Mesh(e.to_string()))?;
        let draw_count = u32::try_from(streams.draw_count())
            .map_err(|_| RenderError::Mesh("too many vertices for one draw".into()))?;

        let attributes = present_slots(streams)
            .into_iter()
            .map(|slot| AttributeBuffer {
                slot,
                buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(slot.label()),
                    contents: slot.bytes(streams),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
            })
            .collect::<Vec<_>>();

        let index_buffer = streams.indices.as_ref().map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        log::info!(
            "Uploaded mesh: {} vertices, {} attribute buffer(s), {}",
            streams.vertex_count(),
            attributes.len(),
            if index_buffer.is_some() {
                "indexed"
            } else {
                "non-indexed"
            }
        );

        Ok(Self {
            index_buffer,
            attributes,
            draw_count,
        })
    }

    /// Buffer layouts in vertex-buffer-slot order.
    pub fn vertex_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'static>> {
        self.attributes.iter().map(|a| a.slot.layout()).collect()
    }

    pub fn has_attribute(&self, location: u32) -> bool {
        self.attributes.iter().any(|a| a.slot.location() == location)
    }

    /// Fail when the shader reads an attribute this mesh does not carry.
    pub fn check_inputs(&self, locations: &[u32]) -> RenderResult<()> {
        match locations.iter().find(|&&l| !self.has_attribute(l)) {
            Some(&missing) => Err(RenderError::MissingAttribute(missing)),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// Bind every attribute buffer (and the index buffer). Safe to repeat
    /// before each draw.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (slot, attribute) in self.attributes.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, attribute.buffer.slice(..));
        }
        if let Some(index_buffer) = &self.index_buffer {
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.is_indexed() {
            pass.draw_indexed(0..self.draw_count, 0, 0..1);
        } else {
            pass.draw(0..self.draw_count, 0..1);
        }
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        log::debug!("Releasing mesh buffers");
        if let Some(index_buffer) = &self.index_buffer {
            index_buffer.destroy();
        }
        for attribute in self.attributes.iter().rev() {
            attribute.buffer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_are_tightly_packed_at_fixed_locations() {
        for slot in AttributeSlot::ALL {
            let layout = slot.layout();
            assert_eq!(layout.attributes.len(), 1);
            assert_eq!(layout.attributes[0].shader_location, slot.location());
            assert_eq!(layout.attributes[0].offset, 0);
            let expected = if slot == AttributeSlot::Uv { 8 } else { 12 };
            assert_eq!(layout.array_stride, expected);
        }
    }

    #[test]
    fn present_slots_skip_missing_streams() {
        let streams = MeshStreams {
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            ..MeshStreams::default()
        };
        assert_eq!(
            present_slots(&streams),
            vec![AttributeSlot::Position, AttributeSlot::Normal]
        );
    }

    #[test]
    fn stream_bytes_match_vertex_format() {
        let streams = MeshStreams {
            positions: vec![[1.0, 2.0, 3.0]; 3],
            uvs: vec![[0.5, 0.5]; 3],
            ..MeshStreams::default()
        };
        assert_eq!(AttributeSlot::Position.bytes(&streams).len(), 3 * 12);
        assert_eq!(AttributeSlot::Uv.bytes(&streams).len(), 3 * 8);
        assert!(AttributeSlot::Tangent.bytes(&streams).is_empty());
    }
}
