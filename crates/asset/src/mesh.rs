//! CPU-side attribute streams ready for GPU upload.

use anyhow::{Result, ensure};
use corelib::{Mat4, tangent::face_basis};

use crate::model::Model;

/// Non-interleaved vertex streams.
///
/// The expanded layout gives every triangle three independent vertex
/// records (no sharing), which lets per-face tangents differ between faces
/// that meet at a vertex. The indexed layout keeps shared positions and an
/// index buffer and carries no other attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshStreams {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub indices: Option<Vec<u32>>,
}

impl MeshStreams {
    /// Expand `model` into per-face records.
    ///
    /// `surface` adds uv and normal streams; `tangent_model` additionally
    /// computes per-face tangents/bitangents under the given model matrix.
    pub fn expanded(model: &dyn Model, surface: bool, tangent_model: Option<&Mat4>) -> Self {
        let records = model.nfaces() * 3;
        let mut streams = Self {
            positions: Vec::with_capacity(records),
            ..Self::default()
        };
        if surface || tangent_model.is_some() {
            streams.uvs.reserve(records);
            streams.normals.reserve(records);
        }

        let mut fallbacks = 0usize;
        for face in 0..model.nfaces() {
            for corner in 0..3 {
                streams
                    .positions
                    .push(model.face_point(face, corner).to_array());
                if surface || tangent_model.is_some() {
                    streams.uvs.push(model.uv(face, corner).to_array());
                    streams.normals.push(model.normal(face, corner).to_array());
                }
            }

            if let Some(m) = tangent_model {
                let positions = [0, 1, 2].map(|k| model.face_point(face, k));
                let uvs = [0, 1, 2].map(|k| model.uv(face, k));
                let basis = face_basis(m, positions, uvs);
                if !basis.solved {
                    fallbacks += 1;
                }
                let (t, b) = (basis.tangent.to_array(), basis.bitangent.to_array());
                streams.tangents.extend_from_slice(&[t; 3]);
                streams.bitangents.extend_from_slice(&[b; 3]);
            }
        }

        if fallbacks > 0 {
            log::warn!(
                "{fallbacks} of {} faces have degenerate UVs or area; using a fallback tangent frame",
                model.nfaces()
            );
        }
        streams
    }

    /// Shared positions plus a triangle index buffer.
    pub fn indexed(model: &dyn Model) -> Result<Self> {
        let count = u32::try_from(model.nverts())
            .map_err(|_| anyhow::anyhow!("Too many vertices for u32 indices (>{})", u32::MAX))?;
        let positions = (0..model.nverts())
            .map(|i| model.point(i).to_array())
            .collect();
        let indices = (0..model.nfaces())
            .flat_map(|face| (0..3).map(move |corner| (face, corner)))
            .map(|(face, corner)| model.vert(face, corner) as u32)
            .collect::<Vec<_>>();
        debug_assert!(indices.iter().all(|&i| i < count));
        Ok(Self {
            positions,
            indices: Some(indices),
            ..Self::default()
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of vertices (expanded) or indices (indexed) the draw consumes.
    pub fn draw_count(&self) -> usize {
        self.indices.as_ref().map_or(self.positions.len(), Vec::len)
    }

    #[inline]
    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    /// Every present stream matches the position count, indices stay in
    /// range, and an expanded mesh holds whole triangles.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        ensure!(n > 0, "mesh has no vertices");
        for (name, len) in [
            ("uv", self.uvs.len()),
            ("normal", self.normals.len()),
            ("tangent", self.tangents.len()),
            ("bitangent", self.bitangents.len()),
        ] {
            ensure!(
                len == 0 || len == n,
                "{name} stream has {len} entries, expected {n}"
            );
        }
        match &self.indices {
            Some(indices) => {
                ensure!(
                    indices.len() % 3 == 0,
                    "index count {} is not a multiple of 3",
                    indices.len()
                );
                ensure!(
                    indices.iter().all(|&i| (i as usize) < n),
                    "index out of range for {n} vertices"
                );
            }
            None => ensure!(n % 3 == 0, "expanded vertex count {n} is not a multiple of 3"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::ObjModel;
    use corelib::Vec3;

    const QUAD: &str = r#"
        v 0 0 0
        v 1 0 0
        v 1 1 0
        v 0 1 0
        vt 0 0
        vt 1 0
        vt 1 1
        vt 0 1
        vn 0 0 1
        f 1/1/1 2/2/1 3/3/1
        f 1/1/1 3/3/1 4/4/1
    "#;

    #[test]
    fn quad_tangents_follow_u_axis() {
        let model = ObjModel::parse_str(QUAD).unwrap();
        let streams = MeshStreams::expanded(&model, true, Some(&Mat4::IDENTITY));
        streams.validate().unwrap();

        assert_eq!(streams.vertex_count(), 3 * model.nfaces());
        assert_eq!(streams.tangents.len(), 6);
        for (t, b) in streams.tangents.iter().zip(&streams.bitangents) {
            assert!((Vec3::from_array(*t) - Vec3::X).length() < 1e-4);
            assert!((Vec3::from_array(*b) - Vec3::Y).length() < 1e-4);
        }
    }

    #[test]
    fn expanded_records_repeat_shared_vertices() {
        let model = ObjModel::parse_str(QUAD).unwrap();
        let streams = MeshStreams::expanded(&model, true, None);
        assert_eq!(streams.positions[0], streams.positions[3]);
        assert_eq!(streams.uvs[2], [1.0, 1.0]);
        assert!(!streams.has_tangents());
        assert_eq!(streams.draw_count(), 6);
    }

    #[test]
    fn positions_only_expansion() {
        let model = ObjModel::parse_str(QUAD).unwrap();
        let streams = MeshStreams::expanded(&model, false, None);
        streams.validate().unwrap();
        assert!(streams.uvs.is_empty() && streams.normals.is_empty());
    }

    #[test]
    fn indexed_layout_shares_positions() {
        let model = ObjModel::parse_str(QUAD).unwrap();
        let streams = MeshStreams::indexed(&model).unwrap();
        streams.validate().unwrap();
        assert_eq!(streams.vertex_count(), 4);
        assert_eq!(streams.indices.as_deref(), Some(&[0, 1, 2, 0, 2, 3][..]));
        assert_eq!(streams.draw_count(), 6);
    }

    #[test]
    fn validate_catches_mismatched_streams() {
        let streams = MeshStreams {
            positions: vec![[0.0; 3]; 3],
            uvs: vec![[0.0; 2]; 2],
            ..MeshStreams::default()
        };
        assert!(streams.validate().is_err());

        let streams = MeshStreams {
            positions: vec![[0.0; 3]; 3],
            indices: Some(vec![0, 1, 5]),
            ..MeshStreams::default()
        };
        assert!(streams.validate().is_err());
    }
}
