//! Minimal OBJ reader supporting positions, normals and texture coordinates.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use corelib::{Vec2, Vec3};

use crate::model::Model;

/// One face corner: indices into the position/uv/normal pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Corner {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

/// Triangulated OBJ mesh. Polygons are fanned into triangles on load.
#[derive(Clone, Debug, Default)]
pub struct ObjModel {
    positions: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    normals: Vec<Vec3>,
    faces: Vec<[Corner; 3]>,
}

impl ObjModel {
    /// Load an OBJ mesh from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
        let model = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))?;
        log::info!(
            "Loaded {}: {} vertices, {} faces",
            path.display(),
            model.nverts(),
            model.nfaces()
        );
        Ok(model)
    }

    /// Load an OBJ mesh from a [`BufRead`] implementation.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        parse_obj(reader)
    }

    /// Convenience helper to parse an OBJ string literal.
    pub fn parse_str(contents: &str) -> Result<Self> {
        parse_obj(io::Cursor::new(contents))
    }

    /// Whether every face corner references a texture coordinate.
    pub fn has_texcoords(&self) -> bool {
        self.faces.iter().flatten().all(|c| c.texcoord.is_some())
    }

    fn corner(&self, face: usize, corner: usize) -> &Corner {
        &self.faces[face][corner]
    }

    fn geometric_normal(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.faces[face].map(|c| self.positions[c.position]);
        (b - a).cross(c - a).normalize_or_zero()
    }
}

impl Model for ObjModel {
    fn nverts(&self) -> usize {
        self.positions.len()
    }

    fn nfaces(&self) -> usize {
        self.faces.len()
    }

    fn point(&self, i: usize) -> Vec3 {
        self.positions[i]
    }

    fn vert(&self, face: usize, corner: usize) -> usize {
        self.corner(face, corner).position
    }

    fn uv(&self, face: usize, corner: usize) -> Vec2 {
        self.corner(face, corner)
            .texcoord
            .map_or(Vec2::ZERO, |i| self.texcoords[i])
    }

    /// Falls back to the face's geometric normal when the corner has none.
    fn normal(&self, face: usize, corner: usize) -> Vec3 {
        match self.corner(face, corner).normal {
            Some(i) => self.normals[i],
            None => self.geometric_normal(face),
        }
    }
}

fn parse_obj<R: BufRead>(reader: R) -> Result<ObjModel> {
    let mut model = ObjModel::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = parts
            .next()
            .ok_or_else(|| anyhow!("Malformed OBJ line {}: '{}'", line_no + 1, trimmed))?;

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                model.positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                model.texcoords.push(Vec2::new(u, v));
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                model.normals.push(Vec3::new(nx, ny, nz));
            }
            "f" => {
                let corners = parts
                    .map(|part| {
                        parse_corner(
                            part,
                            model.positions.len(),
                            model.texcoords.len(),
                            model.normals.len(),
                            line_no,
                        )
                    })
                    .collect::<Result<Vec<_>>>()?;

                if corners.len() < 3 {
                    log::warn!(
                        "Skipping face with {} corners on line {}",
                        corners.len(),
                        line_no + 1
                    );
                    continue;
                }
                // Triangulate fan
                for tri in 1..(corners.len() - 1) {
                    model
                        .faces
                        .push([corners[0], corners[tri], corners[tri + 1]]);
                }
            }
            _ => {
                // Ignore other directives (o/g/s/usemtl/etc.)
            }
        }
    }

    if model.faces.is_empty() {
        anyhow::bail!("OBJ contained no triangles");
    }

    Ok(model)
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_corner(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<Corner> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let position = resolve_index(pos, pos_count, line_no)?;

    let texcoord = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok(Corner {
        position,
        texcoord,
        normal,
    })
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    if raw == 0 {
        anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1);
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let model = ObjModel::parse_str(src).expect("parse triangle");
        assert_eq!(model.nverts(), 3);
        assert_eq!(model.nfaces(), 1);
        assert!(model.has_texcoords());
        assert_eq!(model.uv(0, 1), Vec2::new(1.0, 0.0));
        assert_eq!(model.normal(0, 2), Vec3::Z);
        assert_eq!(model.face_point(0, 2), Vec3::Y);
    }

    #[test]
    fn quads_are_fanned_and_negative_indices_resolve() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4 -3 -2 -1\n";
        let model = ObjModel::parse_str(src).expect("parse quad");
        assert_eq!(model.nfaces(), 2);
        assert_eq!(
            (0..3).map(|k| model.vert(1, k)).collect::<Vec<_>>(),
            vec![0, 2, 3]
        );
        // No vt/vn: uv defaults to zero, normal comes from the face winding.
        assert!(!model.has_texcoords());
        assert_eq!(model.uv(0, 0), Vec2::ZERO);
        assert_eq!(model.normal(1, 0), Vec3::Z);
    }

    #[test]
    fn rejects_zero_and_out_of_range_indices() {
        assert!(ObjModel::parse_str("v 0 0 0\nf 0 1 1\n").is_err());
        assert!(ObjModel::parse_str("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(ObjModel::parse_str("v 0 0 0\n").is_err());
    }
}
