//! Per-face tangent/bitangent derivation for tangent-space normal mapping.
//!
//! For a triangle with edges `e1 = v1 - v0`, `e2 = v2 - v0` (taken through the
//! model matrix) and face normal `n = normalize(e1 x e2)`, the tangent is the
//! gradient of `u` over the face: the vector `t` with `e1·t = du1`,
//! `e2·t = du2` and `n·t = 0`. Stacking those equations gives
//! `A t = (du1, du2, 0)` with `A = [e1; e2; n]` (rows), hence `t = A⁻¹ (du1, du2, 0)`.
//! The bitangent is the same solve with the `v` deltas.
//!
//! Degenerate inputs (zero-area faces, coincident UVs) make that solve
//! meaningless; [`face_basis`] then falls back to an orthonormal frame around
//! the face normal so no NaN/Inf ever reaches the vertex buffers.

use crate::{Mat3, Mat4, Vec2, Vec3};

/// Faces whose edges meet at a sine below this are treated as singular.
/// Relative to the edge lengths, so the test does not depend on mesh scale.
const SINGULAR_EPSILON: f32 = 1e-6;

/// Solved axes closer to parallel than this (sine of the angle) cannot span
/// the face, which happens when the three UVs are collinear.
const PARALLEL_EPSILON: f32 = 1e-4;

/// Tangent-space axes shared by all three vertex records of one face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    /// `false` when the fallback frame was used.
    pub solved: bool,
}

/// Solve the tangent basis of one triangle under `model`.
pub fn face_basis(model: &Mat4, positions: [Vec3; 3], uvs: [Vec2; 3]) -> TangentBasis {
    let e1 = model.transform_vector3(positions[1] - positions[0]);
    let e2 = model.transform_vector3(positions[2] - positions[0]);
    let normal = e1.cross(e2).normalize_or_zero();

    let du = Vec2::new(uvs[1].x - uvs[0].x, uvs[2].x - uvs[0].x);
    let dv = Vec2::new(uvs[1].y - uvs[0].y, uvs[2].y - uvs[0].y);

    // Rows e1, e2, n.
    let basis = Mat3::from_cols(e1, e2, normal).transpose();
    let det = basis.determinant();
    let edge_scale = e1.length() * e2.length();
    if normal == Vec3::ZERO || !det.is_finite() || det.abs() <= SINGULAR_EPSILON * edge_scale {
        return fallback(normal, None, None);
    }

    let inverse = basis.inverse();
    let tangent = (inverse * du.extend(0.0)).try_normalize();
    let bitangent = (inverse * dv.extend(0.0)).try_normalize();
    match (tangent, bitangent) {
        (Some(tangent), Some(bitangent))
            if tangent.cross(bitangent).length() > PARALLEL_EPSILON =>
        {
            TangentBasis {
                tangent,
                bitangent,
                solved: true,
            }
        }
        (Some(tangent), Some(_)) => fallback(normal, Some(tangent), None),
        (t, b) => fallback(normal, t, b),
    }
}

/// Complete a partial basis around `normal`, or invent one when nothing was solvable.
fn fallback(normal: Vec3, tangent: Option<Vec3>, bitangent: Option<Vec3>) -> TangentBasis {
    let normal = if normal == Vec3::ZERO { Vec3::Z } else { normal };
    let (tangent, bitangent) = match (tangent, bitangent) {
        (Some(t), None) => (t, normal.cross(t).normalize()),
        (None, Some(b)) => (b.cross(normal).normalize(), b),
        _ => normal.any_orthonormal_pair(),
    };
    log::trace!("tangent basis fallback around normal {normal:?}");
    TangentBasis {
        tangent,
        bitangent,
        solved: false,
    }
}
