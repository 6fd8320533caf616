//! Read-only view of a triangle mesh, independent of the file format it came from.

use corelib::{Vec2, Vec3};

/// Triangle mesh provider.
///
/// Positions are shared (`point`/`vert`), while uvs and normals are
/// addressed per face corner, which is how OBJ-style formats store them.
pub trait Model {
    /// Number of unique positions.
    fn nverts(&self) -> usize;

    /// Number of triangles.
    fn nfaces(&self) -> usize;

    /// Position `i` in object space.
    fn point(&self, i: usize) -> Vec3;

    /// Position index of corner `corner` (0..3) of face `face`.
    fn vert(&self, face: usize, corner: usize) -> usize;

    fn uv(&self, face: usize, corner: usize) -> Vec2;

    fn normal(&self, face: usize, corner: usize) -> Vec3;

    /// Position of corner `corner` of face `face`.
    fn face_point(&self, face: usize, corner: usize) -> Vec3 {
        self.point(self.vert(face, corner))
    }
}
