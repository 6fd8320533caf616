//! Model/view/projection state driven by the render loop.

use crate::{Mat4, camera::Camera};

/// Transform matrices uploaded every frame.
///
/// `view` and `projection` stay fixed once built; `model` accumulates the
/// per-tick animation rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl TransformState {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model,
            view,
            projection,
        }
    }

    pub fn from_camera(model: Mat4, camera: &Camera) -> Self {
        Self::new(model, camera.view(), camera.proj())
    }

    /// Composed clip transform, always `P * V * M`.
    #[inline]
    pub fn mvp(&self) -> Mat4 {
        self.projection * self.view * self.model
    }

    /// Left-multiplies `rotation` onto the model matrix, so successive
    /// steps accumulate in world space rather than object space.
    #[inline]
    pub fn rotate_world(&mut self, rotation: &Mat4) {
        self.model = *rotation * self.model;
    }

    pub fn set_aspect(&mut self, camera: &Camera, aspect: f32) {
        self.projection = camera.with_aspect(aspect).proj();
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Fixed per-tick rotation about the world Y axis.
pub fn tick_rotation(degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Vec3, vec3};

    fn max_abs_diff(a: &Mat4, b: &Mat4) -> f32 {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn full_turn_returns_to_start() {
        let start = Mat4::from_scale_rotation_translation(
            Vec3::splat(0.5),
            glam::Quat::from_rotation_x(0.3),
            vec3(0.0, 1.0, 0.0),
        );
        let mut state = TransformState::new(start, Mat4::IDENTITY, Mat4::IDENTITY);
        let step = tick_rotation(1.0);
        for _ in 0..360 {
            state.rotate_world(&step);
        }
        assert!(max_abs_diff(&state.model, &start) < 1e-3);
    }

    #[test]
    fn rotation_is_applied_in_world_space() {
        let translated = Mat4::from_translation(vec3(1.0, 0.0, 0.0));
        let mut state = TransformState::new(translated, Mat4::IDENTITY, Mat4::IDENTITY);
        state.rotate_world(&tick_rotation(90.0));
        // World-space rotation swings the translated origin around the Y axis.
        let origin = state.model.transform_point3(Vec3::ZERO);
        assert!((origin - vec3(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn mvp_composes_projection_view_model() {
        let camera = Camera::viewer(4.0 / 3.0);
        let model = Mat4::from_rotation_z(0.25);
        let state = TransformState::from_camera(model, &camera);
        let expected = camera.proj() * camera.view() * model;
        assert!(max_abs_diff(&state.mvp(), &expected) < 1e-6);
    }
}
