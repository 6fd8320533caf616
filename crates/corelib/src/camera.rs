use crate::{Mat4, Vec3, vec3};

/// Fixed viewpoint for the viewer (right-handed, depth in [0, 1]).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    /// Placed at (4, 3, 3) looking at the origin, 45° vertical FOV,
    /// clip range 0.1..100.
    pub fn viewer(aspect: f32) -> Self {
        Self {
            eye: vec3(4.0, 3.0, 3.0),
            target: Vec3::ZERO,
            fov_y_rad: 45f32.to_radians(),
            z_near: 0.1,
            z_far: 100.0,
            aspect,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_screen_centre() {
        let cam = Camera::viewer(4.0 / 3.0);
        let clip = cam.proj() * cam.view() * crate::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.to_array().iter().all(|f| f.is_finite()));
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
